/*!
 * # Command Algebra
 *
 * A command is a pure function over the current state that either builds
 * a transaction or declines to act:
 *
 * - returning `false` means "not applicable, try the next one";
 * - returning `true` with no dispatch function is a dry run, used to
 *   enable/disable UI affordances without mutating anything;
 * - returning `true` with a dispatch function means the transaction was
 *   built and handed over.
 *
 * Two combinators structure every composite edit:
 *
 * - [`chain`] tries commands in order against the *same* input state;
 *   the first applicable one wins (one keybinding, several selection
 *   variants).
 * - [`compose`] runs commands in sequence, each seeing the cumulative
 *   effect of the previous ones, and dispatches a single merged
 *   transaction - or nothing at all if any member declines.
 */

pub mod marks;
pub mod table;

use tracing::{debug, warn};

use crate::state::EditorState;
use crate::transaction::Transaction;

/// Receiver for a built transaction.
pub type Dispatch<'a> = &'a mut dyn FnMut(Transaction);

/// A selection-aware editing command.
pub struct Command {
    name: &'static str,
    run: Box<dyn Fn(&EditorState, Option<Dispatch>) -> bool>,
}

impl Command {
    pub fn new(
        name: &'static str,
        run: impl Fn(&EditorState, Option<Dispatch>) -> bool + 'static,
    ) -> Command {
        Command {
            name,
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run against a state, optionally dispatching.
    pub fn run(&self, state: &EditorState, dispatch: Option<Dispatch>) -> bool {
        (self.run)(state, dispatch)
    }

    /// Dry run: would this command do anything here?
    pub fn is_applicable(&self, state: &EditorState) -> bool {
        (self.run)(state, None)
    }

    /// Run for real, handing the transaction to `dispatch`.
    pub fn execute(&self, state: &EditorState, dispatch: Dispatch) -> bool {
        (self.run)(state, Some(dispatch))
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command").field("name", &self.name).finish()
    }
}

/// Build a command from a function producing an optional transaction:
/// `None` means inapplicable.
pub fn command_fn(
    name: &'static str,
    build: impl Fn(&EditorState) -> Option<Transaction> + 'static,
) -> Command {
    Command::new(name, move |state, dispatch| match build(state) {
        Some(tx) => {
            if let Some(dispatch) = dispatch {
                dispatch(tx);
            }
            true
        }
        None => false,
    })
}

/// Try each command in order against the same input state; the first one
/// returning `true` wins and later ones are never tried.
pub fn chain(name: &'static str, commands: Vec<Command>) -> Command {
    Command::new(name, move |state, mut dispatch| {
        for command in &commands {
            let hit = match dispatch.as_mut() {
                Some(d) => command.run(state, Some(&mut **d)),
                None => command.run(state, None),
            };
            if hit {
                debug!(chain = name, winner = command.name(), "chain matched");
                return true;
            }
        }
        false
    })
}

/// Run commands in sequence, each against a scratch state carrying the
/// cumulative effect of the previous ones, then dispatch once with the
/// merged transaction. If any member returns `false` the whole
/// composition returns `false` and dispatches nothing.
pub fn compose(name: &'static str, commands: Vec<Command>) -> Command {
    Command::new(name, move |state, dispatch| {
        let mut scratch = state.clone();
        let mut merged = state.transaction();

        for command in &commands {
            let mut captured: Option<Transaction> = None;
            let ok = command.run(&scratch, Some(&mut |tx| captured = Some(tx)));
            if !ok {
                debug!(compose = name, failed = command.name(), "composition aborted");
                return false;
            }
            let Some(tx) = captured else {
                continue;
            };

            for step in tx.steps() {
                merged = match merged.step(step.clone()) {
                    Ok(m) => m,
                    Err(err) => {
                        warn!(compose = name, %err, "merging composed step failed");
                        return false;
                    }
                };
            }
            let (marks_set, marks) = tx.stored_marks();
            if marks_set {
                merged = merged.set_stored_marks(marks.map(<[_]>::to_vec));
            }
            for (key, value) in tx.meta_entries() {
                merged = merged.set_meta(key.clone(), value.clone());
            }

            scratch = match scratch.apply(tx) {
                Ok(next) => next,
                Err(err) => {
                    warn!(compose = name, %err, "advancing scratch state failed");
                    return false;
                }
            };
        }

        if let Some(dispatch) = dispatch {
            if !merged.steps().is_empty() {
                dispatch(merged);
            }
        }
        true
    })
}

/// Expand the selection to the nearest enclosing atom node (in practice
/// the surrounding table), producing a Node Selection. Inapplicable when
/// no ancestor is an atom.
pub fn select_parent_node() -> Command {
    command_fn("select_parent_node", |state| {
        let pos = state.selection().from();
        let rpos = crate::doc::ResolvedPos::resolve(state.doc(), pos).ok()?;
        let atom_depth = (1..=rpos.depth())
            .rev()
            .find(|&d| state.schema().is_atom(rpos.node(d).kind()))?;
        let before = rpos.before(atom_depth)?;
        state
            .transaction()
            .set_selection(crate::selection::Selection::Node { pos: before })
            .ok()
    })
}
