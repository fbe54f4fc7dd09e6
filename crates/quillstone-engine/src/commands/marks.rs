//! Mark commands: toggles, comments, and inline-code boundary
//! navigation.
//!
//! Every toggle follows the same three-way branch - create when absent,
//! remove when present with identical attrs, update in place when present
//! with different attrs - and always operates over the mark-range
//! resolver's *current* run, not the raw selection, so a toggle inside a
//! longer run never truncates it.

use uuid::Uuid;

use quillstone_schema::{ImageAttrs, LinkAttrs, Mark, MarkAttrs, MarkKind, NodeAttrs};

use crate::commands::{chain, command_fn, Command};
use crate::doc::ResolvedPos;
use crate::marks::{atom_mark, comment_range, mark_at, mark_range};
use crate::selection::Selection;
use crate::state::EditorState;

/// Text-Selection variant of a mark toggle.
fn toggle_mark_text(kind: MarkKind, attrs: MarkAttrs) -> Command {
    command_fn("toggle_mark_text", move |state| {
        let Selection::Text { anchor, head } = state.selection() else {
            return None;
        };
        let (from, to) = (*anchor.min(head), *anchor.max(head));
        let mark = Mark::new(kind, attrs.clone()).ok()?;
        let doc = state.doc();

        match mark_range(doc, from, kind) {
            Some(range) if range.mark == mark => {
                // Present with identical attrs: toggle off over the whole
                // resolved run.
                state
                    .transaction()
                    .remove_mark(range.from, range.to, range.mark)
                    .ok()
            }
            Some(range) => {
                // Present with different attrs: update in place over the
                // resolved run, not a fresh disjoint range.
                state
                    .transaction()
                    .remove_mark(range.from, range.to, range.mark.clone())
                    .ok()?
                    .add_mark(range.from, range.to, mark.clone())
                    .ok()
            }
            None => {
                // Absent: apply over the selection. A collapsed cursor has
                // nothing to mark.
                if from == to {
                    return None;
                }
                state.transaction().add_mark(from, to, mark.clone()).ok()
            }
        }
    })
}

/// Node-Selection variant of a mark toggle: atom nodes keep their marks
/// in `attrs.marks`, so the toggle is an attrs rewrite.
fn toggle_mark_atom(kind: MarkKind, attrs: MarkAttrs) -> Command {
    command_fn("toggle_mark_atom", move |state| {
        let Selection::Node { pos } = state.selection() else {
            return None;
        };
        let rpos = ResolvedPos::resolve(state.doc(), *pos).ok()?;
        let image = rpos.node_after()?.attrs().image()?.clone();
        let mark = Mark::new(kind, attrs.clone()).ok()?;

        let existing = image.marks.iter().find(|m| m.kind == kind).cloned();
        let marks = match existing {
            Some(current) if current == mark => mark.remove_from_set(&image.marks),
            Some(current) => {
                let cleared = current.remove_from_set(&image.marks);
                mark.add_to_set(state.schema(), &cleared)
            }
            None => mark.add_to_set(state.schema(), &image.marks),
        };

        state
            .transaction()
            .set_node_attrs(*pos, NodeAttrs::Image(ImageAttrs { marks, ..image }))
            .ok()
    })
}

/// Toggle a mark; the same keybinding covers both the Text-Selection and
/// the Node-Selection (atom) variant through a chain.
pub fn toggle_mark(kind: MarkKind, attrs: MarkAttrs) -> Command {
    chain(
        "toggle_mark",
        vec![
            toggle_mark_text(kind, attrs.clone()),
            toggle_mark_atom(kind, attrs),
        ],
    )
}

pub fn toggle_link(attrs: LinkAttrs) -> Command {
    toggle_mark(MarkKind::Link, MarkAttrs::Link(attrs))
}

pub fn toggle_highlight(color: impl Into<String>) -> Command {
    toggle_mark(
        MarkKind::Highlight,
        MarkAttrs::Highlight(quillstone_schema::HighlightAttrs::new(color.into())),
    )
}

pub fn toggle_code() -> Command {
    toggle_mark(MarkKind::CodeInline, MarkAttrs::None)
}

/// Attach a comment to the selected text. Distinct comments may overlap
/// freely (the comment kind excludes nothing).
pub fn add_comment(id: Uuid) -> Command {
    command_fn("add_comment", move |state| {
        let Selection::Text { anchor, head } = state.selection() else {
            return None;
        };
        let (from, to) = (*anchor.min(head), *anchor.max(head));
        if from == to {
            return None;
        }
        state
            .transaction()
            .add_mark(from, to, Mark::comment(id))
            .ok()
            .map(|tx| tx.set_meta("comment_id", serde_json::json!(id.to_string())))
    })
}

/// Remove a comment wherever it appears, resolved by identity across the
/// whole document - the selection is irrelevant.
pub fn remove_comment(id: Uuid) -> Command {
    command_fn("remove_comment", move |state| {
        let range = comment_range(state.doc(), id)?;
        state
            .transaction()
            .remove_mark(range.from, range.to, range.mark)
            .ok()
    })
}

/// Step the cursor out of an inclusive inline-code run at its right
/// edge: subsequent typed input no longer extends the mark. Inapplicable
/// anywhere else, preserving normal cursor behavior.
pub fn exit_code_mark() -> Command {
    command_fn("exit_code_mark", move |state| {
        let Selection::Text { anchor, head } = state.selection() else {
            return None;
        };
        if anchor != head {
            return None;
        }
        let range = mark_range(state.doc(), *head, MarkKind::CodeInline)?;
        if *head != range.to || !state.schema().mark_spec(MarkKind::CodeInline).inclusive {
            return None;
        }
        Some(state.transaction().set_stored_marks(Some(Vec::new())))
    })
}

/// Toolbar predicate: is a mark of `kind` (optionally with exact attrs)
/// active at the selection?
pub fn is_mark_active(state: &EditorState, kind: MarkKind, attrs: Option<&MarkAttrs>) -> bool {
    let found = match state.selection() {
        Selection::Text { anchor, head } => mark_at(state.doc(), *anchor.min(head), kind),
        Selection::Node { pos } => ResolvedPos::resolve(state.doc(), *pos)
            .ok()
            .and_then(|rpos| rpos.node_after().and_then(|n| atom_mark(n, kind).cloned())),
        Selection::Cell { anchor_cell, .. } => ResolvedPos::resolve(state.doc(), *anchor_cell)
            .ok()
            .and_then(|rpos| {
                // Decoration marks sit on the enclosing row.
                let row_depth = rpos.find_ancestor(quillstone_schema::NodeKind::TableRow)?;
                rpos.node(row_depth)
                    .marks()
                    .iter()
                    .find(|m| m.kind == kind)
                    .cloned()
            }),
    };
    match (found, attrs) {
        (Some(mark), Some(attrs)) => &mark.attrs == attrs,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
