//! Pattern-triggered structural conversions and their contextual guard.
//!
//! An input rule matches the text between the start of the current
//! textblock and the cursor; its handler builds the structural
//! conversion (paragraph into list item, blockquote, ...). The guard
//! composes a pure predicate in front of an existing rule - suppressing
//! it inside disallowed containers - without touching the rule's own
//! logic.

use regex::{Captures, Regex};
use tracing::debug;

use quillstone_schema::{NodeAttrs, NodeKind, OrderedListAttrs};

use crate::doc::{Node, ResolvedPos};
use crate::selection::Selection;
use crate::state::EditorState;
use crate::transaction::Transaction;

type RuleHandler = Box<dyn Fn(&EditorState, &Captures, usize, usize) -> Option<Transaction>>;

/// A regex-triggered conversion rule.
pub struct InputRule {
    name: &'static str,
    pattern: Regex,
    handler: RuleHandler,
}

impl InputRule {
    pub fn new(
        name: &'static str,
        pattern: &str,
        handler: impl Fn(&EditorState, &Captures, usize, usize) -> Option<Transaction> + 'static,
    ) -> Result<InputRule, regex::Error> {
        Ok(InputRule {
            name,
            pattern: Regex::new(pattern)?,
            handler: Box::new(handler),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Match this rule against the text before the cursor, invoking the
    /// handler with the matched range on success.
    pub fn try_match(&self, state: &EditorState) -> Option<Transaction> {
        let Selection::Text { anchor, head } = state.selection() else {
            return None;
        };
        if anchor != head {
            return None;
        }
        let rpos = ResolvedPos::resolve(state.doc(), *head).ok()?;

        // Only pure leading text participates: an atom between the block
        // start and the cursor would break the offset correspondence.
        let parent = rpos.parent();
        let mut text = String::new();
        let mut budget = rpos.parent_offset();
        for child in parent.content() {
            if budget == 0 {
                break;
            }
            let chunk = child.text_str()?;
            let take = budget.min(chunk.chars().count());
            text.extend(chunk.chars().take(take));
            budget -= take;
        }

        let captures = self.pattern.captures(&text)?;
        let matched = captures.get(0)?;
        if matched.end() != text.len() {
            return None;
        }
        let start_chars = text[..matched.start()].chars().count();
        let from = rpos.start(rpos.depth()) + start_chars;
        debug!(rule = self.name, from, to = head, "input rule matched");
        (self.handler)(state, &captures, from, *head)
    }
}

/// Whether the cursor's nearest block ancestor chain contains a heading.
pub fn is_in_heading(state: &EditorState) -> bool {
    let Selection::Text { head, .. } = state.selection() else {
        return false;
    };
    ResolvedPos::resolve(state.doc(), *head)
        .ok()
        .and_then(|rpos| rpos.find_ancestor(NodeKind::Heading))
        .is_some()
}

/// Suppress a rule inside headings. The underlying handler is only
/// invoked when the guard predicate passes; the rule's own pattern and
/// logic stay untouched.
pub fn guard_not_in_heading(rule: InputRule) -> InputRule {
    let InputRule {
        name,
        pattern,
        handler,
    } = rule;
    InputRule {
        name,
        pattern,
        handler: Box::new(move |state, captures, from, to| {
            if is_in_heading(state) {
                return None;
            }
            handler(state, captures, from, to)
        }),
    }
}

/// Try each rule in order; the first match wins.
pub fn run_input_rules(state: &EditorState, rules: &[InputRule]) -> Option<Transaction> {
    rules.iter().find_map(|rule| rule.try_match(state))
}

/// Replace the paragraph under the cursor with `wrap(paragraph - matched
/// prefix)`, putting the cursor back at the equivalent spot.
fn convert_paragraph(
    state: &EditorState,
    from: usize,
    to: usize,
    wrap: impl FnOnce(&EditorState, Node) -> Option<Node>,
) -> Option<Transaction> {
    let rpos = ResolvedPos::resolve(state.doc(), to).ok()?;
    let depth = rpos.depth();
    if rpos.parent().kind() != NodeKind::Paragraph {
        return None;
    }
    let para_before = rpos.before(depth)?;
    let para_after = rpos.after(depth)?;
    let matched_len = to - from;

    let tx = state.transaction().delete(from, to).ok()?;
    let shrunk = ResolvedPos::resolve(tx.doc(), from).ok()?;
    let paragraph = shrunk.parent().clone();
    let replacement = wrap(state, paragraph)?;

    // Two opening tokens (list + item, or the quote) now sit between the
    // old block boundary and the paragraph content.
    let depth_gain = replacement_content_depth(&replacement);
    let tx = tx
        .replace_range(para_before, para_after - matched_len, vec![replacement])
        .ok()?;
    tx.set_selection(Selection::cursor(from + depth_gain)).ok()
}

/// How many levels of wrapping sit between the replacement node and the
/// paragraph it carries.
fn replacement_content_depth(node: &Node) -> usize {
    match node.kind() {
        NodeKind::BulletList | NodeKind::OrderedList => 2,
        NodeKind::Blockquote => 1,
        _ => 0,
    }
}

/// `- `, `* ` or `+ ` at the start of a paragraph converts it into a
/// bullet list item.
pub fn bullet_list_rule() -> InputRule {
    InputRule::new("bullet_list", r"^[-*+] $", |state, _captures, from, to| {
        convert_paragraph(state, from, to, |state, paragraph| {
            let schema = state.schema();
            let item = Node::new(
                schema,
                NodeKind::ListItem,
                NodeAttrs::None,
                vec![paragraph],
            )
            .ok()?;
            Node::new(schema, NodeKind::BulletList, NodeAttrs::None, vec![item]).ok()
        })
    })
    .unwrap_or_else(|_| unreachable!("static pattern compiles"))
}

/// `1. ` (any number) converts the paragraph into an ordered list
/// starting at that number.
pub fn ordered_list_rule() -> InputRule {
    InputRule::new(
        "ordered_list",
        r"^(\d{1,9})\. $",
        |state, captures, from, to| {
            let start: u64 = captures.get(1)?.as_str().parse().ok()?;
            convert_paragraph(state, from, to, move |state, paragraph| {
                let schema = state.schema();
                let item = Node::new(
                    schema,
                    NodeKind::ListItem,
                    NodeAttrs::None,
                    vec![paragraph],
                )
                .ok()?;
                Node::new(
                    schema,
                    NodeKind::OrderedList,
                    NodeAttrs::OrderedList(OrderedListAttrs { start }),
                    vec![item],
                )
                .ok()
            })
        },
    )
    .unwrap_or_else(|_| unreachable!("static pattern compiles"))
}

/// `> ` converts the paragraph into a blockquote.
pub fn blockquote_rule() -> InputRule {
    InputRule::new("blockquote", r"^> $", |state, _captures, from, to| {
        convert_paragraph(state, from, to, |state, paragraph| {
            Node::new(
                state.schema(),
                NodeKind::Blockquote,
                NodeAttrs::None,
                vec![paragraph],
            )
            .ok()
        })
    })
    .unwrap_or_else(|_| unreachable!("static pattern compiles"))
}

/// The shipped rule set, every structural conversion guarded against
/// firing inside headings.
pub fn standard_rules() -> Vec<InputRule> {
    vec![
        guard_not_in_heading(bullet_list_rule()),
        guard_not_in_heading(ordered_list_rule()),
        guard_not_in_heading(blockquote_rule()),
    ]
}
