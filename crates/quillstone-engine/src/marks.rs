//! The mark-range resolver: given a position and a mark kind, compute the
//! maximal contiguous run of content carrying one logical mark instance.
//!
//! Runs merge across sibling text nodes only under exact mark equality
//! (kind *and* attrs), so two distinct comments that happen to touch stay
//! distinct runs. Atom nodes keep their marks in `attrs`; the resolver's
//! atom variant is a direct array scan.

use tracing::trace;
use uuid::Uuid;

use quillstone_schema::{Mark, MarkKind};

use crate::doc::{Node, ResolvedPos};

/// The maximal contiguous span of content sharing one logical mark
/// instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkRange {
    pub from: usize,
    pub to: usize,
    pub mark: Mark,
}

/// The mark of `kind` carried by the text node under `pos`, if any.
///
/// At a node boundary the node after the position is preferred, falling
/// back to the node before (cursor at the end of a run still counts as
/// inside it).
pub fn mark_at(doc: &Node, pos: usize, kind: MarkKind) -> Option<Mark> {
    let rpos = ResolvedPos::resolve(doc, pos).ok()?;
    let (_, mark) = marked_text_under(&rpos, kind)?;
    Some(mark)
}

/// Resolve the maximal run of `kind` around `pos`.
///
/// Fails (returns `None`) when the text node under `pos` carries no mark
/// of that kind. Walks backward then forward over siblings while the
/// neighbor still carries an equal mark, extending the range.
pub fn mark_range(doc: &Node, pos: usize, kind: MarkKind) -> Option<MarkRange> {
    let rpos = ResolvedPos::resolve(doc, pos).ok()?;
    let (index, mark) = marked_text_under(&rpos, kind)?;

    let parent = rpos.parent();
    let content_start = rpos.start(rpos.depth());

    let mut first = index;
    while let Some(prev) = first.checked_sub(1).and_then(|i| parent.child(i)) {
        if !prev.is_text() || !mark.is_in_set(prev.marks()) {
            break;
        }
        first -= 1;
    }

    let mut last = index;
    while let Some(next) = parent.child(last + 1) {
        if !next.is_text() || !mark.is_in_set(next.marks()) {
            break;
        }
        last += 1;
    }

    let mut offset = 0;
    let mut from = 0;
    let mut to = 0;
    for (i, child) in parent.content().iter().enumerate() {
        if i == first {
            from = offset;
        }
        offset += child.node_size();
        if i == last {
            to = offset;
            break;
        }
    }

    trace!(kind = %kind, from, to, "resolved mark range");
    Some(MarkRange {
        from: content_start + from,
        to: content_start + to,
        mark,
    })
}

/// The mark of `kind` stored on an atom node's attrs, if any.
pub fn atom_mark(node: &Node, kind: MarkKind) -> Option<&Mark> {
    node.attrs()
        .image()
        .and_then(|attrs| attrs.marks.iter().find(|m| m.kind == kind))
}

/// The full span covered by the comment with the given id, scanning the
/// whole document. Overlapping comments are looked up by identity, never
/// merged by adjacency.
pub fn comment_range(doc: &Node, id: Uuid) -> Option<MarkRange> {
    let mut found: Option<MarkRange> = None;
    doc.descendants(&mut |node, pos| {
        if let Some(text) = node.text_str() {
            let comment = node.marks().iter().find(|m| {
                m.kind == MarkKind::Comment
                    && m.attrs.comment().is_some_and(|attrs| attrs.id == id)
            });
            if let Some(mark) = comment {
                let end = pos + text.chars().count();
                found = Some(match found.take() {
                    Some(range) => MarkRange {
                        from: range.from.min(pos),
                        to: range.to.max(end),
                        mark: range.mark,
                    },
                    None => MarkRange {
                        from: pos,
                        to: end,
                        mark: mark.clone(),
                    },
                });
            }
            false
        } else {
            true
        }
    });
    found
}

/// The text node under the position carrying a mark of `kind`, with its
/// child index.
///
/// Strictly inside a text node only that node counts; on a boundary the
/// node after is preferred, falling back to the node before, so a cursor
/// sitting at either edge of a run still resolves it.
fn marked_text_under(rpos: &ResolvedPos, kind: MarkKind) -> Option<(usize, Mark)> {
    let parent = rpos.parent();
    let index = rpos.parent_index();

    let marked = |i: usize| {
        parent.child(i).and_then(|node| {
            if !node.is_text() {
                return None;
            }
            Mark::kind_in_set(kind, node.marks()).cloned()
        })
    };

    if rpos.text_offset() > 0 {
        return marked(index).map(|mark| (index, mark));
    }
    if let Some(mark) = marked(index) {
        return Some((index, mark));
    }
    if index > 0 {
        if let Some(mark) = marked(index - 1) {
            return Some((index - 1, mark));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quillstone_schema::{ImageAttrs, NodeAttrs, NodeKind, Schema};

    fn schema() -> Schema {
        Schema::standard()
    }

    fn doc_with_runs(schema: &Schema, runs: Vec<Node>) -> Node {
        let para = Node::new(schema, NodeKind::Paragraph, NodeAttrs::None, runs).unwrap();
        Node::new(schema, NodeKind::Doc, NodeAttrs::None, vec![para]).unwrap()
    }

    // ============ Range maximality ============

    #[test]
    fn equal_attr_runs_merge_and_different_attrs_split() {
        let schema = schema();
        let a = Mark::highlight("yellow");
        let b = Mark::highlight("green");
        // Runs: [A, A, B]; the A runs stay separate nodes because the
        // second one also carries a link.
        let doc = doc_with_runs(
            &schema,
            vec![
                Node::text_marked("aa", vec![a.clone()]),
                Node::text_marked("AA", vec![a.clone(), Mark::link("https://x")]),
                Node::text_marked("bb", vec![b.clone()]),
            ],
        );

        // Inside the first run: spans exactly the two A runs (1..5),
        // excluding the B run.
        let range = mark_range(&doc, 2, MarkKind::Highlight).unwrap();
        assert_eq!(
            range,
            MarkRange {
                from: 1,
                to: 5,
                mark: a,
            }
        );

        // Inside the B run: just the B run.
        let range = mark_range(&doc, 6, MarkKind::Highlight).unwrap();
        assert_eq!(range.from, 5);
        assert_eq!(range.to, 7);
        assert_eq!(range.mark, b);
    }

    #[test]
    fn no_mark_under_the_position_fails() {
        let schema = schema();
        let doc = doc_with_runs(&schema, vec![Node::text("plain")]);
        assert!(mark_range(&doc, 2, MarkKind::Highlight).is_none());
    }

    #[test]
    fn cursor_at_the_end_of_a_run_still_resolves_it() {
        let schema = schema();
        let mark = Mark::highlight("yellow");
        let doc = doc_with_runs(
            &schema,
            vec![Node::text_marked("hi", vec![mark.clone()]), Node::text(" there")],
        );
        // Position 3 is the boundary after "hi"; node_after is unmarked,
        // so the resolver falls back to the run before.
        let range = mark_range(&doc, 3, MarkKind::Highlight).unwrap();
        assert_eq!(range.from, 1);
        assert_eq!(range.to, 3);
    }

    // ============ Comment identity ============

    #[test]
    fn adjacent_distinct_comments_do_not_merge() {
        let schema = schema();
        let first = Mark::comment(Uuid::new_v4());
        let second = Mark::comment(Uuid::new_v4());
        let doc = doc_with_runs(
            &schema,
            vec![
                Node::text_marked("one", vec![first.clone()]),
                Node::text_marked("two", vec![second.clone()]),
            ],
        );

        let range = mark_range(&doc, 2, MarkKind::Comment).unwrap();
        assert_eq!(range.from, 1);
        assert_eq!(range.to, 4);
        assert_eq!(range.mark, first);
    }

    #[test]
    fn overlapping_comments_resolve_by_identity() {
        let schema = schema();
        let outer = Uuid::new_v4();
        let inner = Uuid::new_v4();
        // "ab" carries only the outer comment, "cd" carries both.
        let doc = doc_with_runs(
            &schema,
            vec![
                Node::text_marked("ab", vec![Mark::comment(outer)]),
                Node::text_marked("cd", vec![Mark::comment(outer), Mark::comment(inner)]),
            ],
        );

        let outer_range = comment_range(&doc, outer).unwrap();
        assert_eq!((outer_range.from, outer_range.to), (1, 5));

        let inner_range = comment_range(&doc, inner).unwrap();
        assert_eq!((inner_range.from, inner_range.to), (3, 5));
    }

    // ============ Atom variant ============

    #[test]
    fn atom_marks_live_in_attrs() {
        let schema = schema();
        let link = Mark::link("https://example.com");
        let image = Node::leaf(
            &schema,
            NodeKind::Image,
            NodeAttrs::Image(ImageAttrs {
                src: "cat.png".into(),
                alt: None,
                marks: vec![link.clone()],
            }),
        )
        .unwrap();

        assert_eq!(atom_mark(&image, MarkKind::Link), Some(&link));
        assert_eq!(atom_mark(&image, MarkKind::Highlight), None);
    }
}
