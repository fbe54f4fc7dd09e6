//! Atomic steps and their application.
//!
//! A [`Step`] is the only way a document changes. Application either
//! produces a complete new tree plus a [`PositionMap`], or fails with a
//! [`StructuralError`] leaving the old tree untouched - steps never
//! partially apply.

use serde::{Deserialize, Serialize};
use tracing::trace;

use quillstone_schema::{Mark, NodeAttrs, Schema};

use crate::doc::{Node, PositionMap, ResolvedPos, StructuralError};
use crate::selection::Selection;

/// One atomic mutation of a document snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Insert content at a position.
    Insert { pos: usize, content: Vec<Node> },
    /// Delete the range between two positions.
    Delete { from: usize, to: usize },
    /// Replace a range with new content.
    ReplaceRange {
        from: usize,
        to: usize,
        content: Vec<Node>,
    },
    /// Add a mark across a range of inline content (and fully-covered
    /// nodes that accept block-level decoration).
    AddMark { from: usize, to: usize, mark: Mark },
    /// Remove every mark equal to `mark` across a range.
    RemoveMark { from: usize, to: usize, mark: Mark },
    /// Replace the attrs payload of the node starting at `pos`.
    SetNodeAttrs { pos: usize, attrs: NodeAttrs },
    /// Record a new selection; leaves the tree untouched.
    SetSelection { selection: Selection },
}

impl Step {
    /// Short tag for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Insert { .. } => "insert",
            Step::Delete { .. } => "delete",
            Step::ReplaceRange { .. } => "replace_range",
            Step::AddMark { .. } => "add_mark",
            Step::RemoveMark { .. } => "remove_mark",
            Step::SetNodeAttrs { .. } => "set_node_attrs",
            Step::SetSelection { .. } => "set_selection",
        }
    }
}

/// Apply one step to a document snapshot.
pub fn apply_step(
    schema: &Schema,
    doc: &Node,
    step: &Step,
) -> Result<(Node, PositionMap), StructuralError> {
    trace!(step = step.name(), "applying step");
    match step {
        Step::Insert { pos, content } => replace_range(schema, doc, *pos, *pos, content),
        Step::Delete { from, to } => replace_range(schema, doc, *from, *to, &[]),
        Step::ReplaceRange { from, to, content } => {
            replace_range(schema, doc, *from, *to, content)
        }
        Step::AddMark { from, to, mark } => {
            let doc = mark_range_step(schema, doc, *from, *to, mark, true)?;
            Ok((doc, PositionMap::identity()))
        }
        Step::RemoveMark { from, to, mark } => {
            let doc = mark_range_step(schema, doc, *from, *to, mark, false)?;
            Ok((doc, PositionMap::identity()))
        }
        Step::SetNodeAttrs { pos, attrs } => {
            let doc = set_node_attrs(schema, doc, *pos, attrs)?;
            Ok((doc, PositionMap::identity()))
        }
        Step::SetSelection { .. } => Ok((doc.clone(), PositionMap::identity())),
    }
}

/// Rebuild the ancestor spine above a replaced node.
fn rebuild_spine(rpos: &ResolvedPos, depth: usize, node: Node) -> Node {
    let mut node = node;
    let mut d = depth;
    while d > 0 {
        node = rpos.node(d - 1).replace_child(rpos.index(d - 1), node);
        d -= 1;
    }
    node
}

/// Copy a character range out of a text node, keeping its marks.
/// Returns `None` for an empty slice.
fn text_slice(node: &Node, start_char: usize, end_char: usize) -> Option<Node> {
    let text = node.text_str()?;
    let sliced: String = text
        .chars()
        .skip(start_char)
        .take(end_char.saturating_sub(start_char))
        .collect();
    (!sliced.is_empty()).then(|| Node::text_marked(sliced, node.marks().to_vec()))
}

fn content_width(content: &[Node]) -> usize {
    content.iter().map(Node::node_size).sum()
}

fn replace_range(
    schema: &Schema,
    doc: &Node,
    from: usize,
    to: usize,
    content: &[Node],
) -> Result<(Node, PositionMap), StructuralError> {
    if to < from {
        return Err(StructuralError::SchemaViolation(format!(
            "replace range is reversed ({from} > {to})"
        )));
    }
    for node in content {
        if node.is_text() && node.text_str().is_none_or(str::is_empty) {
            return Err(StructuralError::SchemaViolation(
                "cannot insert an empty text node".into(),
            ));
        }
    }

    let rf = ResolvedPos::resolve(doc, from)?;
    let rt = ResolvedPos::resolve(doc, to)?;
    let depth = rf.shared_depth(&rt);
    if rf.depth() != depth || rt.depth() != depth {
        // Both endpoints must open in the same parent; cutting through the
        // boundary of a non-text node is not a representable step.
        return Err(StructuralError::SchemaViolation(
            "replace range cuts through a node boundary".into(),
        ));
    }

    let parent = rf.node(depth);
    let local_from = from - rf.start(depth);
    let local_to = to - rf.start(depth);

    let mut before: Vec<Node> = Vec::new();
    let mut after: Vec<Node> = Vec::new();
    let mut acc = 0;
    for child in parent.content() {
        let end = acc + child.node_size();
        if end <= local_from {
            before.push(child.clone());
        } else if acc >= local_to {
            after.push(child.clone());
        } else if let Some(text) = child.text_str() {
            let len = text.chars().count();
            if local_from > acc {
                if let Some(prefix) = text_slice(child, 0, local_from - acc) {
                    before.push(prefix);
                }
            }
            if end > local_to {
                if let Some(suffix) = text_slice(child, local_to - acc, len) {
                    after.push(suffix);
                }
            }
        } else {
            // A non-text child overlapping the range must be swallowed
            // whole; the depth check above catches positions that resolve
            // inside one, so a partial overlap can only be a range edge
            // landing on the wrong side of an atom.
            if acc < local_from || end > local_to {
                return Err(StructuralError::SchemaViolation(
                    "replace range cuts through a node boundary".into(),
                ));
            }
        }
        acc = end;
    }

    for node in content {
        if !schema.valid_child(parent.kind(), node.kind()) {
            return Err(StructuralError::InvalidChildType {
                parent: parent.kind(),
                child: node.kind(),
            });
        }
    }

    let mut children = before;
    children.extend(content.iter().cloned());
    children.extend(after);

    if children.len() < schema.min_children(parent.kind()) {
        return Err(StructuralError::SchemaViolation(format!(
            "{} requires at least {} child(ren)",
            parent.kind(),
            schema.min_children(parent.kind())
        )));
    }

    let new_parent = parent.with_content(children);
    let new_doc = rebuild_spine(&rf, depth, new_parent);
    let map = PositionMap::single(from, to - from, content_width(content));
    Ok((new_doc, map))
}

fn mark_range_step(
    schema: &Schema,
    doc: &Node,
    from: usize,
    to: usize,
    mark: &Mark,
    add: bool,
) -> Result<Node, StructuralError> {
    if to < from {
        return Err(StructuralError::SchemaViolation(format!(
            "mark range is reversed ({from} > {to})"
        )));
    }
    let size = doc.content_size();
    if to > size {
        return Err(StructuralError::OutOfBounds { pos: to, size });
    }
    if !mark.attrs.matches_kind(mark.kind) {
        return Err(StructuralError::SchemaViolation(format!(
            "attrs payload does not belong to mark kind {}",
            mark.kind
        )));
    }
    Ok(mark_children(schema, doc, from, to, mark, add))
}

/// Recursively rewrite mark sets across `from..to` (offsets relative to
/// `node`'s content start).
///
/// Text nodes partially covered by the range are split at the range edges;
/// [`Node::with_content`] re-merges equal-mark neighbors afterwards, which
/// is what keeps toggle-on/toggle-off structurally idempotent.
fn mark_children(
    schema: &Schema,
    node: &Node,
    from: usize,
    to: usize,
    mark: &Mark,
    add: bool,
) -> Node {
    let mut out: Vec<Node> = Vec::with_capacity(node.child_count());
    let mut acc = 0;
    for child in node.content() {
        let end = acc + child.node_size();
        if end <= from || acc >= to {
            out.push(child.clone());
        } else if let Some(text) = child.text_str() {
            let len = text.chars().count();
            let start_char = from.saturating_sub(acc);
            let end_char = (to - acc).min(len);
            if let Some(prefix) = text_slice(child, 0, start_char) {
                out.push(prefix);
            }
            if let Some(middle) = text_slice(child, start_char, end_char) {
                let marks = if add {
                    mark.add_to_set(schema, middle.marks())
                } else {
                    mark.remove_from_set(middle.marks())
                };
                out.push(Node::text_marked(
                    middle.text_str().unwrap_or_default().to_string(),
                    marks,
                ));
            }
            if let Some(suffix) = text_slice(child, end_char, len) {
                out.push(suffix);
            }
        } else if schema.node_spec(child.kind()).allows_marks && from <= acc && end <= to {
            // Block-level decoration (table rows): the mark sits on the
            // node itself when the range covers it entirely.
            let marks = if add {
                mark.add_to_set(schema, child.marks())
            } else {
                mark.remove_from_set(child.marks())
            };
            out.push(child.with_marks(marks));
        } else if !child.kind().is_leaf() {
            let inner_from = from.saturating_sub(acc + 1);
            let inner_to = (to - acc).saturating_sub(1).min(child.content_size());
            if inner_from < inner_to {
                out.push(mark_children(schema, child, inner_from, inner_to, mark, add));
            } else {
                out.push(child.clone());
            }
        } else {
            // Atom leaves keep their marks in attrs; range marks skip them.
            out.push(child.clone());
        }
        acc = end;
    }
    node.with_content(out)
}

fn set_node_attrs(
    schema: &Schema,
    doc: &Node,
    pos: usize,
    attrs: &NodeAttrs,
) -> Result<Node, StructuralError> {
    let rpos = ResolvedPos::resolve(doc, pos)?;
    if rpos.text_offset() != 0 {
        return Err(StructuralError::SchemaViolation(
            "set_node_attrs position points inside a text node".into(),
        ));
    }
    let target = rpos
        .node_after()
        .ok_or(StructuralError::OutOfBounds {
            pos,
            size: doc.content_size(),
        })?
        .clone();
    if !attrs.matches_kind(target.kind()) {
        return Err(StructuralError::SchemaViolation(format!(
            "attrs payload does not belong to {}",
            target.kind()
        )));
    }
    if let Some(cell) = attrs.table_cell() {
        if cell.rowspan == 0 || cell.colspan == 0 {
            return Err(StructuralError::SchemaViolation(
                "cell spans must be at least 1".into(),
            ));
        }
    }
    let depth = rpos.depth();
    let new_parent = rpos
        .parent()
        .replace_child(rpos.parent_index(), target.with_attrs(attrs.clone()));
    Ok(rebuild_spine(&rpos, depth, new_parent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quillstone_schema::{NodeKind, TableAttrs};

    fn schema() -> Schema {
        Schema::standard()
    }

    fn para(schema: &Schema, text: &str) -> Node {
        Node::new(
            schema,
            NodeKind::Paragraph,
            NodeAttrs::None,
            vec![Node::text(text)],
        )
        .unwrap()
    }

    fn doc_of(schema: &Schema, blocks: Vec<Node>) -> Node {
        Node::new(schema, NodeKind::Doc, NodeAttrs::None, blocks).unwrap()
    }

    // ============ Insert / delete ============

    #[test]
    fn insert_text_inside_a_paragraph() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "helo")]);
        let (new_doc, map) = apply_step(
            &schema,
            &doc,
            &Step::Insert {
                pos: 3,
                content: vec![Node::text("l")],
            },
        )
        .unwrap();

        assert_eq!(new_doc.text_between(0, new_doc.content_size(), " "), "hello");
        // One paragraph, one merged text node.
        assert_eq!(new_doc.child(0).unwrap().child_count(), 1);
        assert_eq!(map.map(3, crate::doc::Assoc::After), 4);
        assert_eq!(map.map(3, crate::doc::Assoc::Before), 3);
    }

    #[test]
    fn delete_merges_the_remaining_text() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "hello world")]);
        let (new_doc, _) = apply_step(&schema, &doc, &Step::Delete { from: 6, to: 12 }).unwrap();
        assert_eq!(new_doc, doc_of(&schema, vec![para(&schema, "hello")]));
    }

    #[test]
    fn delete_a_whole_block_at_boundaries() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "ab"), para(&schema, "cd")]);
        let (new_doc, map) = apply_step(&schema, &doc, &Step::Delete { from: 4, to: 8 }).unwrap();
        assert_eq!(new_doc, doc_of(&schema, vec![para(&schema, "ab")]));
        assert_eq!(map.map(8, crate::doc::Assoc::Before), 4);
    }

    // ============ Structural validation ============

    #[test]
    fn inserting_an_invalid_child_fails_without_mutating() {
        let schema = schema();
        let row = Node::new(
            &schema,
            NodeKind::TableRow,
            NodeAttrs::default_for(NodeKind::TableRow),
            vec![Node::new(
                &schema,
                NodeKind::TableCell,
                NodeAttrs::default_for(NodeKind::TableCell),
                vec![para(&schema, "x")],
            )
            .unwrap()],
        )
        .unwrap();
        let table = Node::new(
            &schema,
            NodeKind::Table,
            NodeAttrs::Table(TableAttrs::default()),
            vec![row],
        )
        .unwrap();
        let doc = doc_of(&schema, vec![table]);
        let snapshot = doc.clone();

        // Try to splice a paragraph between the table's rows.
        let err = apply_step(
            &schema,
            &doc,
            &Step::Insert {
                pos: 1,
                content: vec![para(&schema, "nope")],
            },
        )
        .unwrap_err();

        assert_eq!(
            err,
            StructuralError::InvalidChildType {
                parent: NodeKind::Table,
                child: NodeKind::Paragraph,
            }
        );
        assert_eq!(doc, snapshot);
    }

    #[test]
    fn deleting_the_last_row_of_a_table_is_rejected() {
        let schema = schema();
        let cell = Node::new(
            &schema,
            NodeKind::TableCell,
            NodeAttrs::default_for(NodeKind::TableCell),
            vec![para(&schema, "x")],
        )
        .unwrap();
        let row = Node::new(
            &schema,
            NodeKind::TableRow,
            NodeAttrs::default_for(NodeKind::TableRow),
            vec![cell],
        )
        .unwrap();
        let row_size = row.node_size();
        let table = Node::new(
            &schema,
            NodeKind::Table,
            NodeAttrs::Table(TableAttrs::default()),
            vec![row],
        )
        .unwrap();
        let doc = doc_of(&schema, vec![table]);

        let err = apply_step(
            &schema,
            &doc,
            &Step::Delete {
                from: 1,
                to: 1 + row_size,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StructuralError::SchemaViolation(_)));
    }

    #[test]
    fn out_of_bounds_positions_are_rejected() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "ab")]);
        let err = apply_step(&schema, &doc, &Step::Delete { from: 2, to: 99 }).unwrap_err();
        assert!(matches!(err, StructuralError::OutOfBounds { .. }));
    }

    #[test]
    fn cross_block_mid_text_replace_is_rejected() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "ab"), para(&schema, "cd")]);
        let err = apply_step(&schema, &doc, &Step::Delete { from: 2, to: 6 }).unwrap_err();
        assert!(matches!(err, StructuralError::SchemaViolation(_)));
    }

    // ============ Marks ============

    #[test]
    fn add_mark_splits_partially_covered_text() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "hello")]);
        let mark = Mark::highlight("yellow");
        let (new_doc, _) = apply_step(
            &schema,
            &doc,
            &Step::AddMark {
                from: 2,
                to: 4,
                mark: mark.clone(),
            },
        )
        .unwrap();

        let p = new_doc.child(0).unwrap();
        assert_eq!(p.child_count(), 3);
        assert_eq!(p.child(0).unwrap().text_str(), Some("h"));
        assert_eq!(p.child(1).unwrap().text_str(), Some("el"));
        assert_eq!(p.child(1).unwrap().marks(), &[mark]);
        assert_eq!(p.child(2).unwrap().text_str(), Some("lo"));
        assert!(p.child(2).unwrap().marks().is_empty());
    }

    #[test]
    fn remove_mark_restores_the_original_structure() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "hello")]);
        let mark = Mark::highlight("yellow");
        let (marked, _) = apply_step(
            &schema,
            &doc,
            &Step::AddMark {
                from: 2,
                to: 4,
                mark: mark.clone(),
            },
        )
        .unwrap();
        let (unmarked, _) = apply_step(
            &schema,
            &marked,
            &Step::RemoveMark {
                from: 2,
                to: 4,
                mark,
            },
        )
        .unwrap();
        assert_eq!(unmarked, doc);
    }

    #[test]
    fn add_mark_spans_multiple_blocks() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "ab"), para(&schema, "cd")]);
        let mark = Mark::highlight("green");
        let (new_doc, _) = apply_step(
            &schema,
            &doc,
            &Step::AddMark {
                from: 1,
                to: 7,
                mark: mark.clone(),
            },
        )
        .unwrap();
        assert_eq!(new_doc.child(0).unwrap().child(0).unwrap().marks(), &[mark.clone()]);
        assert_eq!(new_doc.child(1).unwrap().child(0).unwrap().marks(), &[mark]);
    }

    #[test]
    fn fully_covered_table_row_takes_the_mark_as_decoration() {
        let schema = schema();
        let cell = Node::new(
            &schema,
            NodeKind::TableCell,
            NodeAttrs::default_for(NodeKind::TableCell),
            vec![para(&schema, "x")],
        )
        .unwrap();
        let row = Node::new(
            &schema,
            NodeKind::TableRow,
            NodeAttrs::default_for(NodeKind::TableRow),
            vec![cell],
        )
        .unwrap();
        let row_size = row.node_size();
        let table = Node::new(
            &schema,
            NodeKind::Table,
            NodeAttrs::Table(TableAttrs::default()),
            vec![row],
        )
        .unwrap();
        let doc = doc_of(&schema, vec![table]);

        let mark = Mark::highlight("row-yellow");
        let (new_doc, _) = apply_step(
            &schema,
            &doc,
            &Step::AddMark {
                from: 1,
                to: 1 + row_size,
                mark: mark.clone(),
            },
        )
        .unwrap();

        let new_row = new_doc.child(0).unwrap().child(0).unwrap();
        assert_eq!(new_row.marks(), &[mark]);
        // The text inside the row is untouched.
        let text = new_row.child(0).unwrap().child(0).unwrap().child(0).unwrap();
        assert!(text.marks().is_empty());
    }

    // ============ Node attrs ============

    #[test]
    fn set_node_attrs_replaces_the_payload() {
        let schema = schema();
        let cell = Node::new(
            &schema,
            NodeKind::TableCell,
            NodeAttrs::default_for(NodeKind::TableCell),
            vec![para(&schema, "x")],
        )
        .unwrap();
        let row = Node::new(
            &schema,
            NodeKind::TableRow,
            NodeAttrs::default_for(NodeKind::TableRow),
            vec![cell],
        )
        .unwrap();
        let table = Node::new(
            &schema,
            NodeKind::Table,
            NodeAttrs::Table(TableAttrs { header_row: false }),
            vec![row],
        )
        .unwrap();
        let doc = doc_of(&schema, vec![table]);

        let (new_doc, _) = apply_step(
            &schema,
            &doc,
            &Step::SetNodeAttrs {
                pos: 0,
                attrs: NodeAttrs::Table(TableAttrs { header_row: true }),
            },
        )
        .unwrap();
        assert!(new_doc.child(0).unwrap().attrs().table().unwrap().header_row);
    }

    #[test]
    fn set_node_attrs_rejects_mismatched_payload() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "x")]);
        let err = apply_step(
            &schema,
            &doc,
            &Step::SetNodeAttrs {
                pos: 0,
                attrs: NodeAttrs::Table(TableAttrs::default()),
            },
        )
        .unwrap_err();
        assert!(matches!(err, StructuralError::SchemaViolation(_)));
    }
}
