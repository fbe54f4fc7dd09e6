//! The selection model: three variants over shared position semantics.
//!
//! Selections are plain data resolved against a specific snapshot; they
//! never outlive a transaction without being remapped through its
//! position maps.

use serde::{Deserialize, Serialize};

use quillstone_schema::Schema;

use crate::doc::{Assoc, Node, PositionMap, ResolvedPos, StructuralError};
use crate::table::map::{cell_around, table_context_at, TableMap};

/// The user's current addressable focus in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// A text range; `anchor == head` is a collapsed cursor.
    Text { anchor: usize, head: usize },
    /// The node immediately after `pos` is selected as a whole.
    Node { pos: usize },
    /// A rectangular region of table cells, addressed by the boundary
    /// positions before the anchor and head cells.
    Cell {
        anchor_cell: usize,
        head_cell: usize,
    },
}

impl Selection {
    /// Collapsed cursor at a position.
    pub fn cursor(pos: usize) -> Selection {
        Selection::Text {
            anchor: pos,
            head: pos,
        }
    }

    /// Resolve two endpoint positions into the most specific valid
    /// variant:
    ///
    /// - endpoints wrapping exactly one atom node produce a Node
    ///   Selection;
    /// - endpoints inside the same table but different cells produce a
    ///   Cell Selection;
    /// - anything else is a Text Selection.
    pub fn resolve(
        schema: &Schema,
        doc: &Node,
        anchor: usize,
        head: usize,
    ) -> Result<Selection, StructuralError> {
        let ra = ResolvedPos::resolve(doc, anchor)?;
        ResolvedPos::resolve(doc, head)?;

        let (from, to) = (anchor.min(head), anchor.max(head));

        // Exactly one atom node between the endpoints?
        if ra.text_offset() == 0 && anchor == from {
            if let Some(node) = ra.node_after() {
                if schema.is_atom(node.kind()) && to == from + node.node_size() {
                    return Ok(Selection::Node { pos: from });
                }
            }
        }

        // Both endpoints inside one table, in different cells?
        if let (Some(anchor_cell), Some(head_cell)) =
            (cell_around(doc, anchor), cell_around(doc, head))
        {
            if anchor_cell != head_cell {
                let same_table = table_context_at(doc, anchor)
                    .zip(table_context_at(doc, head))
                    .is_some_and(|(a, b)| a.table_pos == b.table_pos);
                if same_table {
                    return Ok(Selection::Cell {
                        anchor_cell,
                        head_cell,
                    });
                }
            }
        }

        Ok(Selection::Text { anchor, head })
    }

    /// A Cell Selection spanning an entire row.
    pub fn row_selection(map: &TableMap, row: usize) -> Selection {
        Selection::Cell {
            anchor_cell: map.pos_at(row, 0),
            head_cell: map.pos_at(row, map.width() - 1),
        }
    }

    /// A Cell Selection spanning an entire column.
    pub fn col_selection(map: &TableMap, col: usize) -> Selection {
        Selection::Cell {
            anchor_cell: map.pos_at(0, col),
            head_cell: map.pos_at(map.height() - 1, col),
        }
    }

    /// Grow a Cell Selection to the bounding rectangle of the existing
    /// region and one more cell (shift-click growth). Derived through the
    /// table map, never through raw position arithmetic.
    pub fn expand_to_cell(&self, map: &TableMap, cell_pos: usize) -> Option<Selection> {
        let Selection::Cell {
            anchor_cell,
            head_cell,
        } = self
        else {
            return None;
        };
        let current = map.rect_between(*anchor_cell, *head_cell)?;
        let added = map.rect_between(cell_pos, cell_pos)?;
        let rect = current.union(&added);
        Some(Selection::Cell {
            anchor_cell: map.pos_at(rect.top, rect.left),
            head_cell: map.pos_at(rect.bottom - 1, rect.right - 1),
        })
    }

    /// Whether a Cell Selection covers one or more full rows.
    pub fn is_row_selection(&self, doc: &Node) -> bool {
        self.cell_rect(doc)
            .is_some_and(|(map, rect)| map.is_row_rect(&rect))
    }

    /// Whether a Cell Selection covers one or more full columns.
    pub fn is_col_selection(&self, doc: &Node) -> bool {
        self.cell_rect(doc)
            .is_some_and(|(map, rect)| map.is_col_rect(&rect))
    }

    /// The covered rectangle of a Cell Selection, with the map it was
    /// derived from.
    pub fn cell_rect(&self, doc: &Node) -> Option<(TableMap, crate::table::map::CellRect)> {
        let Selection::Cell {
            anchor_cell,
            head_cell,
        } = self
        else {
            return None;
        };
        let ctx = table_context_at(doc, anchor_cell + 1)?;
        let rect = ctx.map.rect_between(*anchor_cell, *head_cell)?;
        Some((ctx.map, rect))
    }

    /// Whether the selection covers no content.
    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Text { anchor, head } if anchor == head)
    }

    /// Smallest position touched by the selection.
    pub fn from(&self) -> usize {
        match self {
            Selection::Text { anchor, head } => *anchor.min(head),
            Selection::Node { pos } => *pos,
            Selection::Cell {
                anchor_cell,
                head_cell,
            } => *anchor_cell.min(head_cell),
        }
    }

    /// Largest *start* position touched by the selection. For Node and
    /// Cell variants the selected nodes extend past this boundary.
    pub fn to(&self) -> usize {
        match self {
            Selection::Text { anchor, head } => *anchor.max(head),
            Selection::Node { pos } => *pos,
            Selection::Cell {
                anchor_cell,
                head_cell,
            } => *anchor_cell.max(head_cell),
        }
    }

    /// Remap through the position maps of an applied transaction.
    pub fn map_through(&self, maps: &[PositionMap]) -> Selection {
        match self {
            Selection::Text { anchor, head } => Selection::Text {
                anchor: PositionMap::map_through(maps, *anchor, Assoc::Before),
                head: PositionMap::map_through(maps, *head, Assoc::Before),
            },
            Selection::Node { pos } => Selection::Node {
                pos: PositionMap::map_through(maps, *pos, Assoc::Before),
            },
            Selection::Cell {
                anchor_cell,
                head_cell,
            } => Selection::Cell {
                anchor_cell: PositionMap::map_through(maps, *anchor_cell, Assoc::Before),
                head_cell: PositionMap::map_through(maps, *head_cell, Assoc::Before),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quillstone_schema::{NodeAttrs, NodeKind};

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

    fn cell(schema: &Schema, text: &str) -> Node {
        Node::new(
            schema,
            NodeKind::TableCell,
            NodeAttrs::default_for(NodeKind::TableCell),
            vec![para(schema, text)],
        )
        .unwrap()
    }

    fn two_by_two(schema: &Schema) -> Node {
        let rows = vec![
            Node::new(
                schema,
                NodeKind::TableRow,
                NodeAttrs::default_for(NodeKind::TableRow),
                vec![cell(schema, "a"), cell(schema, "b")],
            )
            .unwrap(),
            Node::new(
                schema,
                NodeKind::TableRow,
                NodeAttrs::default_for(NodeKind::TableRow),
                vec![cell(schema, "c"), cell(schema, "d")],
            )
            .unwrap(),
        ];
        let table = Node::new(
            schema,
            NodeKind::Table,
            NodeAttrs::default_for(NodeKind::Table),
            rows,
        )
        .unwrap();
        Node::new(schema, NodeKind::Doc, NodeAttrs::None, vec![table]).unwrap()
    }

    #[test]
    fn plain_ranges_resolve_to_text_selections() {
        let schema = schema();
        let doc = Node::new(
            &schema,
            NodeKind::Doc,
            NodeAttrs::None,
            vec![para(&schema, "hello")],
        )
        .unwrap();
        let sel = Selection::resolve(&schema, &doc, 1, 4).unwrap();
        assert_eq!(sel, Selection::Text { anchor: 1, head: 4 });
        assert!(!sel.is_empty());
        assert!(Selection::cursor(2).is_empty());
    }

    #[test]
    fn wrapping_an_atom_resolves_to_a_node_selection() {
        let schema = schema();
        let hr = Node::leaf(&schema, NodeKind::HorizontalRule, NodeAttrs::None).unwrap();
        let doc = Node::new(
            &schema,
            NodeKind::Doc,
            NodeAttrs::None,
            vec![para(&schema, "x"), hr],
        )
        .unwrap();
        // Paragraph spans 0..3, the rule sits at 3..4.
        let sel = Selection::resolve(&schema, &doc, 3, 4).unwrap();
        assert_eq!(sel, Selection::Node { pos: 3 });
    }

    #[test]
    fn wrapping_a_table_resolves_to_a_node_selection() {
        let schema = schema();
        let doc = two_by_two(&schema);
        let table_size = doc.child(0).unwrap().node_size();
        let sel = Selection::resolve(&schema, &doc, 0, table_size).unwrap();
        assert_eq!(sel, Selection::Node { pos: 0 });
    }

    #[test]
    fn endpoints_in_two_cells_resolve_to_a_cell_selection() {
        let schema = schema();
        let doc = two_by_two(&schema);
        // Positions 4 and 9 are inside the texts of cells "a" and "b".
        let sel = Selection::resolve(&schema, &doc, 4, 9).unwrap();
        let Selection::Cell {
            anchor_cell,
            head_cell,
        } = sel
        else {
            panic!("expected cell selection, got {sel:?}");
        };
        assert_eq!(anchor_cell, 2);
        assert_eq!(head_cell, 7);
    }

    #[test]
    fn endpoints_in_one_cell_stay_a_text_selection() {
        let schema = schema();
        let doc = two_by_two(&schema);
        let sel = Selection::resolve(&schema, &doc, 4, 5).unwrap();
        assert!(matches!(sel, Selection::Text { .. }));
    }

    #[test]
    fn row_and_col_selections_match_table_dimensions() {
        let schema = schema();
        let doc = two_by_two(&schema);
        let ctx = table_context_at(&doc, 4).unwrap();

        let row_sel = Selection::row_selection(&ctx.map, 0);
        assert!(row_sel.is_row_selection(&doc));
        assert!(!row_sel.is_col_selection(&doc));

        let col_sel = Selection::col_selection(&ctx.map, 1);
        assert!(col_sel.is_col_selection(&doc));
        assert!(!col_sel.is_row_selection(&doc));

        // A single-cell region is neither.
        let single = Selection::Cell {
            anchor_cell: ctx.map.pos_at(0, 0),
            head_cell: ctx.map.pos_at(0, 0),
        };
        assert!(!single.is_row_selection(&doc));
        assert!(!single.is_col_selection(&doc));
    }

    #[test]
    fn expansion_rederives_the_bounding_rectangle() {
        let schema = schema();
        let doc = two_by_two(&schema);
        let ctx = table_context_at(&doc, 4).unwrap();

        let single = Selection::Cell {
            anchor_cell: ctx.map.pos_at(0, 0),
            head_cell: ctx.map.pos_at(0, 0),
        };
        let grown = single
            .expand_to_cell(&ctx.map, ctx.map.pos_at(1, 1))
            .unwrap();
        let (_, rect) = grown.cell_rect(&doc).unwrap();
        assert_eq!(rect.width(), 2);
        assert_eq!(rect.height(), 2);
    }

    #[test]
    fn selections_remap_through_position_maps() {
        let maps = vec![PositionMap::single(0, 0, 3)];
        let sel = Selection::Text { anchor: 2, head: 5 };
        assert_eq!(
            sel.map_through(&maps),
            Selection::Text { anchor: 5, head: 8 }
        );
    }
}
