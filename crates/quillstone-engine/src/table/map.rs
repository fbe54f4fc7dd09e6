//! The table coordinate map: a rectangular `(row, col) -> position` grid
//! derived from a table node.
//!
//! The map is rebuilt on demand from the current snapshot and never cached
//! across mutations; cell positions inside it are absolute positions (the
//! boundary before each cell) in the snapshot it was built from.

use std::collections::HashMap;

use tracing::trace;

use quillstone_schema::NodeKind;

use crate::doc::{Node, ResolvedPos, StructuralError};

/// One cell's placement in the grid. `row`/`col` address the cell's
/// top-left corner; merged cells cover `rowspan * colspan` grid slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellInfo {
    /// Absolute position of the boundary before the cell node.
    pub pos: usize,
    pub row: usize,
    pub col: usize,
    pub rowspan: usize,
    pub colspan: usize,
}

/// A rectangular region of grid slots; `bottom`/`right` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl CellRect {
    pub fn width(&self) -> usize {
        self.right - self.left
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top
    }

    /// Smallest rectangle covering both inputs.
    pub fn union(&self, other: &CellRect) -> CellRect {
        CellRect {
            top: self.top.min(other.top),
            left: self.left.min(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.max(other.right),
        }
    }
}

/// Derived coordinate grid over one table node.
#[derive(Debug, Clone)]
pub struct TableMap {
    width: usize,
    height: usize,
    /// Cells in document order.
    cells: Vec<CellInfo>,
    /// Row-major: index into `cells` for every grid slot.
    grid: Vec<usize>,
}

impl TableMap {
    /// Walk a table node's rows and cells, expanding `rowspan`/`colspan`
    /// into a dense grid. `table_pos` is the boundary before the table.
    pub fn build(table: &Node, table_pos: usize) -> Result<TableMap, StructuralError> {
        if table.kind() != NodeKind::Table {
            return Err(StructuralError::SchemaViolation(format!(
                "table map built over a {} node",
                table.kind()
            )));
        }

        let height = table.child_count();
        let mut cells: Vec<CellInfo> = Vec::new();
        let mut occupied: HashMap<(usize, usize), usize> = HashMap::new();

        let mut row_pos = table_pos + 1;
        for (r, row) in table.content().iter().enumerate() {
            let mut cell_pos = row_pos + 1;
            let mut c = 0;
            for cell in row.content() {
                while occupied.contains_key(&(r, c)) {
                    c += 1;
                }
                let attrs = cell.attrs().table_cell().cloned().unwrap_or_default();
                let rowspan = attrs.rowspan as usize;
                let colspan = attrs.colspan as usize;
                if r + rowspan > height {
                    return Err(StructuralError::SchemaViolation(format!(
                        "rowspan at ({r}, {c}) extends past the last row"
                    )));
                }
                let index = cells.len();
                cells.push(CellInfo {
                    pos: cell_pos,
                    row: r,
                    col: c,
                    rowspan,
                    colspan,
                });
                for dr in 0..rowspan {
                    for dc in 0..colspan {
                        if occupied.insert((r + dr, c + dc), index).is_some() {
                            return Err(StructuralError::SchemaViolation(format!(
                                "overlapping cells at ({}, {})",
                                r + dr,
                                c + dc
                            )));
                        }
                    }
                }
                c += colspan;
                cell_pos += cell.node_size();
            }
            row_pos += row.node_size();
        }

        let width = occupied.keys().map(|&(_, c)| c + 1).max().unwrap_or(0);
        let mut grid = Vec::with_capacity(width * height);
        for r in 0..height {
            for c in 0..width {
                match occupied.get(&(r, c)) {
                    Some(&index) => grid.push(index),
                    None => {
                        return Err(StructuralError::SchemaViolation(format!(
                            "ragged table: no cell covers ({r}, {c})"
                        )));
                    }
                }
            }
        }

        trace!(width, height, cells = cells.len(), "built table map");
        Ok(TableMap {
            width,
            height,
            cells,
            grid,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[CellInfo] {
        &self.cells
    }

    /// Cell covering a grid slot.
    pub fn cell_at(&self, row: usize, col: usize) -> &CellInfo {
        &self.cells[self.grid[row * self.width + col]]
    }

    /// Position of the cell covering a grid slot.
    pub fn pos_at(&self, row: usize, col: usize) -> usize {
        self.cell_at(row, col).pos
    }

    /// The cell whose boundary-before position equals `pos`.
    pub fn find_cell(&self, pos: usize) -> Option<&CellInfo> {
        self.cells.iter().find(|c| c.pos == pos)
    }

    pub fn first_cell(&self) -> &CellInfo {
        &self.cells[0]
    }

    pub fn last_cell(&self) -> &CellInfo {
        &self.cells[self.cells.len() - 1]
    }

    /// Bounding rectangle of two cells (given by their before-positions),
    /// widened to cover their spans.
    pub fn rect_between(&self, a: usize, b: usize) -> Option<CellRect> {
        let a = self.find_cell(a)?;
        let b = self.find_cell(b)?;
        Some(
            CellRect {
                top: a.row,
                left: a.col,
                bottom: a.row + a.rowspan,
                right: a.col + a.colspan,
            }
            .union(&CellRect {
                top: b.row,
                left: b.col,
                bottom: b.row + b.rowspan,
                right: b.col + b.colspan,
            }),
        )
    }

    /// The rectangle covering an entire row.
    pub fn rect_for_row(&self, row: usize) -> CellRect {
        CellRect {
            top: row,
            left: 0,
            bottom: row + 1,
            right: self.width,
        }
    }

    /// The rectangle covering an entire column.
    pub fn rect_for_col(&self, col: usize) -> CellRect {
        CellRect {
            top: 0,
            left: col,
            bottom: self.height,
            right: col + 1,
        }
    }

    /// Whether a rectangle spans the table's full width.
    pub fn is_row_rect(&self, rect: &CellRect) -> bool {
        rect.left == 0 && rect.right == self.width
    }

    /// Whether a rectangle spans the table's full height.
    pub fn is_col_rect(&self, rect: &CellRect) -> bool {
        rect.top == 0 && rect.bottom == self.height
    }

    /// Positions of the distinct cells intersecting a rectangle, in
    /// document order.
    pub fn cells_in_rect(&self, rect: &CellRect) -> Vec<usize> {
        let mut seen = vec![false; self.cells.len()];
        let mut out = Vec::new();
        for r in rect.top..rect.bottom {
            for c in rect.left..rect.right {
                let index = self.grid[r * self.width + c];
                if !seen[index] {
                    seen[index] = true;
                    out.push(index);
                }
            }
        }
        out.sort_unstable();
        out.into_iter().map(|i| self.cells[i].pos).collect()
    }
}

/// A table located in a document, with its derived map.
#[derive(Debug, Clone)]
pub struct TableContext {
    pub table: Node,
    /// Boundary before the table node.
    pub table_pos: usize,
    pub map: TableMap,
}

/// Locate the table enclosing `pos` and build its map.
pub fn table_context_at(doc: &Node, pos: usize) -> Option<TableContext> {
    let rpos = ResolvedPos::resolve(doc, pos).ok()?;
    let depth = rpos.find_ancestor(NodeKind::Table)?;
    let table = rpos.node(depth).clone();
    let table_pos = rpos.before(depth)?;
    let map = TableMap::build(&table, table_pos).ok()?;
    Some(TableContext {
        table,
        table_pos,
        map,
    })
}

/// Position of the boundary before the cell enclosing `pos`, if any.
pub fn cell_around(doc: &Node, pos: usize) -> Option<usize> {
    let rpos = ResolvedPos::resolve(doc, pos).ok()?;
    let depth = rpos.find_ancestor(NodeKind::TableCell)?;
    rpos.before(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quillstone_schema::{NodeAttrs, Schema, TableCellAttrs};

    fn schema() -> Schema {
        Schema::standard()
    }

    fn cell(schema: &Schema, text: &str) -> Node {
        cell_with_span(schema, text, 1, 1)
    }

    fn cell_with_span(schema: &Schema, text: &str, rowspan: u32, colspan: u32) -> Node {
        let para = Node::new(
            schema,
            NodeKind::Paragraph,
            NodeAttrs::None,
            vec![Node::text(text)],
        )
        .unwrap();
        Node::new(
            schema,
            NodeKind::TableCell,
            NodeAttrs::TableCell(TableCellAttrs {
                rowspan,
                colspan,
                align: None,
            }),
            vec![para],
        )
        .unwrap()
    }

    fn row(schema: &Schema, cells: Vec<Node>) -> Node {
        Node::new(
            schema,
            NodeKind::TableRow,
            NodeAttrs::default_for(NodeKind::TableRow),
            cells,
        )
        .unwrap()
    }

    fn table(schema: &Schema, rows: Vec<Node>) -> Node {
        Node::new(
            schema,
            NodeKind::Table,
            NodeAttrs::default_for(NodeKind::Table),
            rows,
        )
        .unwrap()
    }

    #[test]
    fn simple_grid_positions() {
        let schema = schema();
        let t = table(
            &schema,
            vec![
                row(&schema, vec![cell(&schema, "a"), cell(&schema, "b")]),
                row(&schema, vec![cell(&schema, "c"), cell(&schema, "d")]),
            ],
        );
        let map = TableMap::build(&t, 0).unwrap();

        assert_eq!(map.width(), 2);
        assert_eq!(map.height(), 2);
        // Cell "a": table content starts at 1, row content at 2.
        // cell(para("x")) has size 5, so "b" sits at 2 + 5 = 7.
        assert_eq!(map.pos_at(0, 0), 2);
        assert_eq!(map.pos_at(0, 1), 7);
        // Row 0 has size 12; row 1 content starts at 1 + 12 + 1 = 14.
        assert_eq!(map.pos_at(1, 0), 14);
        assert_eq!(map.pos_at(1, 1), 19);
    }

    #[test]
    fn colspan_covers_multiple_slots() {
        let schema = schema();
        let t = table(
            &schema,
            vec![
                row(&schema, vec![cell_with_span(&schema, "wide", 1, 2)]),
                row(&schema, vec![cell(&schema, "a"), cell(&schema, "b")]),
            ],
        );
        let map = TableMap::build(&t, 0).unwrap();

        assert_eq!(map.width(), 2);
        assert_eq!(map.pos_at(0, 0), map.pos_at(0, 1));
        assert_ne!(map.pos_at(1, 0), map.pos_at(1, 1));
    }

    #[test]
    fn rowspan_reserves_slots_in_later_rows() {
        let schema = schema();
        let t = table(
            &schema,
            vec![
                row(
                    &schema,
                    vec![cell_with_span(&schema, "tall", 2, 1), cell(&schema, "b")],
                ),
                row(&schema, vec![cell(&schema, "c")]),
            ],
        );
        let map = TableMap::build(&t, 0).unwrap();

        assert_eq!(map.width(), 2);
        assert_eq!(map.height(), 2);
        // The tall cell covers (0,0) and (1,0); row 1's only cell lands in
        // column 1.
        assert_eq!(map.pos_at(0, 0), map.pos_at(1, 0));
        assert_eq!(map.cell_at(1, 1).row, 1);
        assert_eq!(map.cell_at(1, 1).col, 1);
    }

    #[test]
    fn ragged_tables_are_rejected() {
        let schema = schema();
        let t = table(
            &schema,
            vec![
                row(&schema, vec![cell(&schema, "a"), cell(&schema, "b")]),
                row(&schema, vec![cell(&schema, "c")]),
            ],
        );
        let err = TableMap::build(&t, 0).unwrap_err();
        assert!(matches!(err, StructuralError::SchemaViolation(_)));
    }

    #[test]
    fn rect_between_covers_spans() {
        let schema = schema();
        let t = table(
            &schema,
            vec![
                row(&schema, vec![cell(&schema, "a"), cell(&schema, "b")]),
                row(&schema, vec![cell(&schema, "c"), cell(&schema, "d")]),
            ],
        );
        let map = TableMap::build(&t, 0).unwrap();

        let rect = map
            .rect_between(map.pos_at(0, 0), map.pos_at(1, 1))
            .unwrap();
        assert_eq!(
            rect,
            CellRect {
                top: 0,
                left: 0,
                bottom: 2,
                right: 2
            }
        );
        assert!(map.is_row_rect(&map.rect_for_row(1)));
        assert!(map.is_col_rect(&map.rect_for_col(0)));

        let single = map
            .rect_between(map.pos_at(0, 1), map.pos_at(0, 1))
            .unwrap();
        assert_eq!(single.width(), 1);
        assert_eq!(single.height(), 1);
        assert!(!map.is_row_rect(&single));
    }

    #[test]
    fn cells_in_rect_deduplicates_merged_cells() {
        let schema = schema();
        let t = table(
            &schema,
            vec![
                row(&schema, vec![cell_with_span(&schema, "wide", 1, 2)]),
                row(&schema, vec![cell(&schema, "a"), cell(&schema, "b")]),
            ],
        );
        let map = TableMap::build(&t, 0).unwrap();
        let rect = CellRect {
            top: 0,
            left: 0,
            bottom: 2,
            right: 2,
        };
        let cells = map.cells_in_rect(&rect);
        assert_eq!(cells.len(), 3);
    }
}
