//! Structural table operations.
//!
//! Each operation inspects the current selection, derives coordinates
//! through the [`TableMap`], and builds a transaction - or returns `None`
//! when it does not apply. Schema-violating results (a table with zero
//! rows or columns) are prevented up front by refusing the operation,
//! not caught afterwards.

use tracing::trace;

use quillstone_schema::{
    Mark, NodeAttrs, NodeKind, Schema, TableAttrs, TableCellAttrs,
};

use crate::doc::{Node, ResolvedPos, StructuralError};
use crate::selection::Selection;
use crate::state::EditorState;
use crate::table::map::{cell_around, table_context_at, CellRect, TableContext};
use crate::transaction::Transaction;

/// Which side of the reference row/column an insert lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

/// Horizontal layout direction; under RTL the logical "before" column is
/// the visual "after".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Result of a sort request.
pub enum SortOutcome {
    /// Not inside a table, or the table cannot be sorted.
    NotApplicable,
    /// The rows are already in the requested order; success with no
    /// mutation.
    AlreadySorted,
    /// A transaction replacing the table with its sorted form.
    Sorted(Transaction),
}

/// Whether the selection sits inside a table.
pub fn is_in_table(state: &EditorState) -> bool {
    let probe = match state.selection() {
        Selection::Cell { anchor_cell, .. } => anchor_cell + 1,
        sel => sel.from(),
    };
    table_context_at(state.doc(), probe).is_some()
}

/// The table under the selection plus the selected cell rectangle (a
/// single-slot rectangle for a plain cursor).
pub(crate) fn selected_table(state: &EditorState) -> Option<(TableContext, CellRect)> {
    match state.selection() {
        Selection::Cell {
            anchor_cell,
            head_cell,
        } => {
            let ctx = table_context_at(state.doc(), anchor_cell + 1)?;
            let rect = ctx.map.rect_between(*anchor_cell, *head_cell)?;
            Some((ctx, rect))
        }
        sel => {
            let pos = sel.from();
            let ctx = table_context_at(state.doc(), pos)?;
            let cell = cell_around(state.doc(), pos)?;
            let rect = ctx.map.rect_between(cell, cell)?;
            Some((ctx, rect))
        }
    }
}

/// Row index for a plain cursor, recovered by a typed ancestor walk: the
/// child index the position takes inside its `table` ancestor.
pub fn cursor_row_index(doc: &Node, pos: usize) -> Option<usize> {
    let rpos = ResolvedPos::resolve(doc, pos).ok()?;
    let table_depth = rpos.find_ancestor(NodeKind::Table)?;
    rpos.find_ancestor(NodeKind::TableRow)?;
    Some(rpos.index(table_depth))
}

/// Boundary position before row `index` (or the table content end when
/// `index == height`).
fn row_boundary(ctx: &TableContext, index: usize) -> usize {
    let mut pos = ctx.table_pos + 1;
    for row in ctx.table.content().iter().take(index) {
        pos += row.node_size();
    }
    pos
}

/// A fresh cell filled with an empty paragraph (never empty content).
fn filled_cell(schema: &Schema) -> Result<Node, StructuralError> {
    let para = Node::new(schema, NodeKind::Paragraph, NodeAttrs::None, Vec::new())?;
    Node::new(
        schema,
        NodeKind::TableCell,
        NodeAttrs::TableCell(TableCellAttrs::default()),
        vec![para],
    )
}

/// Build the transaction inserting a row of empty cells relative to the
/// selection. Inserting before a header row keeps the header flag on the
/// original row: the table's `header_row` attr is toggled off around the
/// structural insert, so the header is not pushed down into a body row.
pub fn add_row(state: &EditorState, side: Side) -> Option<Transaction> {
    let (ctx, rect) = selected_table(state)?;
    let index = match side {
        Side::Before => rect.top,
        Side::After => rect.bottom,
    };
    let schema = state.schema();

    let has_header = ctx
        .table
        .attrs()
        .table()
        .is_some_and(|attrs| attrs.header_row);
    let restore_header = has_header && index == 0;

    let mut tx = state.transaction();
    if restore_header {
        tx = tx
            .set_node_attrs(
                ctx.table_pos,
                NodeAttrs::Table(TableAttrs { header_row: false }),
            )
            .ok()?;
    }

    // Cells spanning across the insertion boundary grow by one row
    // instead of getting a new cell in their columns.
    let mut covered_cols = vec![false; ctx.map.width()];
    if index > 0 && index < ctx.map.height() {
        for cell in ctx.map.cells() {
            if cell.row < index && cell.row + cell.rowspan > index {
                let attrs = cell_attrs_at(state.doc(), cell.pos)?;
                tx = tx
                    .set_node_attrs(
                        cell.pos,
                        NodeAttrs::TableCell(TableCellAttrs {
                            rowspan: attrs.rowspan + 1,
                            ..attrs
                        }),
                    )
                    .ok()?;
                for c in cell.col..(cell.col + cell.colspan).min(ctx.map.width()) {
                    covered_cols[c] = true;
                }
            }
        }
    }

    let mut cells = Vec::new();
    for covered in covered_cols {
        if !covered {
            cells.push(filled_cell(schema).ok()?);
        }
    }
    let row = Node::new(
        schema,
        NodeKind::TableRow,
        NodeAttrs::default_for(NodeKind::TableRow),
        cells,
    )
    .ok()?;

    tx = tx.insert(row_boundary(&ctx, index), vec![row]).ok()?;

    if restore_header {
        tx = tx
            .set_node_attrs(
                ctx.table_pos,
                NodeAttrs::Table(TableAttrs { header_row: true }),
            )
            .ok()?;
    }
    trace!(index, "built add_row transaction");
    Some(tx)
}

/// Build the transaction inserting a column of empty cells relative to
/// the selection. `direction` mirrors the logical side under RTL layout.
pub fn add_column(
    state: &EditorState,
    side: Side,
    direction: Direction,
) -> Option<Transaction> {
    let (ctx, rect) = selected_table(state)?;
    let index = match (side, direction) {
        (Side::Before, Direction::Ltr) | (Side::After, Direction::Rtl) => rect.left,
        (Side::After, Direction::Ltr) | (Side::Before, Direction::Rtl) => rect.right,
    };
    let schema = state.schema();

    let mut tx = state.transaction();

    // Cells spanning across the column boundary widen instead of being
    // split by a new cell.
    let mut covered_rows = vec![false; ctx.map.height()];
    if index > 0 && index < ctx.map.width() {
        for cell in ctx.map.cells() {
            if cell.col < index && cell.col + cell.colspan > index {
                let attrs = cell_attrs_at(state.doc(), cell.pos)?;
                tx = tx
                    .set_node_attrs(
                        cell.pos,
                        NodeAttrs::TableCell(TableCellAttrs {
                            colspan: attrs.colspan + 1,
                            ..attrs
                        }),
                    )
                    .ok()?;
                for r in cell.row..(cell.row + cell.rowspan).min(ctx.map.height()) {
                    covered_rows[r] = true;
                }
            }
        }
    }

    // Collect insertion positions per row from the pre-mutation map, then
    // apply them bottom-up so earlier positions stay valid.
    let mut inserts: Vec<usize> = Vec::new();
    let mut row_pos = ctx.table_pos + 1;
    for (r, row) in ctx.table.content().iter().enumerate() {
        if !covered_rows[r] {
            let mut insert_at = row_pos + 1 + row.content_size();
            let mut cell_pos = row_pos + 1;
            for cell in row.content() {
                let info = ctx.map.find_cell(cell_pos)?;
                if info.col >= index {
                    insert_at = cell_pos;
                    break;
                }
                cell_pos += cell.node_size();
            }
            inserts.push(insert_at);
        }
        row_pos += row.node_size();
    }

    inserts.sort_unstable();
    for pos in inserts.into_iter().rev() {
        tx = tx.insert(pos, vec![filled_cell(schema).ok()?]).ok()?;
    }
    trace!(index, "built add_column transaction");
    Some(tx)
}

/// Delete the selected rows. Applies only to an exact full-row
/// selection that leaves at least one row, with no merged cell crossing
/// the selection boundary.
pub fn delete_rows(state: &EditorState) -> Option<Transaction> {
    let (ctx, rect) = selected_table(state)?;
    if !matches!(state.selection(), Selection::Cell { .. }) || !ctx.map.is_row_rect(&rect) {
        return None;
    }
    if rect.height() >= ctx.map.height() {
        return None;
    }
    for cell in ctx.map.cells() {
        let crosses_top = cell.row < rect.top && cell.row + cell.rowspan > rect.top;
        let crosses_bottom = cell.row < rect.bottom && cell.row + cell.rowspan > rect.bottom;
        if crosses_top || crosses_bottom {
            return None;
        }
    }

    let from = row_boundary(&ctx, rect.top);
    let to = row_boundary(&ctx, rect.bottom);
    let tx = state
        .transaction()
        .delete(from, to)
        .ok()?
        .set_selection(Selection::cursor(ctx.table_pos))
        .ok()?;
    Some(tx)
}

/// Delete the selected columns. Applies only to an exact full-column
/// selection that leaves at least one column, with no merged cell
/// crossing the selection boundary.
pub fn delete_columns(state: &EditorState) -> Option<Transaction> {
    let (ctx, rect) = selected_table(state)?;
    if !matches!(state.selection(), Selection::Cell { .. }) || !ctx.map.is_col_rect(&rect) {
        return None;
    }
    if rect.width() >= ctx.map.width() {
        return None;
    }
    for cell in ctx.map.cells() {
        let crosses_left = cell.col < rect.left && cell.col + cell.colspan > rect.left;
        let crosses_right = cell.col < rect.right && cell.col + cell.colspan > rect.right;
        if crosses_left || crosses_right {
            return None;
        }
    }

    // Collect (pos, size) of every cell node starting inside the column
    // range, then delete bottom-up.
    let mut doomed: Vec<(usize, usize)> = Vec::new();
    let mut row_pos = ctx.table_pos + 1;
    for row in ctx.table.content() {
        let mut cell_pos = row_pos + 1;
        for cell in row.content() {
            let info = ctx.map.find_cell(cell_pos)?;
            if info.col >= rect.left && info.col < rect.right {
                doomed.push((cell_pos, cell.node_size()));
            }
            cell_pos += cell.node_size();
        }
        row_pos += row.node_size();
    }

    doomed.sort_unstable();
    let mut tx = state.transaction();
    for (pos, size) in doomed.into_iter().rev() {
        tx = tx.delete(pos, pos + size).ok()?;
    }
    let tx = tx.set_selection(Selection::cursor(ctx.table_pos)).ok()?;
    Some(tx)
}

/// Sort the table's body rows by the cell text of one column.
///
/// The header row never participates. Values compare numerically iff
/// every value in the column parses as a number (an empty cell forces
/// lexical comparison); `order` picks the direction. An already-sorted
/// table reports success without building a transaction.
pub fn sort_by_column(state: &EditorState, col: usize, order: SortOrder) -> SortOutcome {
    let Some((ctx, _)) = selected_table(state) else {
        return SortOutcome::NotApplicable;
    };
    if col >= ctx.map.width() {
        return SortOutcome::NotApplicable;
    }
    // Sorting a grid with merged cells would tear the merge apart.
    if ctx
        .map
        .cells()
        .iter()
        .any(|c| c.rowspan > 1 || c.colspan > 1)
    {
        return SortOutcome::NotApplicable;
    }

    let has_header = ctx
        .table
        .attrs()
        .table()
        .is_some_and(|attrs| attrs.header_row);
    let body_start = usize::from(has_header);
    let rows: Vec<Node> = ctx.table.content().to_vec();
    if rows.len() <= body_start + 1 {
        return SortOutcome::AlreadySorted;
    }

    let keys: Vec<String> = rows[body_start..]
        .iter()
        .map(|row| {
            row.child(col)
                .map(|cell| cell.text_between(0, cell.content_size(), " "))
                .unwrap_or_default()
        })
        .collect();

    let numeric = keys
        .iter()
        .all(|k| !k.trim().is_empty() && k.trim().parse::<f64>().is_ok());

    let mut order_indices: Vec<usize> = (0..keys.len()).collect();
    order_indices.sort_by(|&a, &b| {
        let cmp = if numeric {
            let ka = keys[a].trim().parse::<f64>().unwrap_or(f64::NAN);
            let kb = keys[b].trim().parse::<f64>().unwrap_or(f64::NAN);
            ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
        } else {
            keys[a].cmp(&keys[b])
        };
        match order {
            SortOrder::Asc => cmp,
            SortOrder::Desc => cmp.reverse(),
        }
    });

    if order_indices.iter().enumerate().all(|(i, &j)| i == j) {
        return SortOutcome::AlreadySorted;
    }

    let mut new_rows: Vec<Node> = rows[..body_start].to_vec();
    new_rows.extend(order_indices.iter().map(|&i| rows[body_start + i].clone()));

    let Ok(new_table) = Node::new(
        state.schema(),
        NodeKind::Table,
        ctx.table.attrs().clone(),
        new_rows,
    ) else {
        return SortOutcome::NotApplicable;
    };

    let table_end = ctx.table_pos + ctx.table.node_size();
    match state
        .transaction()
        .replace_range(ctx.table_pos, table_end, vec![new_table])
    {
        Ok(tx) => SortOutcome::Sorted(tx),
        Err(_) => SortOutcome::NotApplicable,
    }
}

/// A Cell Selection spanning the map's first to last cell.
pub fn select_table(state: &EditorState) -> Option<Transaction> {
    let (ctx, _) = selected_table(state)?;
    let selection = Selection::Cell {
        anchor_cell: ctx.map.first_cell().pos,
        head_cell: ctx.map.last_cell().pos,
    };
    state.transaction().set_selection(selection).ok()
}

/// Move the cursor out of the table: only from the topmost row moving up
/// or the bottommost row moving down; anything else is inapplicable so
/// ordinary in-table movement proceeds.
pub fn move_out_of_table(
    state: &EditorState,
    direction: VerticalDirection,
) -> Option<Transaction> {
    let Selection::Text { anchor, head } = state.selection() else {
        return None;
    };
    if anchor != head {
        return None;
    }
    let ctx = table_context_at(state.doc(), *head)?;
    let row = cursor_row_index(state.doc(), *head)?;
    let target = match direction {
        VerticalDirection::Up if row == 0 => ctx.table_pos,
        VerticalDirection::Down if row + 1 == ctx.map.height() => {
            ctx.table_pos + ctx.table.node_size()
        }
        _ => return None,
    };
    state
        .transaction()
        .set_selection(Selection::cursor(target))
        .ok()
}

/// Three-way toggle of a highlight decoration on the selected row.
pub fn toggle_row_highlight(state: &EditorState, color: &str) -> Option<Transaction> {
    let (ctx, rect) = selected_table(state)?;
    let row_node = ctx.table.child(rect.top)?;
    let row_from = row_boundary(&ctx, rect.top);
    let row_to = row_from + row_node.node_size();

    let mark = Mark::highlight(color);
    let existing = row_node
        .marks()
        .iter()
        .find(|m| m.kind == mark.kind)
        .cloned();

    let tx = state.transaction();
    let tx = match existing {
        Some(current) if current == mark => tx.remove_mark(row_from, row_to, current).ok()?,
        Some(current) => tx
            .remove_mark(row_from, row_to, current)
            .ok()?
            .add_mark(row_from, row_to, mark)
            .ok()?,
        None => tx.add_mark(row_from, row_to, mark).ok()?,
    };
    Some(tx)
}

/// Cell attrs of the cell node starting at `pos` (doc coordinates).
fn cell_attrs_at(doc: &Node, pos: usize) -> Option<TableCellAttrs> {
    let rpos = ResolvedPos::resolve(doc, pos).ok()?;
    let cell = rpos.node_after()?;
    cell.attrs().table_cell().cloned()
}
