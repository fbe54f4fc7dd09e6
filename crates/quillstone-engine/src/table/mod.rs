/*!
 * # Table Structural Engine
 *
 * Structural table edits driven by a derived coordinate map.
 *
 * - **`map`**: the `(row, col) -> position` grid over one table node,
 *   expanding `rowspan`/`colspan`, rebuilt on demand and never cached
 *   across mutations.
 * - **`ops`**: row/column insertion and deletion, column sort, whole-table
 *   selection, and movement out of the table. Every operation resolves
 *   its coordinates through the map; none of them does ad hoc position
 *   arithmetic over the raw tree.
 *
 * Operations return `None` (inapplicable) rather than failing when the
 * selection is not inside a table or not of the required shape; the
 * command layer turns that into chain fall-through.
 */

pub mod map;
pub mod ops;

pub use map::{cell_around, table_context_at, CellInfo, CellRect, TableContext, TableMap};
pub use ops::{
    Direction, Side, SortOrder, SortOutcome, VerticalDirection,
};
