//! Command wrappers over the table structural engine.
//!
//! Every command checks table membership first and declines (`false`,
//! never an error) when the selection is outside a table or not of the
//! required shape, so table keybindings fall through cleanly elsewhere.

use crate::commands::{command_fn, Command};
use crate::state::EditorState;
use crate::table::ops::{self, Direction, Side, SortOrder, SortOutcome, VerticalDirection};

pub fn add_row_before() -> Command {
    command_fn("add_row_before", |state| ops::add_row(state, Side::Before))
}

pub fn add_row_after() -> Command {
    command_fn("add_row_after", |state| ops::add_row(state, Side::After))
}

pub fn add_column_before(direction: Direction) -> Command {
    command_fn("add_column_before", move |state| {
        ops::add_column(state, Side::Before, direction)
    })
}

pub fn add_column_after(direction: Direction) -> Command {
    command_fn("add_column_after", move |state| {
        ops::add_column(state, Side::After, direction)
    })
}

/// Delete the selected rows; only applicable to an exact full-row
/// selection.
pub fn delete_row_selection() -> Command {
    command_fn("delete_row_selection", ops::delete_rows)
}

/// Delete the selected columns; only applicable to an exact full-column
/// selection.
pub fn delete_column_selection() -> Command {
    command_fn("delete_column_selection", ops::delete_columns)
}

/// Sort the table by the column under the selection. An already-sorted
/// table succeeds without dispatching anything.
pub fn sort_by_selected_column(order: SortOrder) -> Command {
    Command::new("sort_by_selected_column", move |state, dispatch| {
        let Some((_, rect)) = ops::selected_table(state) else {
            return false;
        };
        match ops::sort_by_column(state, rect.left, order) {
            SortOutcome::NotApplicable => false,
            SortOutcome::AlreadySorted => true,
            SortOutcome::Sorted(tx) => {
                if let Some(dispatch) = dispatch {
                    dispatch(tx);
                }
                true
            }
        }
    })
}

/// Select the whole table as a Cell Selection.
pub fn select_table() -> Command {
    command_fn("select_table", ops::select_table)
}

/// Move the cursor out of the table from its top or bottom edge.
pub fn move_out_of_table(direction: VerticalDirection) -> Command {
    command_fn("move_out_of_table", move |state| {
        ops::move_out_of_table(state, direction)
    })
}

/// Toggle a highlight decoration on the selected row.
pub fn toggle_row_highlight(color: &'static str) -> Command {
    command_fn("toggle_row_highlight", move |state| {
        ops::toggle_row_highlight(state, color)
    })
}

/// Toolbar predicate shared by every table command.
pub fn is_in_table(state: &EditorState) -> bool {
    ops::is_in_table(state)
}
