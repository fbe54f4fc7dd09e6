//! Transactional rich-document editing core.
//!
//! The engine is single-threaded, synchronous, and pure: every command
//! and query runs over an immutable snapshot and returns immediately.
//! Concurrency lives at the boundary - the collaboration layer merges
//! remote edits and hands the core a new consistent snapshot via
//! [`EditorState::with_doc`]; the core never merges concurrent edits
//! itself.

pub mod commands;
pub mod doc;
pub mod input_rules;
pub mod marks;
pub mod selection;
pub mod state;
pub mod table;
pub mod transaction;

// Re-export key types for easier usage
pub use doc::{apply_step, Assoc, Node, PositionMap, ResolvedPos, Step, StructuralError};
pub use marks::{atom_mark, comment_range, mark_at, mark_range, MarkRange};
pub use selection::Selection;
pub use state::{ApplyError, EditorState};
pub use table::{CellInfo, CellRect, TableContext, TableMap};
pub use transaction::Transaction;
