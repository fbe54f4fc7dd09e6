//! Closed node/mark vocabulary and schema metadata for the quillstone
//! editing engine.
//!
//! The engine core is schema-driven: it consumes the declarations here
//! (node kinds, mark kinds, content rules, `inclusive`/`excludes` flags)
//! and never compares type names as strings.

pub mod attrs;
pub mod kinds;
pub mod mark;
pub mod schema;

pub use attrs::{
    CellAlign, CommentAttrs, HeadingAttrs, HighlightAttrs, ImageAttrs, LinkAttrs, MarkAttrs,
    NodeAttrs, OrderedListAttrs, TableAttrs, TableCellAttrs, TableRowAttrs,
};
pub use kinds::{MarkKind, NodeKind};
pub use mark::Mark;
pub use schema::{ContentRule, Excludes, MarkSpec, NodeSpec, Schema};

use thiserror::Error;

/// Errors raised while constructing schema-level values.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("attrs payload does not belong to node kind {kind}")]
    NodeAttrsMismatch { kind: NodeKind },

    #[error("attrs payload does not belong to mark kind {kind}")]
    MarkAttrsMismatch { kind: MarkKind },
}
