/*!
 * # Document Tree Module
 *
 * The immutable node tree at the heart of the engine, plus the step
 * machinery that produces new trees from old ones.
 *
 * ## Architecture
 *
 * ### 1. Immutable Snapshots
 * - A [`Node`] is a cheaply-clonable handle over shared structure; no
 *   mutation ever happens in place.
 * - "Changing" a node always builds a new spine from the edited child up
 *   to the root, sharing every untouched subtree.
 * - Equality is deep structural equality, used by commands to detect
 *   no-op edits and skip emitting empty transactions.
 *
 * ### 2. Flattened Positions
 * - A [`Position`](crate::doc::position) is an integer offset addressing a
 *   boundary between content atoms: a text node occupies one position per
 *   character, a non-text leaf occupies one, and every other node occupies
 *   `2 + content size` (one token on each side).
 * - Positions are only meaningful against the snapshot they were resolved
 *   on; [`PositionMap`] carries them across a mutation.
 *
 * ### 3. Steps
 * - Every mutation is an atomic [`Step`]. Applying a step either yields a
 *   complete new tree plus a [`PositionMap`], or a [`StructuralError`]
 *   with the old tree untouched - there is no partial application.
 * - Steps re-validate the schema's child-type constraints at the splice
 *   point, so a malformed step from an untrusted source is rejected, not
 *   applied.
 */

pub mod map;
pub mod node;
pub mod position;
pub mod step;

pub use map::{Assoc, PositionMap};
pub use node::Node;
pub use position::ResolvedPos;
pub use step::{apply_step, Step};

use quillstone_schema::NodeKind;
use thiserror::Error;

/// A step failed against the tree's structural rules.
///
/// These indicate caller bugs or untrusted input (remote transactions);
/// they are surfaced as results, never as panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("{child} is not a valid child of {parent}")]
    InvalidChildType { parent: NodeKind, child: NodeKind },

    #[error("position {pos} is out of bounds (document size {size})")]
    OutOfBounds { pos: usize, size: usize },

    #[error("schema violation: {0}")]
    SchemaViolation(String),
}
