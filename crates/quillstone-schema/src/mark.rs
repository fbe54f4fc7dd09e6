//! Mark values and mark-set operations.
//!
//! Marks are value types: two marks are equal iff their kind and attrs
//! match. Whether two same-kind marks may coexist in one set is governed by
//! the kind's `excludes` declaration in the [`Schema`](crate::Schema).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attrs::{CommentAttrs, HighlightAttrs, LinkAttrs, MarkAttrs};
use crate::kinds::MarkKind;
use crate::schema::{Excludes, Schema};
use crate::SchemaError;

/// A typed decoration attached to inline content or an atom node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub kind: MarkKind,
    pub attrs: MarkAttrs,
}

impl Mark {
    /// Build a mark, rejecting an attrs payload that belongs to a different
    /// kind.
    pub fn new(kind: MarkKind, attrs: MarkAttrs) -> Result<Self, SchemaError> {
        if !attrs.matches_kind(kind) {
            return Err(SchemaError::MarkAttrsMismatch { kind });
        }
        Ok(Self { kind, attrs })
    }

    pub fn link(href: impl Into<String>) -> Self {
        Self {
            kind: MarkKind::Link,
            attrs: MarkAttrs::Link(LinkAttrs::new(href)),
        }
    }

    pub fn highlight(color: impl Into<String>) -> Self {
        Self {
            kind: MarkKind::Highlight,
            attrs: MarkAttrs::Highlight(HighlightAttrs::new(color)),
        }
    }

    pub fn comment(id: Uuid) -> Self {
        Self {
            kind: MarkKind::Comment,
            attrs: MarkAttrs::Comment(CommentAttrs::new(id)),
        }
    }

    pub fn code_inline() -> Self {
        Self {
            kind: MarkKind::CodeInline,
            attrs: MarkAttrs::None,
        }
    }

    /// Whether an equal mark (kind *and* attrs) is present in `set`.
    ///
    /// This is the merge test of the mark-range resolver: adjacent runs
    /// belong to one logical mark instance only under exact equality, so two
    /// distinct comments never merge even when they touch.
    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.contains(self)
    }

    /// First mark of `kind` in `set`, regardless of attrs.
    pub fn kind_in_set(kind: MarkKind, set: &[Mark]) -> Option<&Mark> {
        set.iter().find(|m| m.kind == kind)
    }

    /// Add this mark to a set, honoring the kind's exclusion rule.
    ///
    /// `Excludes::SameKind` replaces any existing mark of the same kind;
    /// `Excludes::None` lets distinct same-kind marks coexist (overlapping
    /// comments). Adding an already-present mark is a no-op.
    pub fn add_to_set(&self, schema: &Schema, set: &[Mark]) -> Vec<Mark> {
        if self.is_in_set(set) {
            return set.to_vec();
        }
        let mut out: Vec<Mark> = match schema.mark_spec(self.kind).excludes {
            Excludes::SameKind => set.iter().filter(|m| m.kind != self.kind).cloned().collect(),
            Excludes::None => set.to_vec(),
        };
        out.push(self.clone());
        out
    }

    /// Remove every mark equal to this one from a set.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }
}
