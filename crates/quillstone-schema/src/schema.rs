//! Schema metadata: what each node kind may contain and how each mark kind
//! behaves.
//!
//! The engine is schema-driven: structural validation, mark exclusion, and
//! atom detection all read this table instead of hard-coding kind names at
//! call sites.

use crate::kinds::{MarkKind, NodeKind};

/// Content rule for a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRule {
    /// Leaf: no content sequence at all.
    None,
    /// Zero or more inline nodes (text, image).
    Inline,
    /// One or more block nodes.
    Blocks { min: usize },
    /// One or more children of exactly one kind (a table holds only
    /// table rows).
    Only { kind: NodeKind, min: usize },
}

impl ContentRule {
    /// Whether `child` is an acceptable member of this content sequence.
    pub fn admits(&self, child: NodeKind) -> bool {
        match self {
            ContentRule::None => false,
            ContentRule::Inline => child.is_inline(),
            ContentRule::Blocks { .. } => child.is_block() && child != NodeKind::Doc,
            ContentRule::Only { kind, .. } => child == *kind,
        }
    }

    /// Minimum number of children a valid node must hold.
    pub fn min_children(&self) -> usize {
        match self {
            ContentRule::None | ContentRule::Inline => 0,
            ContentRule::Blocks { min } | ContentRule::Only { min, .. } => *min,
        }
    }
}

/// Per-node-kind schema metadata.
#[derive(Debug, Clone, Copy)]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub content: ContentRule,
    /// Atoms are selectable as a whole (Node Selection) and have no
    /// addressable interior of their own.
    pub atom: bool,
    /// Whether marks may sit directly on this node (text runs, and
    /// block-level decoration such as per-row highlight).
    pub allows_marks: bool,
}

/// What a mark kind pushes out of a mark set when added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Excludes {
    /// Replaces any same-kind mark (link, highlight, inline code).
    SameKind,
    /// Coexists with same-kind marks carrying different attrs (comments).
    None,
}

/// Per-mark-kind schema metadata.
#[derive(Debug, Clone, Copy)]
pub struct MarkSpec {
    pub kind: MarkKind,
    /// Whether input adjacent to the mark's edge extends the mark.
    pub inclusive: bool,
    pub excludes: Excludes,
}

/// The closed vocabulary the engine operates over.
///
/// Hosts obtain one via [`Schema::standard`] and hand it to the engine;
/// the engine never constructs one itself.
#[derive(Debug, Clone)]
pub struct Schema {
    node_specs: Vec<NodeSpec>,
    mark_specs: Vec<MarkSpec>,
}

impl Schema {
    /// The standard document vocabulary.
    pub fn standard() -> Self {
        let node_specs = NodeKind::ALL
            .iter()
            .map(|&kind| NodeSpec {
                kind,
                content: match kind {
                    NodeKind::Doc => ContentRule::Blocks { min: 1 },
                    NodeKind::Paragraph | NodeKind::Heading => ContentRule::Inline,
                    NodeKind::Blockquote | NodeKind::ListItem | NodeKind::TableCell => {
                        ContentRule::Blocks { min: 1 }
                    }
                    NodeKind::BulletList | NodeKind::OrderedList => ContentRule::Only {
                        kind: NodeKind::ListItem,
                        min: 1,
                    },
                    NodeKind::Table => ContentRule::Only {
                        kind: NodeKind::TableRow,
                        min: 1,
                    },
                    NodeKind::TableRow => ContentRule::Only {
                        kind: NodeKind::TableCell,
                        min: 1,
                    },
                    NodeKind::Text | NodeKind::Image | NodeKind::HorizontalRule => {
                        ContentRule::None
                    }
                },
                atom: matches!(
                    kind,
                    NodeKind::Image | NodeKind::HorizontalRule | NodeKind::Table
                ),
                allows_marks: matches!(kind, NodeKind::Text | NodeKind::TableRow),
            })
            .collect();

        let mark_specs = MarkKind::ALL
            .iter()
            .map(|&kind| MarkSpec {
                kind,
                inclusive: match kind {
                    // Typing at the edge of a link or comment should not
                    // silently grow it; code and highlight do extend.
                    MarkKind::Link | MarkKind::Comment => false,
                    MarkKind::Highlight | MarkKind::CodeInline => true,
                },
                excludes: match kind {
                    MarkKind::Comment => Excludes::None,
                    _ => Excludes::SameKind,
                },
            })
            .collect();

        Self {
            node_specs,
            mark_specs,
        }
    }

    /// Specs are laid out in `NodeKind::ALL` order, so the discriminant
    /// doubles as the index.
    pub fn node_spec(&self, kind: NodeKind) -> &NodeSpec {
        &self.node_specs[kind as usize]
    }

    pub fn mark_spec(&self, kind: MarkKind) -> &MarkSpec {
        &self.mark_specs[kind as usize]
    }

    pub fn is_atom(&self, kind: NodeKind) -> bool {
        self.node_spec(kind).atom
    }

    pub fn valid_child(&self, parent: NodeKind, child: NodeKind) -> bool {
        self.node_spec(parent).content.admits(child)
    }

    pub fn min_children(&self, parent: NodeKind) -> usize {
        self.node_spec(parent).content.min_children()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::standard()
    }
}
