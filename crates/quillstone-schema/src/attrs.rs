//! Typed attribute payloads for nodes and marks.
//!
//! Attributes are per-kind structs gathered into one tagged enum, so a
//! mismatched payload (`Heading` attrs on a `Table` node) is a construction
//! error, not a latent runtime surprise.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::kinds::{MarkKind, NodeKind};
use crate::mark::Mark;

/// Heading depth, 1..=6.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingAttrs {
    pub level: u8,
}

impl Default for HeadingAttrs {
    fn default() -> Self {
        Self { level: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedListAttrs {
    /// Number the first item renders with.
    pub start: u64,
}

impl Default for OrderedListAttrs {
    fn default() -> Self {
        Self { start: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableAttrs {
    /// Whether the table's first row is a header row.
    pub header_row: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRowAttrs {
    /// Header-ness is carried by the row itself so structural edits above it
    /// cannot silently demote it.
    pub header: bool,
}

/// Horizontal alignment of a cell's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCellAttrs {
    /// Rows this cell covers (merged cells), at least 1.
    pub rowspan: u32,
    /// Columns this cell covers, at least 1.
    pub colspan: u32,
    pub align: Option<CellAlign>,
}

impl Default for TableCellAttrs {
    fn default() -> Self {
        Self {
            rowspan: 1,
            colspan: 1,
            align: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageAttrs {
    pub src: String,
    pub alt: Option<String>,
    /// Atom nodes have no addressable interior, so their marks live here
    /// instead of on tree-position runs.
    pub marks: Vec<Mark>,
}

/// Attribute payload of a node, tagged by the kind it belongs to.
///
/// Kinds without attributes use [`NodeAttrs::None`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeAttrs {
    None,
    Heading(HeadingAttrs),
    OrderedList(OrderedListAttrs),
    Table(TableAttrs),
    TableRow(TableRowAttrs),
    TableCell(TableCellAttrs),
    Image(ImageAttrs),
}

impl Default for NodeAttrs {
    fn default() -> Self {
        NodeAttrs::None
    }
}

impl NodeAttrs {
    /// The schema-defined default payload for a kind.
    pub fn default_for(kind: NodeKind) -> NodeAttrs {
        match kind {
            NodeKind::Heading => NodeAttrs::Heading(HeadingAttrs::default()),
            NodeKind::OrderedList => NodeAttrs::OrderedList(OrderedListAttrs::default()),
            NodeKind::Table => NodeAttrs::Table(TableAttrs::default()),
            NodeKind::TableRow => NodeAttrs::TableRow(TableRowAttrs::default()),
            NodeKind::TableCell => NodeAttrs::TableCell(TableCellAttrs::default()),
            NodeKind::Image => NodeAttrs::Image(ImageAttrs::default()),
            _ => NodeAttrs::None,
        }
    }

    /// Whether this payload variant is the one `kind` declares.
    pub fn matches_kind(&self, kind: NodeKind) -> bool {
        match self {
            NodeAttrs::None => !matches!(
                kind,
                NodeKind::Heading
                    | NodeKind::OrderedList
                    | NodeKind::Table
                    | NodeKind::TableRow
                    | NodeKind::TableCell
                    | NodeKind::Image
            ),
            NodeAttrs::Heading(_) => kind == NodeKind::Heading,
            NodeAttrs::OrderedList(_) => kind == NodeKind::OrderedList,
            NodeAttrs::Table(_) => kind == NodeKind::Table,
            NodeAttrs::TableRow(_) => kind == NodeKind::TableRow,
            NodeAttrs::TableCell(_) => kind == NodeKind::TableCell,
            NodeAttrs::Image(_) => kind == NodeKind::Image,
        }
    }

    pub fn heading(&self) -> Option<&HeadingAttrs> {
        match self {
            NodeAttrs::Heading(a) => Some(a),
            _ => None,
        }
    }

    pub fn ordered_list(&self) -> Option<&OrderedListAttrs> {
        match self {
            NodeAttrs::OrderedList(a) => Some(a),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&TableAttrs> {
        match self {
            NodeAttrs::Table(a) => Some(a),
            _ => None,
        }
    }

    pub fn table_row(&self) -> Option<&TableRowAttrs> {
        match self {
            NodeAttrs::TableRow(a) => Some(a),
            _ => None,
        }
    }

    pub fn table_cell(&self) -> Option<&TableCellAttrs> {
        match self {
            NodeAttrs::TableCell(a) => Some(a),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&ImageAttrs> {
        match self {
            NodeAttrs::Image(a) => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttrs {
    pub href: String,
    pub title: Option<String>,
}

impl LinkAttrs {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            title: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightAttrs {
    /// CSS color keyword or hex value.
    pub color: String,
}

impl HighlightAttrs {
    pub fn new(color: impl Into<String>) -> Self {
        Self {
            color: color.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAttrs {
    /// Identity of the comment thread. Two comment marks are the same
    /// logical comment iff their ids match.
    pub id: Uuid,
    pub resolved: bool,
}

impl CommentAttrs {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            resolved: false,
        }
    }
}

/// Attribute payload of a mark, tagged by the kind it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkAttrs {
    None,
    Link(LinkAttrs),
    Highlight(HighlightAttrs),
    Comment(CommentAttrs),
}

impl MarkAttrs {
    pub fn matches_kind(&self, kind: MarkKind) -> bool {
        match self {
            MarkAttrs::None => kind == MarkKind::CodeInline,
            MarkAttrs::Link(_) => kind == MarkKind::Link,
            MarkAttrs::Highlight(_) => kind == MarkKind::Highlight,
            MarkAttrs::Comment(_) => kind == MarkKind::Comment,
        }
    }

    pub fn link(&self) -> Option<&LinkAttrs> {
        match self {
            MarkAttrs::Link(a) => Some(a),
            _ => None,
        }
    }

    pub fn highlight(&self) -> Option<&HighlightAttrs> {
        match self {
            MarkAttrs::Highlight(a) => Some(a),
            _ => None,
        }
    }

    pub fn comment(&self) -> Option<&CommentAttrs> {
        match self {
            MarkAttrs::Comment(a) => Some(a),
            _ => None,
        }
    }
}
