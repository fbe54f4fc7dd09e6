use serde::{Deserialize, Serialize};

/// The closed set of node types the engine understands.
///
/// Invalid type names are unrepresentable: anything arriving from outside
/// (persisted documents, collaboration payloads) is rejected during
/// deserialization rather than at a comparison site deep inside a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Document root; the only kind with no parent.
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    BulletList,
    OrderedList,
    ListItem,
    Table,
    TableRow,
    TableCell,
    /// Inline text leaf; the only kind carrying a string payload.
    Text,
    Image,
    HorizontalRule,
}

impl NodeKind {
    pub const ALL: [NodeKind; 13] = [
        NodeKind::Doc,
        NodeKind::Paragraph,
        NodeKind::Heading,
        NodeKind::Blockquote,
        NodeKind::BulletList,
        NodeKind::OrderedList,
        NodeKind::ListItem,
        NodeKind::Table,
        NodeKind::TableRow,
        NodeKind::TableCell,
        NodeKind::Text,
        NodeKind::Image,
        NodeKind::HorizontalRule,
    ];

    /// Stable lowercase name, matching the serialized form.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::Blockquote => "blockquote",
            NodeKind::BulletList => "bullet_list",
            NodeKind::OrderedList => "ordered_list",
            NodeKind::ListItem => "list_item",
            NodeKind::Table => "table",
            NodeKind::TableRow => "table_row",
            NodeKind::TableCell => "table_cell",
            NodeKind::Text => "text",
            NodeKind::Image => "image",
            NodeKind::HorizontalRule => "horizontal_rule",
        }
    }

    /// Leaf kinds have no content sequence of their own.
    ///
    /// `Text` occupies as many positions as it has characters; other leaves
    /// occupy exactly one.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeKind::Text | NodeKind::Image | NodeKind::HorizontalRule
        )
    }

    pub fn is_inline(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::Image)
    }

    pub fn is_block(self) -> bool {
        !self.is_inline()
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The closed set of mark types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    Link,
    Highlight,
    Comment,
    CodeInline,
}

impl MarkKind {
    pub const ALL: [MarkKind; 4] = [
        MarkKind::Link,
        MarkKind::Highlight,
        MarkKind::Comment,
        MarkKind::CodeInline,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MarkKind::Link => "link",
            MarkKind::Highlight => "highlight",
            MarkKind::Comment => "comment",
            MarkKind::CodeInline => "code_inline",
        }
    }
}

impl std::fmt::Display for MarkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
