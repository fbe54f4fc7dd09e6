use std::sync::Arc;

use serde::{Deserialize, Serialize};

use quillstone_schema::{Mark, NodeAttrs, NodeKind, Schema};

use crate::doc::StructuralError;

/// Payload shared between handles to the same subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    #[serde(default)]
    pub(crate) attrs: NodeAttrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) marks: Vec<Mark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) content: Vec<Node>,
}

/// A typed element of the document tree.
///
/// Nodes are immutable and structurally shared: cloning is an `Arc` bump,
/// and every edit builds a new spine while reusing untouched subtrees.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Node {
    data: Arc<NodeData>,
}

impl Node {
    /// Build a non-leaf node, validating attrs and child kinds against the
    /// schema. Content arity (`min_children`) is enforced here too, so a
    /// `table` with no rows is unrepresentable rather than merely invalid.
    pub fn new(
        schema: &Schema,
        kind: NodeKind,
        attrs: NodeAttrs,
        content: Vec<Node>,
    ) -> Result<Node, StructuralError> {
        if kind == NodeKind::Text {
            return Err(StructuralError::SchemaViolation(
                "text nodes are built with Node::text".into(),
            ));
        }
        if !attrs.matches_kind(kind) {
            return Err(StructuralError::SchemaViolation(format!(
                "attrs payload does not belong to {kind}"
            )));
        }
        for child in &content {
            if !schema.valid_child(kind, child.kind()) {
                return Err(StructuralError::InvalidChildType {
                    parent: kind,
                    child: child.kind(),
                });
            }
        }
        if content.len() < schema.min_children(kind) {
            return Err(StructuralError::SchemaViolation(format!(
                "{kind} requires at least {} child(ren)",
                schema.min_children(kind)
            )));
        }
        Ok(Node::from_parts(kind, attrs, Vec::new(), None, content))
    }

    /// Build a leaf node (image, horizontal rule).
    pub fn leaf(
        schema: &Schema,
        kind: NodeKind,
        attrs: NodeAttrs,
    ) -> Result<Node, StructuralError> {
        Node::new(schema, kind, attrs, Vec::new())
    }

    /// Build a text node with no marks.
    pub fn text(text: impl Into<String>) -> Node {
        Node::text_marked(text, Vec::new())
    }

    /// Build a text node carrying the given marks.
    pub fn text_marked(text: impl Into<String>, marks: Vec<Mark>) -> Node {
        Node::from_parts(NodeKind::Text, NodeAttrs::None, marks, Some(text.into()), Vec::new())
    }

    pub(crate) fn from_parts(
        kind: NodeKind,
        attrs: NodeAttrs,
        marks: Vec<Mark>,
        text: Option<String>,
        content: Vec<Node>,
    ) -> Node {
        Node {
            data: Arc::new(NodeData {
                kind,
                attrs,
                marks,
                text,
                content,
            }),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind
    }

    pub fn attrs(&self) -> &NodeAttrs {
        &self.data.attrs
    }

    pub fn marks(&self) -> &[Mark] {
        &self.data.marks
    }

    /// Text payload; `Some` exactly for `Text` nodes.
    pub fn text_str(&self) -> Option<&str> {
        self.data.text.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.data.kind == NodeKind::Text
    }

    pub fn content(&self) -> &[Node] {
        &self.data.content
    }

    pub fn child_count(&self) -> usize {
        self.data.content.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.data.content.get(index)
    }

    /// Number of positions this node spans in the flattened document:
    /// one per character for text, one for a non-text leaf, and
    /// `2 + content size` otherwise.
    pub fn node_size(&self) -> usize {
        if let Some(text) = &self.data.text {
            return text.chars().count();
        }
        if self.data.kind.is_leaf() {
            return 1;
        }
        2 + self.content_size()
    }

    /// Total size of this node's content sequence.
    pub fn content_size(&self) -> usize {
        self.data.content.iter().map(Node::node_size).sum()
    }

    /// Locate the child touched by `offset` (relative to this node's
    /// content start). Returns `(index, child_start)`; `offset ==
    /// child_start` means the position sits on the boundary before that
    /// index, and `index == child_count` addresses the end boundary.
    pub(crate) fn index_at_offset(&self, offset: usize) -> (usize, usize) {
        let mut acc = 0;
        for (i, child) in self.data.content.iter().enumerate() {
            let end = acc + child.node_size();
            if offset < end || offset == acc {
                return (i, acc);
            }
            acc = end;
        }
        (self.data.content.len(), acc)
    }

    /// Rebuild this node with a different attrs payload.
    pub(crate) fn with_attrs(&self, attrs: NodeAttrs) -> Node {
        let mut data = (*self.data).clone();
        data.attrs = attrs;
        Node {
            data: Arc::new(data),
        }
    }

    /// Rebuild this node with a different mark set.
    pub(crate) fn with_marks(&self, marks: Vec<Mark>) -> Node {
        let mut data = (*self.data).clone();
        data.marks = marks;
        Node {
            data: Arc::new(data),
        }
    }

    /// Rebuild this node with different children, normalizing adjacent
    /// text runs that carry identical mark sets into one node. The
    /// normalization keeps repeated mark toggles structurally idempotent.
    pub(crate) fn with_content(&self, content: Vec<Node>) -> Node {
        let mut data = (*self.data).clone();
        data.content = merge_adjacent_text(content);
        Node {
            data: Arc::new(data),
        }
    }

    /// Rebuild with child `index` swapped out.
    pub(crate) fn replace_child(&self, index: usize, child: Node) -> Node {
        let mut content = self.data.content.clone();
        content[index] = child;
        self.with_content(content)
    }

    /// Visit every descendant with its position. The callback's return
    /// value decides whether the walk descends into that node's content.
    /// Positions follow the flattened scheme: the root's children start at
    /// position 0, and a child's content starts one past its own boundary.
    pub fn descendants(&self, f: &mut dyn FnMut(&Node, usize) -> bool) {
        self.walk_children(0, f);
    }

    fn walk_children(&self, content_start: usize, f: &mut dyn FnMut(&Node, usize) -> bool) {
        let mut pos = content_start;
        for child in &self.data.content {
            let descend = f(child, pos);
            if descend && !child.kind().is_leaf() {
                child.walk_children(pos + 1, f);
            }
            pos += child.node_size();
        }
    }

    /// Flat text of the content between two offsets relative to this
    /// node's content start. `block_separator` joins textblocks.
    pub fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        let mut out = String::new();
        let mut needs_separator = false;
        self.collect_text(from, to, block_separator, &mut out, &mut needs_separator);
        out
    }

    fn collect_text(
        &self,
        from: usize,
        to: usize,
        separator: &str,
        out: &mut String,
        needs_separator: &mut bool,
    ) {
        let mut acc = 0;
        for child in &self.data.content {
            let end = acc + child.node_size();
            if end > from && acc < to {
                if let Some(text) = child.text_str() {
                    let start_char = from.saturating_sub(acc);
                    let end_char = to.min(end) - acc;
                    if *needs_separator {
                        out.push_str(separator);
                        *needs_separator = false;
                    }
                    out.extend(text.chars().skip(start_char).take(end_char - start_char));
                } else if !child.kind().is_leaf() {
                    let inner_from = from.saturating_sub(acc + 1);
                    let inner_to = (to - acc).saturating_sub(1).min(child.content_size());
                    child.collect_text(inner_from, inner_to, separator, out, needs_separator);
                    if child.kind().is_block() && !out.is_empty() {
                        *needs_separator = true;
                    }
                }
            }
            acc = end;
        }
    }

    /// Recursively check the whole subtree against the schema.
    ///
    /// Used when an externally-produced snapshot (collaboration layer)
    /// becomes the new baseline: a malformed tree is rejected up front
    /// instead of corrupting later position arithmetic.
    pub fn validate_deep(&self, schema: &Schema) -> Result<(), StructuralError> {
        if !self.attrs().matches_kind(self.kind()) {
            return Err(StructuralError::SchemaViolation(format!(
                "attrs payload does not belong to {}",
                self.kind()
            )));
        }
        if self.is_text() && self.text_str().is_none_or(str::is_empty) {
            return Err(StructuralError::SchemaViolation(
                "empty text nodes are not allowed".into(),
            ));
        }
        if !self.marks().is_empty() && !schema.node_spec(self.kind()).allows_marks {
            return Err(StructuralError::SchemaViolation(format!(
                "{} does not allow marks",
                self.kind()
            )));
        }
        for child in self.content() {
            if !schema.valid_child(self.kind(), child.kind()) {
                return Err(StructuralError::InvalidChildType {
                    parent: self.kind(),
                    child: child.kind(),
                });
            }
            child.validate_deep(schema)?;
        }
        if self.child_count() < schema.min_children(self.kind()) {
            return Err(StructuralError::SchemaViolation(format!(
                "{} requires at least {} child(ren)",
                self.kind(),
                schema.min_children(self.kind())
            )));
        }
        Ok(())
    }

    /// Serialize to the persisted JSON shape.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Decode a tree from its persisted JSON shape and check it against
    /// the schema.
    pub fn from_json(schema: &Schema, value: serde_json::Value) -> anyhow::Result<Node> {
        use anyhow::Context;
        let node: Node = serde_json::from_value(value).context("malformed document json")?;
        node.validate_deep(schema)
            .context("document violates schema")?;
        Ok(node)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data) || *self.data == *other.data
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(text) = self.text_str() {
            write!(f, "text({text:?}")?;
            for mark in self.marks() {
                write!(f, " +{}", mark.kind)?;
            }
            write!(f, ")")
        } else {
            write!(f, "{}(", self.kind())?;
            for (i, child) in self.content().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{child:?}")?;
            }
            write!(f, ")")
        }
    }
}

/// Join adjacent text nodes whose mark sets are exactly equal.
///
/// Splitting happens whenever a mark step cuts through a text node; the
/// inverse merge here restores the canonical form, so a toggle-on
/// followed by a toggle-off reproduces the original tree byte for byte.
pub(crate) fn merge_adjacent_text(children: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for child in children {
        if child.is_text() {
            if let Some(prev) = out.pop() {
                if prev.is_text() && prev.marks() == child.marks() {
                    let combined = format!(
                        "{}{}",
                        prev.text_str().unwrap_or_default(),
                        child.text_str().unwrap_or_default()
                    );
                    out.push(Node::text_marked(combined, prev.marks().to_vec()));
                    continue;
                }
                out.push(prev);
            }
        }
        out.push(child);
    }
    out
}
