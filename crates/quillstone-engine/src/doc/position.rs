//! Position resolution: turning a flat integer offset into a typed path
//! through the tree.
//!
//! A resolved position owns snapshots of its ancestor chain (cheap `Arc`
//! clones), so it stays self-contained: commands pattern-match on typed
//! ancestors instead of parsing any rendered form of the path.

use quillstone_schema::NodeKind;

use crate::doc::{Node, StructuralError};

/// One level of the ancestor chain.
#[derive(Debug, Clone)]
struct PathEntry {
    /// The ancestor node at this depth (depth 0 is the document root).
    node: Node,
    /// Index of the child the position descends into (or sits before).
    index: usize,
    /// Absolute position of this ancestor's content start.
    start: usize,
}

/// A position resolved against a specific document snapshot.
#[derive(Debug, Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathEntry>,
    /// Offset of `pos` within the deepest ancestor's content.
    parent_offset: usize,
    /// Character offset into the text node under the position; 0 when the
    /// position sits on a node boundary.
    text_offset: usize,
}

impl ResolvedPos {
    /// Resolve `pos` against `doc`. Fails with
    /// [`StructuralError::OutOfBounds`] when the offset exceeds the
    /// document's content size.
    pub fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos, StructuralError> {
        let size = doc.content_size();
        if pos > size {
            return Err(StructuralError::OutOfBounds { pos, size });
        }

        let mut path = Vec::new();
        let mut node = doc.clone();
        let mut start = 0;
        let mut offset = pos;

        loop {
            let (index, child_start) = node.index_at_offset(offset);
            path.push(PathEntry {
                node: node.clone(),
                index,
                start,
            });
            let rem = offset - child_start;
            if rem == 0 {
                return Ok(ResolvedPos {
                    pos,
                    path,
                    parent_offset: offset,
                    text_offset: 0,
                });
            }
            let child = node
                .child(index)
                .cloned()
                .ok_or(StructuralError::OutOfBounds { pos, size })?;
            if child.is_text() {
                return Ok(ResolvedPos {
                    pos,
                    path,
                    parent_offset: offset,
                    text_offset: rem,
                });
            }
            if child.kind().is_leaf() {
                // rem inside a size-1 leaf cannot happen: boundaries on
                // both sides are the only addressable offsets.
                return Err(StructuralError::OutOfBounds { pos, size });
            }
            start = start + child_start + 1;
            node = child;
            offset = rem - 1;
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Depth of the deepest ancestor; the root is depth 0.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// Ancestor node at `depth`.
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    /// Child index the position descends into at `depth`.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Absolute position of the content start of the ancestor at `depth`.
    pub fn start(&self, depth: usize) -> usize {
        self.path[depth].start
    }

    /// Absolute position of the content end of the ancestor at `depth`.
    pub fn end(&self, depth: usize) -> usize {
        self.path[depth].start + self.path[depth].node.content_size()
    }

    /// Absolute position immediately before the ancestor at `depth`.
    /// Depth 0 (the root) has no before/after.
    pub fn before(&self, depth: usize) -> Option<usize> {
        (depth > 0).then(|| self.path[depth].start - 1)
    }

    /// Absolute position immediately after the ancestor at `depth`.
    pub fn after(&self, depth: usize) -> Option<usize> {
        (depth > 0).then(|| self.end(depth) + 1)
    }

    /// The deepest ancestor (the node whose content holds the position).
    pub fn parent(&self) -> &Node {
        &self.path[self.path.len() - 1].node
    }

    /// Offset of the position within the parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Index within the parent the position sits at or inside.
    pub fn parent_index(&self) -> usize {
        self.path[self.path.len() - 1].index
    }

    /// Character offset into the text node under the position; 0 at node
    /// boundaries.
    pub fn text_offset(&self) -> usize {
        self.text_offset
    }

    /// The node immediately after the position, if any. Inside a text node
    /// this is the text node itself.
    pub fn node_after(&self) -> Option<&Node> {
        self.parent().child(self.parent_index())
    }

    /// The node immediately before the position, if any.
    pub fn node_before(&self) -> Option<&Node> {
        if self.text_offset > 0 {
            return self.node_after();
        }
        let index = self.parent_index();
        if index == 0 {
            return None;
        }
        self.parent().child(index - 1)
    }

    /// Deepest ancestor of the given kind, as a depth into the path.
    ///
    /// This is the typed ancestor walk used for table row/column index
    /// recovery.
    pub fn find_ancestor(&self, kind: NodeKind) -> Option<usize> {
        (0..self.path.len()).rev().find(|&d| self.path[d].node.kind() == kind)
    }

    /// Depth of the deepest ancestor shared with `other` (resolved against
    /// the same snapshot).
    pub fn shared_depth(&self, other: &ResolvedPos) -> usize {
        let mut depth = 0;
        let max = self.depth().min(other.depth());
        for d in 1..=max {
            if self.path[d].start == other.path[d].start
                && self.path[d].node == other.path[d].node
            {
                depth = d;
            } else {
                break;
            }
        }
        depth
    }
}
