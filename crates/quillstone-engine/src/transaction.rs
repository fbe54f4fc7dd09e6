//! The transaction builder: an ordered batch of steps applied eagerly to a
//! scratch document so later step positions stay valid, dispatched as one
//! atomic unit.
//!
//! Transactions are explicit values threaded through the command layer;
//! once handed to a dispatch function they are never mutated again.

use std::collections::BTreeMap;
use std::sync::Arc;

use quillstone_schema::{Mark, NodeAttrs, Schema};

use crate::doc::{apply_step, Assoc, Node, PositionMap, Step, StructuralError};
use crate::selection::Selection;
use crate::state::EditorState;

#[derive(Debug, Clone)]
pub struct Transaction {
    schema: Arc<Schema>,
    base_version: u64,
    base_doc: Node,
    doc: Node,
    steps: Vec<Step>,
    maps: Vec<PositionMap>,
    selection: Selection,
    selection_set: bool,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_set: bool,
    meta: BTreeMap<String, serde_json::Value>,
}

impl Transaction {
    pub(crate) fn begin(state: &EditorState) -> Transaction {
        Transaction {
            schema: state.schema_handle(),
            base_version: state.version(),
            base_doc: state.doc().clone(),
            doc: state.doc().clone(),
            steps: Vec::new(),
            maps: Vec::new(),
            selection: state.selection().clone(),
            selection_set: false,
            stored_marks: None,
            stored_marks_set: false,
            meta: BTreeMap::new(),
        }
    }

    /// The document after every step so far.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub(crate) fn stored_marks(&self) -> (bool, Option<&[Mark]>) {
        (self.stored_marks_set, self.stored_marks.as_deref())
    }

    /// Whether any step changed the tree (structural comparison, so a
    /// no-op edit is detected even after a step round-trip).
    pub fn docs_changed(&self) -> bool {
        self.doc != self.base_doc
    }

    /// Map a position from the base snapshot through every step so far.
    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        PositionMap::map_through(&self.maps, pos, assoc)
    }

    /// The per-step position maps, in application order. Hosts holding
    /// positions outside the selection remap through these.
    pub fn maps(&self) -> &[PositionMap] {
        &self.maps
    }

    /// Apply one step to the scratch document. On failure the transaction
    /// is returned unchanged inside the error's discarded branch: the
    /// builder is consumed, so no partially-applied value survives.
    pub fn step(mut self, step: Step) -> Result<Transaction, StructuralError> {
        if let Step::SetSelection { selection } = &step {
            self.selection = selection.clone();
            self.selection_set = true;
            self.steps.push(step);
            self.maps.push(PositionMap::identity());
            return Ok(self);
        }
        let (doc, map) = apply_step(&self.schema, &self.doc, &step)?;
        if !self.selection_set {
            self.selection = self.selection.map_through(std::slice::from_ref(&map));
        }
        self.doc = doc;
        self.steps.push(step);
        self.maps.push(map);
        Ok(self)
    }

    pub fn insert(self, pos: usize, content: Vec<Node>) -> Result<Transaction, StructuralError> {
        self.step(Step::Insert { pos, content })
    }

    pub fn insert_text(
        self,
        pos: usize,
        text: impl Into<String>,
    ) -> Result<Transaction, StructuralError> {
        self.step(Step::Insert {
            pos,
            content: vec![Node::text(text.into())],
        })
    }

    pub fn delete(self, from: usize, to: usize) -> Result<Transaction, StructuralError> {
        self.step(Step::Delete { from, to })
    }

    pub fn replace_range(
        self,
        from: usize,
        to: usize,
        content: Vec<Node>,
    ) -> Result<Transaction, StructuralError> {
        self.step(Step::ReplaceRange { from, to, content })
    }

    pub fn add_mark(
        self,
        from: usize,
        to: usize,
        mark: Mark,
    ) -> Result<Transaction, StructuralError> {
        self.step(Step::AddMark { from, to, mark })
    }

    pub fn remove_mark(
        self,
        from: usize,
        to: usize,
        mark: Mark,
    ) -> Result<Transaction, StructuralError> {
        self.step(Step::RemoveMark { from, to, mark })
    }

    pub fn set_node_attrs(
        self,
        pos: usize,
        attrs: NodeAttrs,
    ) -> Result<Transaction, StructuralError> {
        self.step(Step::SetNodeAttrs { pos, attrs })
    }

    pub fn set_selection(self, selection: Selection) -> Result<Transaction, StructuralError> {
        self.step(Step::SetSelection { selection })
    }

    /// Pin the marks the next typed input should carry; `None` clears
    /// them (stepping out of an inclusive mark).
    pub fn set_stored_marks(mut self, marks: Option<Vec<Mark>>) -> Transaction {
        self.stored_marks = marks;
        self.stored_marks_set = true;
        self
    }

    /// Attach a metadata tag (e.g. `"origin": "paste"`).
    pub fn set_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Transaction {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.meta.get(key)
    }

    pub(crate) fn meta_entries(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.meta
    }

    pub(crate) fn into_parts(self) -> TransactionParts {
        TransactionParts {
            base_version: self.base_version,
            doc: self.doc,
            selection: self.selection,
            stored_marks: self.stored_marks,
            stored_marks_set: self.stored_marks_set,
        }
    }
}

/// The pieces an [`EditorState`] needs when committing a transaction.
pub(crate) struct TransactionParts {
    pub base_version: u64,
    pub doc: Node,
    pub selection: Selection,
    pub stored_marks: Option<Vec<Mark>>,
    pub stored_marks_set: bool,
}
