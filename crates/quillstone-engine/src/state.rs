//! Editor state: one immutable snapshot lineage point.
//!
//! A state owns a document snapshot, the current selection, and a version
//! counter identifying its place in the lineage. Applying a transaction
//! yields a *new* state; a transaction built against a superseded version
//! is rejected instead of silently corrupting positions.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use quillstone_schema::{Mark, NodeKind, Schema};

use crate::doc::{Node, Step, StructuralError};
use crate::selection::Selection;
use crate::transaction::Transaction;

/// Applying a transaction to a state failed.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The transaction was built against a different snapshot version.
    /// The caller must rebuild (or remap) against the current state.
    #[error("transaction built against version {built_against}, state is at {current}")]
    StaleTransaction { built_against: u64, current: u64 },

    /// A step in an externally-sourced transaction violated the schema;
    /// the whole transaction is rejected, nothing was applied.
    #[error(transparent)]
    Structural(#[from] StructuralError),
}

/// An immutable editing state: document, selection, and lineage version.
#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Node,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
    version: u64,
}

impl EditorState {
    /// Build a fresh state over a document, validating the tree deeply.
    pub fn new(schema: Arc<Schema>, doc: Node) -> Result<EditorState, StructuralError> {
        if doc.kind() != NodeKind::Doc {
            return Err(StructuralError::SchemaViolation(format!(
                "state root must be a doc node, got {}",
                doc.kind()
            )));
        }
        doc.validate_deep(&schema)?;
        Ok(EditorState {
            schema,
            doc,
            selection: Selection::cursor(0),
            stored_marks: None,
            version: 0,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn schema_handle(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Marks pinned for the next typed input, when a command stepped the
    /// cursor out of (or into) a mark without moving it.
    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Start building a transaction against this state.
    pub fn transaction(&self) -> Transaction {
        Transaction::begin(self)
    }

    /// Commit a transaction, producing the next state in the lineage.
    ///
    /// Two commands must never both dispatch against the same snapshot
    /// without the second remapping through the first's position maps;
    /// the version check turns that bug into an error instead of silent
    /// corruption.
    pub fn apply(&self, tx: Transaction) -> Result<EditorState, ApplyError> {
        if tx.base_version() != self.version {
            return Err(ApplyError::StaleTransaction {
                built_against: tx.base_version(),
                current: self.version,
            });
        }
        debug!(
            steps = tx.steps().len(),
            version = self.version + 1,
            meta = ?tx.meta_entries().keys().collect::<Vec<_>>(),
            "applying transaction"
        );
        let parts = tx.into_parts();
        Ok(EditorState {
            schema: Arc::clone(&self.schema),
            doc: parts.doc,
            selection: parts.selection,
            stored_marks: if parts.stored_marks_set {
                parts.stored_marks
            } else {
                None
            },
            version: self.version + 1,
        })
    }

    /// Apply a batch of externally-produced steps (collaboration layer)
    /// as one transaction. A structurally-invalid step rejects the whole
    /// batch; nothing is partially applied.
    pub fn apply_remote(&self, steps: Vec<Step>) -> Result<EditorState, ApplyError> {
        let mut tx = self.transaction();
        for step in steps {
            tx = tx.step(step)?;
        }
        self.apply(tx)
    }

    /// Adopt an externally-merged snapshot as the new baseline. The
    /// selection resets to the document start; the collaboration layer is
    /// responsible for restoring it through its own mapping.
    pub fn with_doc(&self, doc: Node) -> Result<EditorState, StructuralError> {
        if doc.kind() != NodeKind::Doc {
            return Err(StructuralError::SchemaViolation(format!(
                "state root must be a doc node, got {}",
                doc.kind()
            )));
        }
        doc.validate_deep(&self.schema)?;
        Ok(EditorState {
            schema: Arc::clone(&self.schema),
            doc,
            selection: Selection::cursor(0),
            stored_marks: None,
            version: self.version + 1,
        })
    }

    /// Move the selection without touching the document.
    pub fn with_selection(&self, selection: Selection) -> EditorState {
        EditorState {
            selection,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quillstone_schema::NodeAttrs;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::standard())
    }

    fn simple_state(text: &str) -> EditorState {
        let schema = schema();
        let para = Node::new(
            &schema,
            NodeKind::Paragraph,
            NodeAttrs::None,
            vec![Node::text(text)],
        )
        .unwrap();
        let doc = Node::new(&schema, NodeKind::Doc, NodeAttrs::None, vec![para]).unwrap();
        EditorState::new(schema, doc).unwrap()
    }

    #[test]
    fn applying_a_transaction_bumps_the_version() {
        let state = simple_state("hi");
        let tx = state.transaction().insert_text(3, "!").unwrap();
        let next = state.apply(tx).unwrap();
        assert_eq!(next.version(), 1);
        assert_eq!(
            next.doc().text_between(0, next.doc().content_size(), " "),
            "hi!"
        );
        // The original state is untouched.
        assert_eq!(state.version(), 0);
        assert_eq!(
            state.doc().text_between(0, state.doc().content_size(), " "),
            "hi"
        );
    }

    #[test]
    fn stale_transactions_are_rejected() {
        let state = simple_state("hi");
        let tx_a = state.transaction().insert_text(3, "!").unwrap();
        let tx_b = state.transaction().insert_text(3, "?").unwrap();

        let next = state.apply(tx_a).unwrap();
        let err = next.apply(tx_b).unwrap_err();
        assert!(matches!(
            err,
            ApplyError::StaleTransaction {
                built_against: 0,
                current: 1
            }
        ));
    }

    #[test]
    fn remote_steps_are_rejected_wholesale_on_violation() {
        let state = simple_state("hi");
        let steps = vec![
            Step::Insert {
                pos: 3,
                content: vec![Node::text("!")],
            },
            // Schema-invalid: a bare text node at doc level.
            Step::Insert {
                pos: 0,
                content: vec![Node::text("loose")],
            },
        ];
        let err = state.apply_remote(steps).unwrap_err();
        assert!(matches!(err, ApplyError::Structural(_)));
        // Nothing applied.
        assert_eq!(
            state.doc().text_between(0, state.doc().content_size(), " "),
            "hi"
        );
        assert_eq!(state.version(), 0);
    }

    #[test]
    fn adopting_an_external_snapshot_validates_it() {
        let state = simple_state("hi");
        let schema = state.schema_handle();

        let replacement = Node::new(
            &schema,
            NodeKind::Doc,
            NodeAttrs::None,
            vec![Node::new(
                &schema,
                NodeKind::Paragraph,
                NodeAttrs::None,
                vec![Node::text("merged")],
            )
            .unwrap()],
        )
        .unwrap();
        let next = state.with_doc(replacement).unwrap();
        assert_eq!(next.version(), 1);
        assert_eq!(next.selection(), &Selection::cursor(0));

        let not_a_doc = Node::new(
            &schema,
            NodeKind::Paragraph,
            NodeAttrs::None,
            vec![Node::text("loose")],
        )
        .unwrap();
        assert!(state.with_doc(not_a_doc).is_err());
    }
}
