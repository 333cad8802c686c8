//! Atomic application of a change set inside one scoped edit transaction.
//!
//! ```text
//! Idle ──open──► TransactionOpen ──complete──► Applied
//!                      │
//!                      └──drop / apply error──► RolledBack
//! ```

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::contract::{ScopedTransaction, TextView};
use crate::document::Document;
use crate::error::{ApplyError, PipelineError};
use crate::scheduler::UiContext;
use crate::text::{validate_changes, TextChange, TextSpan};

/// Undo label for edits made by the format-document command.
pub const FORMATTING_TRANSACTION_LABEL: &str = "Formatting";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Idle,
    TransactionOpen,
    Applied { edits: usize },
    RolledBack,
}

/// Owns a [`ScopedTransaction`] and rolls it back unless [`Transaction::complete`] runs.
pub struct Transaction {
    label: String,
    inner: Box<dyn ScopedTransaction>,
    applied: usize,
    completed: bool,
}

impl Transaction {
    pub fn open(_ui: &UiContext, view: &dyn TextView, label: &str) -> Self {
        debug!(
            label,
            state = ?TransactionState::TransactionOpen,
            "[TXN] Opening edit transaction"
        );
        Self {
            label: label.to_string(),
            inner: view.begin_edit_transaction(label),
            applied: 0,
            completed: false,
        }
    }

    pub fn apply(
        &mut self,
        snapshot: &Document,
        changes: &[TextChange],
    ) -> Result<(), ApplyError> {
        self.inner.apply(snapshot, changes)?;
        self.applied += changes.len();
        Ok(())
    }

    /// Commits everything applied so far as one undo unit and returns the edit count.
    pub fn complete(mut self) -> usize {
        self.inner.complete();
        self.completed = true;
        let state = TransactionState::Applied {
            edits: self.applied,
        };
        info!(label = %self.label, ?state, "[TXN] Transaction completed");
        self.applied
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.completed {
            warn!(
                label = %self.label,
                state = ?TransactionState::RolledBack,
                "[TXN] Transaction dropped without completion, rolling back"
            );
            self.inner.rollback();
        }
    }
}

/// Applies change sets all-or-nothing, preserving caret and undo history.
#[derive(Debug, Clone)]
pub struct TransactionCoordinator {
    label: String,
}

impl Default for TransactionCoordinator {
    fn default() -> Self {
        Self::new(FORMATTING_TRANSACTION_LABEL)
    }
}

impl TransactionCoordinator {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Applies `changes` to `view` as a single undo unit and returns the number of
    /// edits applied.
    ///
    /// Cancellation is honoured only before the transaction opens. An empty set
    /// still completes an (empty) transaction. With a `selection`, only changes
    /// inside it are applied. Any apply failure rolls the transaction back and is
    /// returned as [`PipelineError::Apply`].
    pub fn apply_atomically(
        &self,
        ui: &UiContext,
        view: &dyn TextView,
        document: &Document,
        changes: &[TextChange],
        selection: Option<TextSpan>,
        token: &CancellationToken,
    ) -> Result<usize, PipelineError> {
        if token.is_cancelled() {
            debug!(
                document = %document.id,
                state = ?TransactionState::Idle,
                "[TXN] Cancelled before opening transaction"
            );
            return Err(PipelineError::Cancelled);
        }

        let filtered: Vec<TextChange>;
        let changes = match selection {
            Some(span) => {
                filtered = changes
                    .iter()
                    .filter(|c| span.contains_span(&c.span))
                    .cloned()
                    .collect();
                filtered.as_slice()
            }
            None => changes,
        };

        let mut transaction = Transaction::open(ui, view, &self.label);
        if !changes.is_empty() {
            let applied = validate_changes(document.text(), changes)
                .map_err(ApplyError::from)
                .and_then(|()| transaction.apply(document, changes));
            if let Err(e) = applied {
                warn!(document = %document.id, error = %e, "[TXN] Edit rejected, rolling back");
                drop(transaction);
                return Err(PipelineError::Apply(e));
            }
        }
        Ok(transaction.complete())
    }
}
