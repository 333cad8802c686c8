//! In-memory [`TextView`] with a version counter, a caret and an undo stack.
//!
//! Used by the CLI to edit files and by tests as a real editor stand-in.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::contract::{ScopedTransaction, TextView};
use crate::document::{Document, DocumentId, LanguageId};
use crate::error::ApplyError;
use crate::text::{apply_changes, map_offset, TextChange};

/// One committed transaction: what to restore on undo.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UndoEntry {
    label: String,
    text: String,
    caret: usize,
}

#[derive(Debug)]
struct MemoryState {
    id: DocumentId,
    project: String,
    language: LanguageId,
    text: String,
    version: u64,
    caret: usize,
    undo: Vec<UndoEntry>,
    open_transactions: usize,
}

#[derive(Debug, Clone)]
pub struct MemoryView {
    state: Arc<Mutex<MemoryState>>,
    editable: bool,
}

impl MemoryView {
    pub fn new(
        project: impl Into<String>,
        language: impl Into<LanguageId>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                id: DocumentId::new(),
                project: project.into(),
                language: language.into(),
                text: text.into(),
                version: 1,
                caret: 0,
                undo: Vec::new(),
                open_transactions: 0,
            })),
            editable: true,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    pub fn id(&self) -> DocumentId {
        self.state.lock().id
    }

    pub fn text(&self) -> String {
        self.state.lock().text.clone()
    }

    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    pub fn caret(&self) -> usize {
        self.state.lock().caret
    }

    pub fn set_caret(&self, offset: usize) {
        let mut state = self.state.lock();
        state.caret = offset.min(state.text.len());
    }

    pub fn undo_depth(&self) -> usize {
        self.state.lock().undo.len()
    }

    pub fn has_open_transaction(&self) -> bool {
        self.state.lock().open_transactions > 0
    }

    /// Replaces the text as a user edit would, producing a new version.
    pub fn replace_text(&self, text: impl Into<String>) {
        let mut state = self.state.lock();
        state.text = text.into();
        state.version += 1;
        state.caret = state.caret.min(state.text.len());
    }

    /// Reverts the most recent committed transaction.
    pub fn undo(&self) -> bool {
        let mut state = self.state.lock();
        match state.undo.pop() {
            Some(entry) => {
                debug!(label = %entry.label, "[MEMORY] Undo");
                state.text = entry.text;
                state.caret = entry.caret;
                state.version += 1;
                true
            }
            None => false,
        }
    }
}

impl TextView for MemoryView {
    fn supports_document_edits(&self) -> bool {
        self.editable
    }

    fn current_document(&self) -> Option<Document> {
        let state = self.state.lock();
        Some(Document::new(
            state.id,
            state.project.clone(),
            state.language.clone(),
            state.text.as_str(),
            state.version,
        ))
    }

    fn begin_edit_transaction(&self, label: &str) -> Box<dyn ScopedTransaction> {
        let mut state = self.state.lock();
        if state.open_transactions > 0 {
            warn!(label, "[MEMORY] Nested edit transaction opened");
        }
        state.open_transactions += 1;
        Box::new(MemoryTransaction {
            state: self.state.clone(),
            label: label.to_string(),
            before: (state.text.clone(), state.version, state.caret),
            dirty: false,
            finished: false,
        })
    }
}

struct MemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    label: String,
    /// Text, version and caret captured when the transaction opened.
    before: (String, u64, usize),
    dirty: bool,
    finished: bool,
}

impl MemoryTransaction {
    fn finish(&mut self, state: &mut MemoryState) {
        self.finished = true;
        state.open_transactions = state.open_transactions.saturating_sub(1);
    }
}

impl ScopedTransaction for MemoryTransaction {
    fn apply(&mut self, snapshot: &Document, changes: &[TextChange]) -> Result<(), ApplyError> {
        if self.finished {
            return Err(ApplyError::Rejected("transaction already finished".to_string()));
        }
        let mut state = self.state.lock();
        if snapshot.id != state.id {
            return Err(ApplyError::Rejected(format!(
                "snapshot belongs to document {}",
                snapshot.id
            )));
        }
        if snapshot.version != state.version {
            return Err(ApplyError::StaleSnapshot {
                expected: snapshot.version,
                found: state.version,
            });
        }
        let text = apply_changes(&state.text, changes)?;
        state.caret = map_offset(state.caret, changes);
        state.text = text;
        state.version += 1;
        self.dirty = true;
        Ok(())
    }

    fn complete(&mut self) {
        if self.finished {
            return;
        }
        let state = self.state.clone();
        let mut state = state.lock();
        if self.dirty {
            let (text, _, caret) = std::mem::take(&mut self.before);
            state.undo.push(UndoEntry {
                label: self.label.clone(),
                text,
                caret,
            });
        }
        self.finish(&mut state);
    }

    fn rollback(&mut self) {
        if self.finished {
            return;
        }
        let state = self.state.clone();
        let mut state = state.lock();
        if self.dirty {
            let (text, version, caret) = std::mem::take(&mut self.before);
            state.text = text;
            state.version = version;
            state.caret = caret;
        }
        self.finish(&mut state);
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextSpan;

    #[test]
    fn committed_edit_is_one_undo_unit_and_moves_the_caret() {
        let view = MemoryView::new("app", "rust", "fn  main(){}\n");
        view.set_caret(9);
        let snapshot = view.current_document().unwrap();

        let mut txn = view.begin_edit_transaction("Formatting");
        txn.apply(
            &snapshot,
            &[
                TextChange::new(TextSpan::new(2, 4), " "),
                TextChange::insert(10, " "),
            ],
        )
        .unwrap();
        txn.complete();
        drop(txn);

        assert_eq!(view.text(), "fn main() {}\n");
        assert_eq!(view.caret(), 8);
        assert_eq!(view.undo_depth(), 1);
        assert!(!view.has_open_transaction());

        assert!(view.undo());
        assert_eq!(view.text(), "fn  main(){}\n");
        assert_eq!(view.caret(), 9);
    }

    #[test]
    fn stale_snapshot_is_rejected_and_rollback_restores() {
        let view = MemoryView::new("app", "rust", "abc");
        let snapshot = view.current_document().unwrap();
        view.replace_text("abcd");

        let mut txn = view.begin_edit_transaction("Formatting");
        let err = txn
            .apply(&snapshot, &[TextChange::insert(0, "x")])
            .unwrap_err();
        assert_eq!(
            err,
            ApplyError::StaleSnapshot {
                expected: 1,
                found: 2
            }
        );
        drop(txn);
        assert_eq!(view.text(), "abcd");
        assert_eq!(view.undo_depth(), 0);
    }

    #[test]
    fn dropping_an_applied_transaction_reverts_it() {
        let view = MemoryView::new("app", "rust", "abc");
        let snapshot = view.current_document().unwrap();
        let mut txn = view.begin_edit_transaction("Formatting");
        txn.apply(&snapshot, &[TextChange::delete(TextSpan::new(0, 1))])
            .unwrap();
        assert_eq!(view.text(), "bc");
        drop(txn);
        assert_eq!(view.text(), "abc");
        assert_eq!(view.version(), 1);
    }
}
