#![allow(unused)]

//! # contract: collaborator interfaces consumed by the format-document pipeline
//!
//! The pipeline owns no formatting rules, no UI and no undo storage. Everything it
//! talks to is defined here as a trait so that editors, the CLI and tests can plug
//! in their own implementations.
//!
//! ## Interface & Extensibility
//! - Asynchronous services ([`ConfigurationService`], [`CleanupService`],
//!   [`FormattingService`], [`DiffService`]) run on the background executor and
//!   receive the command's cancellation token.
//! - UI-affine surfaces ([`TextView`], [`ScopedTransaction`], [`AdvisorySurface`],
//!   [`OptionPageService`], [`OperationContext`]) are synchronous and are only
//!   called from the UI executor.
//! - Service errors are boxed trait objects ([`ServiceError`]).
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall` so tests get `Mock*` types.

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use tokio_util::sync::CancellationToken;

pub use crate::error::{ApplyError, ServiceError};
use crate::document::{Configuration, Document};
use crate::progress::OperationScope;
use crate::scheduler::UiContext;
use crate::text::{TextChange, TextSpan};

/// Retrieves the effective configuration for a document.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ConfigurationService: Send + Sync {
    /// Resolve layered options for `document`. Only cancellation should make this fail.
    async fn get_options(
        &self,
        document: &Document,
        token: CancellationToken,
    ) -> Result<Configuration, ServiceError>;
}

/// Whole-document cleanup (import organisation, style rewrites) followed by formatting.
///
/// Registered per language; a language without one is formatted only.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CleanupService: Send + Sync {
    /// Returns the cleaned-up snapshot. Identity and version must match `document`.
    async fn cleanup_and_format(
        &self,
        document: &Document,
        token: CancellationToken,
    ) -> Result<Document, ServiceError>;
}

/// Layout-only formatting over a span or the whole document.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait FormattingService: Send + Sync {
    /// Returns sorted, non-overlapping edits against `document`.
    async fn format_span(
        &self,
        document: &Document,
        selection: Option<TextSpan>,
        token: CancellationToken,
    ) -> Result<Vec<TextChange>, ServiceError>;
}

/// Computes the edits turning `old` into `new`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DiffService: Send + Sync {
    async fn diff(
        &self,
        old: &Document,
        new: &Document,
        token: CancellationToken,
    ) -> Result<Vec<TextChange>, ServiceError>;
}

/// One button on an advisory.
///
/// Surfaces may hold actions on any thread, but running one needs a [`UiContext`],
/// so it can only happen on the UI executor.
pub struct AdvisoryAction {
    pub label: String,
    pub on_invoke: Box<dyn FnOnce(&UiContext) + Send>,
}

impl AdvisoryAction {
    pub fn new(
        label: impl Into<String>,
        on_invoke: impl FnOnce(&UiContext) + Send + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            on_invoke: Box::new(on_invoke),
        }
    }

    /// Runs the action on the UI executor, consuming it.
    pub fn invoke(self, ui: &UiContext) {
        (self.on_invoke)(ui)
    }
}

impl std::fmt::Debug for AdvisoryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisoryAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Non-blocking notification area ("gold bar"). Fire-and-forget.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait AdvisorySurface: Send + Sync {
    fn show_advisory(&self, message: &str, actions: Vec<AdvisoryAction>);
}

/// Opens the language's formatting settings so the user can configure cleanup.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait OptionPageService: Send + Sync {
    fn show_formatting_option_page(&self);
}

/// An open, undoable, caret-preserving edit on a view.
///
/// Must be completed or rolled back exactly once; [`crate::transaction::Transaction`]
/// guarantees that for pipeline code.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait ScopedTransaction: Send {
    /// Applies all of `changes` against `snapshot` as one edit, or none of them.
    fn apply(&mut self, snapshot: &Document, changes: &[TextChange]) -> Result<(), ApplyError>;

    /// Commits the transaction as a single undo unit.
    fn complete(&mut self);

    /// Reverts everything applied since the transaction opened.
    fn rollback(&mut self);
}

/// The text view the command targets.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait TextView: Send + Sync {
    /// False for read-only or projection buffers.
    fn supports_document_edits(&self) -> bool;

    /// The document currently open in this view, if any.
    fn current_document(&self) -> Option<Document>;

    /// Opens an undo transaction that captures caret and selection.
    fn begin_edit_transaction(&self, label: &str) -> Box<dyn ScopedTransaction>;
}

/// Progress reporting surface that owns the user's cancel button.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait OperationContext: Send + Sync {
    fn add_scope(&self, allow_cancellation: bool, description: &str) -> OperationScope;
}
