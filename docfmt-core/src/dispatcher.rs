//! Entry point of the format-document command.
//!
//! Flow, all on the UI executor unless noted:
//!   1. check the view is editable and has a document
//!   2. open a cancellable progress scope
//!   3. resolve options (background)
//!   4. select a strategy, showing the cleanup advisory if asked to
//!   5. compute the change set (background)
//!   6. apply it atomically
//!
//! Only "not applicable" is visible to the caller as `false`; every other failure
//! is handled here by rolling back or doing nothing.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::changes::ChangeComputer;
use crate::contract::{OperationContext, TextView};
use crate::document::Document;
use crate::error::PipelineError;
use crate::notification::NotificationGate;
use crate::options::OptionsResolver;
use crate::scheduler::{BackgroundExecutor, UiContext};
use crate::strategy::{select_strategy, LanguageRegistry};
use crate::transaction::TransactionCoordinator;

/// Progress scope description shown while the command runs.
pub const FORMATTING_DOCUMENT: &str = "Formatting document";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Preconditions unmet; nothing happened.
    NotApplicable,
    Applied { edits: usize },
    /// Empty change set; an empty transaction was completed.
    Unchanged,
    Cancelled,
    /// The editor rejected the edits; the transaction was rolled back.
    RolledBack,
    /// A transformation service failed before any transaction opened.
    Failed,
}

impl CommandResult {
    /// Whether the command counts as executed.
    pub fn executed(&self) -> bool {
        !matches!(self, CommandResult::NotApplicable)
    }
}

pub struct FormatDocumentCommand {
    options: OptionsResolver,
    registry: Arc<LanguageRegistry>,
    changes: ChangeComputer,
    transactions: TransactionCoordinator,
    gate: NotificationGate,
    background: BackgroundExecutor,
}

impl FormatDocumentCommand {
    pub fn new(
        options: OptionsResolver,
        registry: Arc<LanguageRegistry>,
        changes: ChangeComputer,
        gate: NotificationGate,
        background: BackgroundExecutor,
    ) -> Self {
        Self {
            options,
            registry,
            changes,
            transactions: TransactionCoordinator::default(),
            gate,
            background,
        }
    }

    pub fn command_state(&self, view: &dyn TextView) -> CommandState {
        if view.supports_document_edits() && view.current_document().is_some() {
            CommandState::Available
        } else {
            CommandState::Unavailable
        }
    }

    /// Returns `false` only when the command cannot run for `view`.
    pub fn execute(
        &self,
        ui: &UiContext,
        view: &dyn TextView,
        context: &dyn OperationContext,
    ) -> bool {
        self.execute_with_result(ui, view, context).executed()
    }

    pub fn execute_with_result(
        &self,
        ui: &UiContext,
        view: &dyn TextView,
        context: &dyn OperationContext,
    ) -> CommandResult {
        if !view.supports_document_edits() {
            info!("[FORMAT] View does not support document edits");
            return CommandResult::NotApplicable;
        }
        let Some(document) = view.current_document() else {
            info!("[FORMAT] No document open in view");
            return CommandResult::NotApplicable;
        };

        let scope = context.add_scope(true, FORMATTING_DOCUMENT);
        info!(
            document = %document.id,
            language = %document.language,
            version = document.version,
            "[FORMAT] Formatting document"
        );

        let result = match self.run(ui, view, &document, scope.token()) {
            Ok(0) => CommandResult::Unchanged,
            Ok(edits) => CommandResult::Applied { edits },
            Err(PipelineError::Cancelled) => CommandResult::Cancelled,
            Err(PipelineError::Apply(e)) => {
                warn!(document = %document.id, error = %e, "[FORMAT] Edits rolled back");
                CommandResult::RolledBack
            }
            Err(PipelineError::Service(e)) => {
                error!(document = %document.id, error = %e, "[FORMAT] Transformation failed");
                CommandResult::Failed
            }
        };
        info!(document = %document.id, ?result, "[FORMAT] Command finished");
        result
    }

    fn run(
        &self,
        ui: &UiContext,
        view: &dyn TextView,
        document: &Document,
        token: CancellationToken,
    ) -> Result<usize, PipelineError> {
        let options = self.options.clone();
        let snapshot = document.clone();
        let resolve_token = token.clone();
        let configuration = self.background.wait(ui, async move {
            options.resolve(&snapshot, resolve_token).await
        })?;

        let capabilities = self.registry.capabilities(&document.language);
        let decision = select_strategy(&capabilities, &configuration);
        if decision.show_advisory {
            self.gate.show(ui, document, capabilities.option_pages.clone());
        }

        let computer = self.changes.clone();
        let snapshot = document.with_configuration(configuration);
        let compute_token = token.clone();
        let changes = self.background.wait(ui, async move {
            computer
                .compute(decision.strategy, &capabilities, &snapshot, None, compute_token)
                .await
        })?;

        self.transactions
            .apply_atomically(ui, view, document, &changes, None, &token)
    }
}
