//! Change computation: run the selected strategy and reduce it to a change set
//! against the original snapshot.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::contract::{CleanupService, DiffService, FormattingService, ServiceError};
use crate::document::Document;
use crate::error::PipelineError;
use crate::strategy::{LanguageCapabilities, Strategy};
use crate::text::{validate_changes, TextChange, TextSpan};

/// Awaits `future` unless `token` fires first.
pub(crate) async fn until_cancelled<T, F>(
    token: &CancellationToken,
    future: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    if token.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PipelineError::Cancelled),
        result = future => match result {
            Ok(value) => Ok(value),
            Err(_) if token.is_cancelled() => Err(PipelineError::Cancelled),
            Err(e) => Err(PipelineError::service(e)),
        },
    }
}

#[derive(Clone)]
pub struct ChangeComputer {
    formatter: Arc<dyn FormattingService>,
    differ: Arc<dyn DiffService>,
}

impl ChangeComputer {
    pub fn new(formatter: Arc<dyn FormattingService>, differ: Arc<dyn DiffService>) -> Self {
        Self { formatter, differ }
    }

    /// Returns the complete change set for `strategy`, possibly empty, never partial.
    pub async fn compute(
        &self,
        strategy: Strategy,
        capabilities: &LanguageCapabilities,
        document: &Document,
        selection: Option<TextSpan>,
        token: CancellationToken,
    ) -> Result<Vec<TextChange>, PipelineError> {
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let changes = match (strategy, capabilities.cleanup.as_ref()) {
            (Strategy::CleanupThenFormat, Some(cleanup)) => {
                self.cleanup_changes(cleanup.as_ref(), document, &token).await?
            }
            (Strategy::CleanupThenFormat, None) => {
                warn!(
                    language = %document.language,
                    "[CHANGES] No cleanup service registered, formatting only"
                );
                self.format_changes(document, selection, &token).await?
            }
            (Strategy::FormatOnly, _) => self.format_changes(document, selection, &token).await?,
        };
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        validate_changes(document.text(), &changes).map_err(|e| {
            PipelineError::Service(format!("service returned an invalid change set: {e}"))
        })?;
        info!(
            document = %document.id,
            %strategy,
            changes = changes.len(),
            "[CHANGES] Change set computed"
        );
        Ok(changes)
    }

    async fn format_changes(
        &self,
        document: &Document,
        selection: Option<TextSpan>,
        token: &CancellationToken,
    ) -> Result<Vec<TextChange>, PipelineError> {
        debug!(document = %document.id, ?selection, "[CHANGES] Invoking formatting service");
        until_cancelled(
            token,
            self.formatter.format_span(document, selection, token.clone()),
        )
        .await
    }

    async fn cleanup_changes(
        &self,
        cleanup: &dyn CleanupService,
        document: &Document,
        token: &CancellationToken,
    ) -> Result<Vec<TextChange>, PipelineError> {
        debug!(document = %document.id, "[CHANGES] Invoking cleanup service");
        let cleaned =
            until_cancelled(token, cleanup.cleanup_and_format(document, token.clone())).await?;
        if cleaned.id != document.id {
            return Err(PipelineError::Service(format!(
                "cleanup returned document {} for {}",
                cleaned.id, document.id
            )));
        }
        if cleaned.text_eq(document) {
            debug!(document = %document.id, "[CHANGES] Cleanup produced identical text");
            return Ok(Vec::new());
        }
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        until_cancelled(token, self.differ.diff(document, &cleaned, token.clone())).await
    }
}
