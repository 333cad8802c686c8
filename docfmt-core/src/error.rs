use crate::text::ChangeSetError;

/// Error type returned by collaborator services (boxed, as for all contract traits).
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// Why the editor refused an edit set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("snapshot is stale: edits computed against version {expected}, document is at {found}")]
    StaleSnapshot { expected: u64, found: u64 },
    #[error("invalid change set: {0}")]
    InvalidChanges(#[from] ChangeSetError),
    #[error("editor rejected the edit: {0}")]
    Rejected(String),
}

/// Failures inside the pipeline. None of these cross the command boundary.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("operation was cancelled")]
    Cancelled,
    #[error("transformation service failed: {0}")]
    Service(String),
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

impl PipelineError {
    pub fn service(err: ServiceError) -> Self {
        PipelineError::Service(err.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}
