//! Progress scopes and the cancellation token they hand out.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::contract::OperationContext;

/// A user-visible progress scope. Closing happens on drop.
pub struct OperationScope {
    description: String,
    token: CancellationToken,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl OperationScope {
    pub fn new(description: impl Into<String>, token: CancellationToken) -> Self {
        Self {
            description: description.into(),
            token,
            on_close: None,
        }
    }

    /// Registers a callback run when the scope is dropped.
    pub fn on_close(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Token cancelled when the user cancels this scope.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl std::fmt::Debug for OperationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationScope")
            .field("description", &self.description)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}

impl Drop for OperationScope {
    fn drop(&mut self) {
        debug!(description = %self.description, "[FORMAT] Progress scope closed");
        if let Some(f) = self.on_close.take() {
            f();
        }
    }
}

/// [`OperationContext`] backed by a parent token, e.g. one tied to Ctrl-C.
///
/// Scopes get child tokens; cancelling the parent cancels every open scope.
/// Non-cancellable scopes get a fresh token nobody can cancel.
#[derive(Debug, Default)]
pub struct CancellableContext {
    parent: CancellationToken,
    opened: Mutex<Vec<String>>,
}

impl CancellableContext {
    pub fn new(parent: CancellationToken) -> Self {
        Self {
            parent,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn cancel(&self) {
        self.parent.cancel();
    }

    /// Descriptions of every scope opened so far.
    pub fn opened_scopes(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl OperationContext for CancellableContext {
    fn add_scope(&self, allow_cancellation: bool, description: &str) -> OperationScope {
        debug!(description, allow_cancellation, "[FORMAT] Progress scope opened");
        self.opened.lock().push(description.to_string());
        let token = if allow_cancellation {
            self.parent.child_token()
        } else {
            CancellationToken::new()
        };
        OperationScope::new(description, token)
    }
}
