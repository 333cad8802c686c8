//! Single-flight "code cleanup is not configured" advisory.
//!
//! The gate latches open when the advisory is shown. Only "Configure it now"
//! resets it; "Do not show this message again" (or ignoring the advisory) leaves
//! it open, so the advisory is not shown again for the rest of the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::contract::{AdvisoryAction, AdvisorySurface, OptionPageService};
use crate::document::Document;
use crate::scheduler::UiContext;

pub const CODE_CLEANUP_NOT_CONFIGURED: &str = "Code cleanup is not configured";
pub const CONFIGURE_IT_NOW: &str = "Configure it now";
pub const DO_NOT_SHOW_AGAIN: &str = "Do not show this message again";

/// Session-scoped gate flag. Construct once and share it with every dispatcher.
#[derive(Debug, Clone, Default)]
pub struct NotificationGateState {
    open: Arc<AtomicBool>,
}

impl NotificationGateState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Opens the gate; false if it was already open.
    fn try_open(&self) -> bool {
        !self.open.swap(true, Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct NotificationGate {
    state: NotificationGateState,
    surface: Arc<dyn AdvisorySurface>,
}

impl NotificationGate {
    pub fn new(state: NotificationGateState, surface: Arc<dyn AdvisorySurface>) -> Self {
        Self { state, surface }
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Shows the advisory for `target` unless one is already open.
    pub fn show(
        &self,
        _ui: &UiContext,
        target: &Document,
        option_pages: Option<Arc<dyn OptionPageService>>,
    ) {
        if !self.state.try_open() {
            debug!(document = %target.id, "[ADVISORY] Advisory already open, not showing again");
            return;
        }
        info!(
            document = %target.id,
            language = %target.language,
            "[ADVISORY] Showing cleanup advisory"
        );

        let gate = self.clone();
        let configure = AdvisoryAction::new(CONFIGURE_IT_NOW, move |ui| {
            if let Some(pages) = option_pages {
                pages.show_formatting_option_page();
            }
            gate.reset(ui);
        });
        let dismiss = AdvisoryAction::new(DO_NOT_SHOW_AGAIN, |_| {
            debug!("[ADVISORY] Advisory suppressed for this session");
        });
        self.surface
            .show_advisory(CODE_CLEANUP_NOT_CONFIGURED, vec![configure, dismiss]);
    }

    /// Closes the gate after the advisory was resolved by the user.
    ///
    /// Actions receive the [`UiContext`] they run under, so a surface can only
    /// reset the gate from the UI executor.
    pub fn reset(&self, _ui: &UiContext) {
        info!("[ADVISORY] Configure action invoked, gate reset");
        self.state.close();
    }
}
