//! Strategy selection: format only, or clean up then format.
//!
//! Capabilities are looked up once per document in a typed [`LanguageRegistry`].
//! [`select_strategy`] is a pure decision; showing the advisory it may ask for is
//! the dispatcher's job.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::contract::{CleanupService, OptionPageService};
use crate::document::{Configuration, LanguageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    FormatOnly,
    CleanupThenFormat,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::FormatOnly => f.write_str("format-only"),
            Strategy::CleanupThenFormat => f.write_str("cleanup-then-format"),
        }
    }
}

/// Outcome of [`select_strategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyDecision {
    pub strategy: Strategy,
    /// Cleanup exists for the language but is not configured: tell the user once.
    pub show_advisory: bool,
}

/// What a language supports beyond plain formatting.
#[derive(Clone, Default)]
pub struct LanguageCapabilities {
    pub cleanup: Option<Arc<dyn CleanupService>>,
    pub option_pages: Option<Arc<dyn OptionPageService>>,
}

impl LanguageCapabilities {
    pub fn format_only() -> Self {
        Self::default()
    }

    pub fn with_cleanup(cleanup: Arc<dyn CleanupService>) -> Self {
        Self {
            cleanup: Some(cleanup),
            option_pages: None,
        }
    }

    pub fn with_option_pages(mut self, pages: Arc<dyn OptionPageService>) -> Self {
        self.option_pages = Some(pages);
        self
    }

    pub fn supports_cleanup(&self) -> bool {
        self.cleanup.is_some()
    }
}

impl fmt::Debug for LanguageCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageCapabilities")
            .field("cleanup", &self.cleanup.is_some())
            .field("option_pages", &self.option_pages.is_some())
            .finish()
    }
}

/// Language identifier to capability set.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    languages: HashMap<LanguageId, LanguageCapabilities>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        language: impl Into<LanguageId>,
        capabilities: LanguageCapabilities,
    ) {
        self.languages.insert(language.into(), capabilities);
    }

    pub fn with(
        mut self,
        language: impl Into<LanguageId>,
        capabilities: LanguageCapabilities,
    ) -> Self {
        self.register(language, capabilities);
        self
    }

    /// Unknown languages have no capabilities and are formatted only.
    pub fn capabilities(&self, language: &LanguageId) -> LanguageCapabilities {
        self.languages.get(language).cloned().unwrap_or_default()
    }
}

pub fn select_strategy(
    capabilities: &LanguageCapabilities,
    configuration: &Configuration,
) -> StrategyDecision {
    let decision = if !capabilities.supports_cleanup() {
        StrategyDecision {
            strategy: Strategy::FormatOnly,
            show_advisory: false,
        }
    } else if !configuration.cleanup_rules_configured() {
        StrategyDecision {
            strategy: Strategy::FormatOnly,
            show_advisory: true,
        }
    } else {
        StrategyDecision {
            strategy: Strategy::CleanupThenFormat,
            show_advisory: false,
        }
    };
    debug!(
        strategy = %decision.strategy,
        show_advisory = decision.show_advisory,
        "[STRATEGY] Selected"
    );
    decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockCleanupService;
    use crate::document::CODE_CLEANUP_RULES_CONFIGURED;

    fn configured(flag: bool) -> Configuration {
        Configuration::new().with(CODE_CLEANUP_RULES_CONFIGURED, flag)
    }

    #[test]
    fn no_cleanup_service_always_formats_only() {
        let caps = LanguageCapabilities::format_only();
        for flag in [true, false] {
            let decision = select_strategy(&caps, &configured(flag));
            assert_eq!(decision.strategy, Strategy::FormatOnly);
            assert!(!decision.show_advisory);
        }
        let decision = select_strategy(&caps, &Configuration::new());
        assert!(!decision.show_advisory);
    }

    #[test]
    fn unconfigured_cleanup_formats_and_advises() {
        let caps = LanguageCapabilities::with_cleanup(Arc::new(MockCleanupService::new()));
        let decision = select_strategy(&caps, &configured(false));
        assert_eq!(
            decision,
            StrategyDecision {
                strategy: Strategy::FormatOnly,
                show_advisory: true
            }
        );
    }

    #[test]
    fn configured_cleanup_runs_cleanup() {
        let caps = LanguageCapabilities::with_cleanup(Arc::new(MockCleanupService::new()));
        let decision = select_strategy(&caps, &configured(true));
        assert_eq!(decision.strategy, Strategy::CleanupThenFormat);
        assert!(!decision.show_advisory);
    }

    #[test]
    fn registry_lookup_is_case_insensitive_and_defaults_to_format_only() {
        let registry = LanguageRegistry::new().with(
            "Rust",
            LanguageCapabilities::with_cleanup(Arc::new(MockCleanupService::new())),
        );
        assert!(registry.capabilities(&LanguageId::new("rust")).supports_cleanup());
        assert!(!registry.capabilities(&LanguageId::new("toml")).supports_cleanup());
    }
}
