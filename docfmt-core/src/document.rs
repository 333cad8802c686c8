//! Document snapshots and the configuration view the pipeline reads.
//!
//! A [`Document`] is immutable: transformations produce a new snapshot through
//! [`Document::with_text`], and the editor surfaces a fresh snapshot (with a bumped
//! version) once it accepts edits. Every step of one pipeline run must refer to
//! the same snapshot.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Option key telling whether code cleanup rules have been configured.
pub const CODE_CLEANUP_RULES_CONFIGURED: &str = "code_cleanup.rules_configured";
/// Number of columns per indentation level.
pub const FORMATTING_INDENT_SIZE: &str = "formatting.indent_size";
/// Indent with tabs instead of spaces.
pub const FORMATTING_USE_TABS: &str = "formatting.use_tabs";
/// Strip whitespace at the end of every line.
pub const FORMATTING_TRIM_TRAILING_WHITESPACE: &str = "formatting.trim_trailing_whitespace";
/// Make sure the document ends with a newline.
pub const FORMATTING_INSERT_FINAL_NEWLINE: &str = "formatting.insert_final_newline";

/// Stable identity of an open document, shared by all of its snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Language identifier used to look up per-language capabilities (e.g. `rust`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LanguageId(String);

impl LanguageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for LanguageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable point-in-time view of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    /// Owning project, used to pick the project configuration layer.
    pub project: String,
    pub language: LanguageId,
    pub text: Arc<str>,
    /// Editor version this snapshot was taken at.
    pub version: u64,
    /// Options resolved for this snapshot; empty until the resolver attaches them.
    pub configuration: Arc<Configuration>,
}

impl Document {
    pub fn new(
        id: DocumentId,
        project: impl Into<String>,
        language: LanguageId,
        text: impl Into<Arc<str>>,
        version: u64,
    ) -> Self {
        Self {
            id,
            project: project.into(),
            language,
            text: text.into(),
            version,
            configuration: Arc::default(),
        }
    }

    /// Returns this snapshot carrying `configuration`.
    pub fn with_configuration(&self, configuration: Configuration) -> Self {
        Self {
            configuration: Arc::new(configuration),
            ..self.clone()
        }
    }

    /// Returns a transformed snapshot with the same identity and version.
    pub fn with_text(&self, text: impl Into<Arc<str>>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when both snapshots carry byte-identical text.
    pub fn text_eq(&self, other: &Document) -> bool {
        self.text == other.text
    }
}

/// Read-only key/value view of resolved document settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    values: BTreeMap<String, Value>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.values.get(key).and_then(Value::as_u64)
    }

    /// Missing or non-boolean values count as "not configured".
    pub fn cleanup_rules_configured(&self) -> bool {
        self.get_bool(CODE_CLEANUP_RULES_CONFIGURED).unwrap_or(false)
    }

    /// Overlays `other` on top of `self`, key by key.
    pub fn merge(&mut self, other: &Configuration) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_text_keeps_identity_and_version() {
        let doc = Document::new(DocumentId::new(), "app", "Rust".into(), "fn a() {}", 7);
        let next = doc.with_text("fn a() {}\n");
        assert_eq!(next.id, doc.id);
        assert_eq!(next.version, 7);
        assert_eq!(next.language.as_str(), "rust");
        assert!(!next.text_eq(&doc));
    }

    #[test]
    fn with_configuration_keeps_text_and_identity() {
        let doc = Document::new(DocumentId::new(), "app", "rust".into(), "x\n", 2);
        assert!(doc.configuration.is_empty());
        let configured =
            doc.with_configuration(Configuration::new().with(FORMATTING_INDENT_SIZE, 2));
        assert_eq!(configured.id, doc.id);
        assert_eq!(configured.version, 2);
        assert!(configured.text_eq(&doc));
        assert_eq!(configured.configuration.get_u64(FORMATTING_INDENT_SIZE), Some(2));
    }

    #[test]
    fn merge_overrides_key_by_key() {
        let mut base = Configuration::new()
            .with(CODE_CLEANUP_RULES_CONFIGURED, false)
            .with(FORMATTING_INDENT_SIZE, 4);
        base.merge(&Configuration::new().with(CODE_CLEANUP_RULES_CONFIGURED, true));
        assert!(base.cleanup_rules_configured());
        assert_eq!(base.get_u64(FORMATTING_INDENT_SIZE), Some(4));
    }

    #[test]
    fn non_boolean_cleanup_flag_is_not_configured() {
        let config = Configuration::new().with(CODE_CLEANUP_RULES_CONFIGURED, "yes");
        assert!(!config.cleanup_rules_configured());
    }
}
