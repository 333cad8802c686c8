use docfmt::load_config::{load_config, PROJECT_ENV};
use docfmt_core::document::{
    CODE_CLEANUP_RULES_CONFIGURED, FORMATTING_INDENT_SIZE, FORMATTING_USE_TABS,
};
use docfmt_core::{Document, DocumentId};
use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// All four sections load and merge into the layered option store.
#[test]
#[serial]
fn test_load_config_layers_and_languages() {
    env::remove_var(PROJECT_ENV);
    let file = config_file(
        r#"
defaults:
  code_cleanup.rules_configured: false
  formatting.indent_size: 4
workspace:
  formatting.indent_size: 2
projects:
  app:
    code_cleanup.rules_configured: true
    formatting.use_tabs: true
languages:
  Rust:
    cleanup: true
  toml:
    cleanup: false
"#,
    );

    let config = load_config(file.path()).expect("Config should load");
    assert_eq!(config.path, file.path());
    assert_eq!(config.project, None);
    assert_eq!(config.cleanup_languages().collect::<Vec<_>>(), vec!["rust"]);

    let store = config.option_store();
    let app = store.resolve_for(&Document::new(DocumentId::new(), "app", "rust".into(), "", 1));
    assert!(app.cleanup_rules_configured());
    assert_eq!(app.get_u64(FORMATTING_INDENT_SIZE), Some(2));
    assert_eq!(app.get_bool(FORMATTING_USE_TABS), Some(true));

    let other = store.resolve_for(&Document::new(DocumentId::new(), "other", "rust".into(), "", 1));
    assert_eq!(other.get_bool(CODE_CLEANUP_RULES_CONFIGURED), Some(false));
    assert_eq!(other.get_bool(FORMATTING_USE_TABS), None);
}

/// Every section is optional; an empty file yields empty layers.
#[test]
#[serial]
fn test_load_config_allows_missing_sections() {
    env::remove_var(PROJECT_ENV);
    let file = config_file("");
    let config = load_config(file.path()).expect("Empty config should load");
    assert!(config.defaults.is_empty());
    assert!(config.projects.is_empty());
    assert_eq!(config.cleanup_languages().count(), 0);

    let file = config_file("defaults:\n  formatting.indent_size: 8\n");
    let config = load_config(file.path()).expect("Partial config should load");
    assert_eq!(config.defaults.get_u64(FORMATTING_INDENT_SIZE), Some(8));
}

/// The project name comes from the environment when set.
#[test]
#[serial]
fn test_load_config_reads_project_from_env() {
    let file = config_file("defaults: {}\n");
    env::set_var(PROJECT_ENV, "app");
    let config = load_config(file.path()).expect("Config should load");
    env::remove_var(PROJECT_ENV);
    assert_eq!(config.project.as_deref(), Some("app"));
}

/// Invalid YAML is reported as a parse error.
#[test]
#[serial]
fn test_load_config_errors_for_invalid_file() {
    let file = config_file("not-yaml: [:::");
    let err = load_config(file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

/// A missing file is reported with its path.
#[test]
#[serial]
fn test_load_config_errors_for_missing_file() {
    let err = load_config("/nonexistent/docfmt.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
