/// `load_config` module: loads the YAML option layers and per-language switches for the CLI.
///
/// This is the only place where user-supplied YAML is parsed. The result is mapped
/// onto the core's [`LayeredOptionStore`] and language capabilities.
///
/// # Accepted layout
/// ```yaml
/// defaults:
///   code_cleanup.rules_configured: true
///   formatting.indent_size: 4
/// workspace: {}
/// projects:
///   app:
///     formatting.use_tabs: true
/// languages:
///   rust:
///     cleanup: true
/// ```
/// Every section is optional. Option keys are passed through untouched, so rule
/// services can read keys the core does not know about.
///
/// # Environment
/// `DOCFMT_PROJECT` names the project layer when the command line does not.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use docfmt_core::options::LayeredOptionStore;
use docfmt_core::Configuration;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Environment variable naming the project layer.
pub const PROJECT_ENV: &str = "DOCFMT_PROJECT";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageSection {
    /// Whether this language has a cleanup service.
    #[serde(default)]
    pub cleanup: bool,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub path: PathBuf,
    pub defaults: Configuration,
    pub workspace: Configuration,
    pub projects: BTreeMap<String, Configuration>,
    pub languages: BTreeMap<String, LanguageSection>,
    /// Project name taken from [`PROJECT_ENV`], if set.
    pub project: Option<String>,
}

impl CliConfig {
    /// Builds the option layers. The document layer stays empty for the CLI.
    pub fn option_store(&self) -> LayeredOptionStore {
        self.projects.iter().fold(
            LayeredOptionStore::new(self.defaults.clone()).with_workspace(self.workspace.clone()),
            |store, (name, config)| store.with_project(name.clone(), config.clone()),
        )
    }

    /// Languages with cleanup switched on, lowercased.
    pub fn cleanup_languages(&self) -> impl Iterator<Item = &str> {
        self.languages
            .iter()
            .filter(|(_, section)| section.cleanup)
            .map(|(name, _)| name.as_str())
    }
}

/// Loads a YAML config file and picks up the project name from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    #[derive(Debug, Default, Deserialize)]
    struct RawConfig {
        #[serde(default)]
        defaults: Configuration,
        #[serde(default)]
        workspace: Configuration,
        #[serde(default)]
        projects: BTreeMap<String, Configuration>,
        #[serde(default)]
        languages: BTreeMap<String, LanguageSection>,
    }

    // An empty file is a valid config with every section defaulted.
    let raw: RawConfig = if config_content.trim().is_empty() {
        RawConfig::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    let project = std::env::var(PROJECT_ENV)
        .ok()
        .filter(|name| !name.trim().is_empty());

    Ok(CliConfig {
        path: path_ref.to_path_buf(),
        defaults: raw.defaults,
        workspace: raw.workspace,
        projects: raw.projects,
        languages: raw
            .languages
            .into_iter()
            .map(|(name, section)| (name.to_lowercase(), section))
            .collect(),
        project,
    })
}
