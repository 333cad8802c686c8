//! Console stand-ins for the editor's notification bar and option pages.

use std::io::Write;
use std::path::PathBuf;

use docfmt_core::contract::{AdvisoryAction, AdvisorySurface, OptionPageService};
use parking_lot::Mutex;
use tracing::info;

/// Prints advisories and their action labels to a writer, stderr by default.
///
/// The CLI is not interactive, so actions are never invoked.
pub struct ConsoleAdvisory {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleAdvisory {
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl AdvisorySurface for ConsoleAdvisory {
    fn show_advisory(&self, message: &str, actions: Vec<AdvisoryAction>) {
        let labels: Vec<&str> = actions.iter().map(|action| action.label.as_str()).collect();
        let mut out = self.out.lock();
        let _ = writeln!(out, "docfmt: {message} [{}]", labels.join(" | "));
        let _ = out.flush();
    }
}

/// "Configure it now" target: points the user at the config file in use.
#[derive(Debug, Clone)]
pub struct ConfigFilePage {
    path: PathBuf,
}

impl ConfigFilePage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn message(&self) -> String {
        format!(
            "docfmt: set `code_cleanup.rules_configured: true` under `defaults` in {}",
            self.path.display()
        )
    }
}

impl OptionPageService for ConfigFilePage {
    fn show_formatting_option_page(&self) {
        info!(config_path = ?self.path, "[ADVISORY] Showing formatting options");
        eprintln!("{}", self.message());
    }
}
