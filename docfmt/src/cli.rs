///
/// This module implements the CLI interface for docfmt: command parsing, wiring the
/// rule-based services into the core pipeline, and reporting the outcome.
///
/// All pipeline logic (option resolution, strategy selection, change computation and
/// atomic application) lives in the [`docfmt-core`] crate. This module is CLI glue.
///
/// ## How To Use
/// - Command line: `docfmt format --config docfmt.yaml src/main.rs`, or `--check` to
///   only report whether the file would change.
/// - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`docfmt-core`]: ../../docfmt-core/
use crate::load_config::{load_config, CliConfig};
use crate::services::{RuleCleanup, RuleFormatter};
use crate::surfaces::{ConfigFilePage, ConsoleAdvisory};
use anyhow::Result;
use clap::{Parser, Subcommand};
use docfmt_core::changes::ChangeComputer;
use docfmt_core::diff::LineDiffService;
use docfmt_core::memory::MemoryView;
use docfmt_core::notification::{NotificationGate, NotificationGateState};
use docfmt_core::options::OptionsResolver;
use docfmt_core::progress::CancellableContext;
use docfmt_core::scheduler::{BackgroundExecutor, UiExecutor};
use docfmt_core::strategy::{LanguageCapabilities, LanguageRegistry};
use docfmt_core::{CommandResult, FormatDocumentCommand, LanguageId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Project layer used when neither `--project` nor `DOCFMT_PROJECT` is given.
pub const DEFAULT_PROJECT: &str = "default";

/// CLI for docfmt: format documents through the cleanup/format pipeline.
#[derive(Parser)]
#[clap(
    name = "docfmt",
    version,
    about = "Format a document with optional code cleanup, applied as one undoable edit"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Format FILE in place using the given config file
    Format {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Language id; inferred from the file extension when omitted
        #[clap(long)]
        language: Option<String>,
        /// Project layer to apply; falls back to DOCFMT_PROJECT
        #[clap(long)]
        project: Option<String>,
        /// Report whether FILE would change without writing it
        #[clap(long)]
        check: bool,
        /// File to format
        file: PathBuf,
    },
}

/// Maps well-known file extensions to language ids.
pub fn language_for_path(path: &Path) -> LanguageId {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let id = match extension.as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "c" | "h" => "c",
        "cc" | "cpp" | "cxx" | "hpp" | "hh" => "cpp",
        "cs" => "csharp",
        "java" => "java",
        "go" => "go",
        "" => "plaintext",
        other => other,
    };
    LanguageId::from(id)
}

/// Builds the command for one CLI invocation.
fn build_command(config: &CliConfig) -> Result<FormatDocumentCommand> {
    let store = Arc::new(config.option_store());
    let formatter = RuleFormatter::new()
        .map_err(|e| anyhow::anyhow!("Failed to compile formatting rules: {e}"))?;

    let mut registry = LanguageRegistry::new();
    for language in config.cleanup_languages() {
        registry.register(
            language,
            LanguageCapabilities::with_cleanup(Arc::new(RuleCleanup::new(formatter.clone())))
                .with_option_pages(Arc::new(ConfigFilePage::new(config.path.clone()))),
        );
    }

    let background = BackgroundExecutor::current()
        .map_err(|e| anyhow::anyhow!("docfmt must run inside a tokio runtime: {e}"))?;
    let defaults = store.defaults().clone();
    Ok(FormatDocumentCommand::new(
        OptionsResolver::new(store, defaults),
        Arc::new(registry),
        ChangeComputer::new(Arc::new(formatter), Arc::new(LineDiffService::default())),
        NotificationGate::new(NotificationGateState::new(), Arc::new(ConsoleAdvisory::stderr())),
        background,
    ))
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Format {
            config,
            language,
            project,
            check,
            file,
        } => {
            let config = load_config(config)?;
            let text = std::fs::read_to_string(&file).map_err(|e| {
                tracing::error!(error = ?e, file = ?file, "Failed to read input file");
                anyhow::anyhow!("Failed to read {:?}: {}", file, e)
            })?;
            let language = language
                .map(|id| LanguageId::from(id.as_str()))
                .unwrap_or_else(|| language_for_path(&file));
            let project = project
                .or_else(|| config.project.clone())
                .unwrap_or_else(|| DEFAULT_PROJECT.to_string());
            tracing::info!(
                command = "format",
                file = ?file,
                %language,
                %project,
                check,
                "Starting format"
            );

            let command = Arc::new(build_command(&config)?);
            let view = MemoryView::new(project, language, text.clone());

            let interrupt = CancellationToken::new();
            let context = Arc::new(CancellableContext::new(interrupt.clone()));
            let on_ctrl_c = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!(command = "format", "Interrupted, cancelling");
                    interrupt.cancel();
                }
            });

            let ui = UiExecutor::spawn()
                .map_err(|e| anyhow::anyhow!("Failed to start UI executor: {e}"))?;
            let target = view.clone();
            let result = ui
                .run(move |ctx| command.execute_with_result(ctx, &target, context.as_ref()))
                .await
                .map_err(|e| anyhow::anyhow!("UI executor failed: {e}"))?;
            on_ctrl_c.abort();
            drop(ui);

            report(&file, &text, &view, result, check)
        }
    }
}

fn report(
    file: &Path,
    original: &str,
    view: &MemoryView,
    result: CommandResult,
    check: bool,
) -> Result<()> {
    match result {
        CommandResult::Applied { edits } => {
            if check {
                println!("{}: would reformat ({edits} edits)", file.display());
                return Err(anyhow::anyhow!("{} is not formatted", file.display()));
            }
            let formatted = view.text();
            if formatted != original {
                std::fs::write(file, &formatted).map_err(|e| {
                    tracing::error!(error = ?e, file = ?file, "Failed to write formatted file");
                    anyhow::anyhow!("Failed to write {:?}: {}", file, e)
                })?;
            }
            tracing::info!(command = "format", edits, "Format complete");
            println!("{}: formatted ({edits} edits)", file.display());
            Ok(())
        }
        CommandResult::Unchanged => {
            tracing::info!(command = "format", "Already formatted");
            println!("{}: unchanged", file.display());
            Ok(())
        }
        CommandResult::NotApplicable => Err(anyhow::anyhow!(
            "{} cannot be formatted: no editable document",
            file.display()
        )),
        CommandResult::Cancelled => Err(anyhow::anyhow!(
            "Formatting {} was cancelled",
            file.display()
        )),
        CommandResult::RolledBack => Err(anyhow::anyhow!(
            "Edits to {} were rolled back",
            file.display()
        )),
        CommandResult::Failed => Err(anyhow::anyhow!(
            "Formatting {} failed; see the log for details",
            file.display()
        )),
    }
}
