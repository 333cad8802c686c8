use anyhow::Result;
use clap::Parser;
use docfmt::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment (DOCFMT_PROJECT, RUST_LOG)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    let cli = Cli::parse();
    tracing::info!("CLI arguments parsed, invoking run");
    let result = run(cli).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
