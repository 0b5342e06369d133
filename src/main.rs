//! Command-line entry point: export the foreclosures layer to `data/` with default settings.

use std::process::ExitCode;

use foreclosure_export::{Config, ExportSummary, Exporter, run_until_signal};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // RUST_LOG overrides the default info level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let exporter = match Exporter::new(Config::default()) {
        Ok(exporter) => exporter,
        Err(e) => {
            tracing::error!(error = %e, "Failed to set up export");
            return ExitCode::FAILURE;
        }
    };

    match run_until_signal(&exporter).await {
        Ok(ExportSummary::Written { path, write, .. }) => {
            tracing::info!(path = %path.display(), rows = write.rows_written, "Export complete");
            ExitCode::SUCCESS
        }
        Ok(ExportSummary::NothingRetrieved { .. }) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Export failed");
            ExitCode::FAILURE
        }
    }
}
