//! # foreclosure-export
//!
//! Exports the Louisville Metro KY property foreclosures layer from its ArcGIS feature
//! service to a CSV file.
//!
//! ## How a run works
//!
//! - **Fetch** - a fixed pool of workers pulls page offsets from a bounded queue and queries
//!   the service one page at a time. A failed page is logged and dropped; nothing is retried.
//! - **Merge** - each worker keeps its own records; they are concatenated once every worker
//!   has finished.
//! - **Write** - the records are rendered in a fixed column order, with the two date columns
//!   formatted as `YYYY/MM/DD HH:MM:SS+00` in UTC.
//!
//! ## Quick Start
//!
//! ```no_run
//! use foreclosure_export::{Config, Exporter, ExportSummary};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.pagination.workers = 8;
//!
//!     let exporter = Exporter::new(config)?;
//!     match exporter.run(CancellationToken::new()).await? {
//!         ExportSummary::Written { path, write, .. } => {
//!             println!("wrote {} rows to {}", write.rows_written, path.display());
//!         }
//!         ExportSummary::NothingRetrieved { .. } => println!("service returned no rows"),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Pagination coordinator and worker pool
pub mod coordinator;
/// Error types
pub mod error;
/// Fetch-then-write pipeline
pub mod export;
/// Feature service page fetching
pub mod fetcher;
/// Cell value rendering
pub mod formatter;
/// Core record types
pub mod types;
/// CSV output
pub mod writer;

// Re-export commonly used types
pub use config::{ColumnSchema, Config, OutputConfig, PaginationConfig, ServiceConfig};
pub use coordinator::{FetchOutcome, FetchReport, FetchStats, PaginationCoordinator};
pub use error::{Error, FetchError, FetchErrorKind, Result};
pub use export::{ExportSummary, Exporter};
pub use fetcher::{ArcGisFetcher, PageFetcher};
pub use formatter::{format_number, format_value};
pub use types::{FieldValue, Page, Record};
pub use writer::{WriteStats, write_csv, write_csv_file};

use tokio_util::sync::CancellationToken;

/// Run an export, cancelling it when the process receives a termination signal.
///
/// On Unix both SIGTERM and SIGINT cancel the run; elsewhere Ctrl+C does. If the signal
/// listener cannot be installed the run goes ahead uncancellable and a warning is logged.
///
/// # Errors
/// Returns [`Error::Cancelled`] if a signal arrives before the fetch phase completes, or any
/// error from [`Exporter::run`].
pub async fn run_until_signal(exporter: &Exporter) -> Result<ExportSummary> {
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                received = termination_signal() => match received {
                    Ok(name) => {
                        tracing::warn!(signal = name, "Termination signal received, cancelling export");
                        cancel.cancel();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Cannot listen for termination signals");
                        cancel.cancelled().await;
                    }
                },
                _ = cancel.cancelled() => {}
            }
        })
    };

    let result = exporter.run(cancel.clone()).await;

    // Release the signal watcher once the run is over
    cancel.cancel();
    watcher.await.ok();
    result
}

/// Wait for SIGTERM or SIGINT and name the one that arrived
#[cfg(unix)]
async fn termination_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        interrupted = tokio::signal::ctrl_c() => interrupted.map(|()| "SIGINT"),
    }
}

#[cfg(not(unix))]
async fn termination_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "Ctrl+C")
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    struct EmptyFetcher;

    #[async_trait]
    impl PageFetcher for EmptyFetcher {
        async fn fetch_page(
            &self,
            _offset: u64,
            _page_size: u64,
        ) -> std::result::Result<Page, FetchError> {
            Ok(Page::default())
        }
    }

    #[tokio::test]
    async fn run_until_signal_returns_when_export_finishes() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.pagination.max_pages = 3;
        config.output.dir = temp_dir.path().join("data");
        let exporter = Exporter::with_fetcher(config, Arc::new(EmptyFetcher)).unwrap();

        let summary = tokio::time::timeout(Duration::from_secs(5), run_until_signal(&exporter))
            .await
            .expect("signal watcher must not outlive the export")
            .unwrap();

        assert!(matches!(summary, ExportSummary::NothingRetrieved { .. }));
        assert_eq!(summary.fetch_stats().pages_dispatched, 3);
    }
}
