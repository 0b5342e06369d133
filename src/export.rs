//! One export run: fetch every page, then write the CSV

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::coordinator::{FetchOutcome, FetchStats, PaginationCoordinator};
use crate::error::{Error, Result};
use crate::fetcher::{ArcGisFetcher, PageFetcher};
use crate::writer::{WriteStats, write_csv_file};

/// What an export run produced
#[derive(Debug)]
pub enum ExportSummary {
    /// Records were fetched and written
    Written {
        /// File the table was written to
        path: PathBuf,
        /// Fetch phase statistics
        fetch: FetchStats,
        /// Write phase statistics
        write: WriteStats,
    },
    /// The service returned no records; no file was written
    NothingRetrieved {
        /// Fetch phase statistics
        fetch: FetchStats,
    },
}

impl ExportSummary {
    /// Fetch phase statistics regardless of outcome
    pub fn fetch_stats(&self) -> &FetchStats {
        match self {
            ExportSummary::Written { fetch, .. } | ExportSummary::NothingRetrieved { fetch } => {
                fetch
            }
        }
    }
}

/// Runs the fetch-then-write pipeline for one configuration
pub struct Exporter {
    config: Config,
    coordinator: PaginationCoordinator,
}

impl Exporter {
    /// Create an exporter querying the configured service over HTTP
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP client cannot be created
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = ArcGisFetcher::new(&config.service)?;
        Ok(Self::build(config, Arc::new(fetcher)))
    }

    /// Create an exporter over any page source
    ///
    /// # Errors
    /// Returns error if the configuration is invalid
    pub fn with_fetcher(config: Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, fetcher))
    }

    fn build(config: Config, fetcher: Arc<dyn PageFetcher>) -> Self {
        let coordinator = PaginationCoordinator::new(config.pagination.clone(), fetcher);
        Self {
            config,
            coordinator,
        }
    }

    /// Configuration in effect
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch all pages and write them to the configured output file
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] if `cancel` fires during the fetch phase, and
    /// [`Error::Sink`] (or another I/O error) if the output cannot be written.
    pub async fn run(&self, cancel: CancellationToken) -> Result<ExportSummary> {
        info!(
            url = %self.config.service.query_url,
            page_size = self.config.pagination.page_size,
            workers = self.config.pagination.workers,
            max_pages = self.config.pagination.max_pages,
            "Starting data fetch"
        );

        let report = match self.coordinator.run(cancel).await? {
            FetchOutcome::Records(report) => report,
            FetchOutcome::NothingRetrieved(fetch) => {
                warn!(
                    pages_failed = fetch.pages_failed,
                    "No data was retrieved from the service, nothing written"
                );
                return Ok(ExportSummary::NothingRetrieved { fetch });
            }
        };
        info!(records = report.records.len(), "Fetched records");

        let path = self.config.output.path();
        let schema = self.config.schema.clone();
        let records = report.records;
        let write_path = path.clone();
        // CSV writing is blocking file I/O
        let write = tokio::task::spawn_blocking(move || {
            write_csv_file(&write_path, &schema, &records)
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(format!("CSV writer task failed: {e}"))))??;

        info!(
            path = %path.display(),
            rows = write.rows_written,
            rows_skipped = write.rows_skipped,
            "Data saved"
        );

        Ok(ExportSummary::Written {
            path,
            fetch: report.stats,
            write,
        })
    }
}
