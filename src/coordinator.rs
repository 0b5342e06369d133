//! Pagination coordinator: a bounded worker pool over a fixed offset queue.
//!
//! A producer task feeds page offsets into a bounded channel; a fixed number of worker
//! tasks drain it, fetch each page, and keep successful records in a worker-local buffer.
//! Buffers are merged after every worker has been joined, so no lock guards the
//! collection itself. Failed pages are logged and dropped.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PaginationConfig;
use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;
use crate::types::Record;

/// Counters describing one fetch phase
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Offsets handed to workers
    pub pages_dispatched: u64,
    /// Pages that returned at least one record
    pub pages_with_records: u64,
    /// Pages that returned zero records
    pub pages_empty: u64,
    /// Pages whose fetch failed
    pub pages_failed: u64,
    /// Pages the service cut short of the requested size while flagging more rows
    ///
    /// Rows between the end of such a page and the next offset are never requested.
    pub pages_capped: u64,
    /// Records accumulated across all pages
    pub records: u64,
    /// Lowest offset that came back empty, where the service's data ends
    pub end_of_data_offset: Option<u64>,
    /// The last page allowed by the safety limit still returned records, or the service
    /// flagged more rows beyond it
    ///
    /// When set, the service may hold more rows than this run retrieved.
    pub limit_reached: bool,
}

impl FetchStats {
    fn absorb(&mut self, other: FetchStats) {
        self.pages_dispatched += other.pages_dispatched;
        self.pages_with_records += other.pages_with_records;
        self.pages_empty += other.pages_empty;
        self.pages_failed += other.pages_failed;
        self.pages_capped += other.pages_capped;
        self.records += other.records;
        self.end_of_data_offset = match (self.end_of_data_offset, other.end_of_data_offset) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.limit_reached |= other.limit_reached;
    }
}

/// Records retrieved by a fetch phase together with its statistics
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Merged records, in worker completion order
    pub records: Vec<Record>,
    /// Phase statistics
    pub stats: FetchStats,
}

/// Result of a completed fetch phase
#[derive(Debug)]
pub enum FetchOutcome {
    /// At least one record was retrieved
    Records(FetchReport),
    /// Every page was attempted and none produced a record
    NothingRetrieved(FetchStats),
}

/// Everything a worker returns when it exits
#[derive(Default)]
struct WorkerOutput {
    records: Vec<Record>,
    stats: FetchStats,
}

/// Drives the concurrent fetch phase
pub struct PaginationCoordinator {
    config: PaginationConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl PaginationCoordinator {
    /// Create a coordinator over `fetcher`
    pub fn new(config: PaginationConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Fetch every page up to the safety limit and merge the results
    ///
    /// Blocks until every dispatched offset has either been merged or logged as failed.
    ///
    /// # Errors
    /// Returns [`Error::Cancelled`] if `cancel` fires before all workers finish.
    pub async fn run(&self, cancel: CancellationToken) -> Result<FetchOutcome> {
        let workers = self.config.workers.max(1);
        let (offset_tx, offset_rx) = mpsc::channel::<u64>(workers);
        let offset_rx = Arc::new(Mutex::new(offset_rx));

        let producer = {
            let offsets = self.config.offsets();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                for offset in offsets {
                    tokio::select! {
                        sent = offset_tx.send(offset) => {
                            if sent.is_err() {
                                // All workers are gone
                                break;
                            }
                        }
                        _ = cancel.cancelled() => break,
                    }
                }
            })
        };

        let handles: Vec<_> = (0..workers)
            .map(|worker_id| {
                tokio::spawn(run_worker(WorkerParams {
                    worker_id,
                    offset_rx: Arc::clone(&offset_rx),
                    fetcher: Arc::clone(&self.fetcher),
                    page_size: self.config.page_size,
                    last_offset: self.config.last_offset(),
                    cancel: cancel.clone(),
                }))
            })
            .collect();

        let mut report = FetchReport::default();
        for (worker_id, joined) in join_all(handles).await.into_iter().enumerate() {
            match joined {
                Ok(output) => {
                    report.records.extend(output.records);
                    report.stats.absorb(output.stats);
                }
                Err(e) => {
                    error!(worker_id, error = %e, "Fetch worker panicked, its pages are lost");
                }
            }
        }

        if let Err(e) = producer.await {
            error!(error = %e, "Offset producer panicked");
        }

        if cancel.is_cancelled() {
            warn!(
                pages_dispatched = report.stats.pages_dispatched,
                records = report.stats.records,
                "Fetch cancelled"
            );
            return Err(Error::Cancelled);
        }

        let stats = &report.stats;
        info!(
            records = stats.records,
            pages_dispatched = stats.pages_dispatched,
            pages_empty = stats.pages_empty,
            pages_failed = stats.pages_failed,
            pages_capped = stats.pages_capped,
            end_of_data_offset = ?stats.end_of_data_offset,
            "Fetch phase complete"
        );
        if stats.pages_capped > 0 {
            warn!(
                pages_capped = stats.pages_capped,
                page_size = self.config.page_size,
                "Service capped pages below page_size, rows past each capped page were not requested"
            );
        }
        if stats.limit_reached {
            warn!(
                max_pages = self.config.max_pages,
                page_size = self.config.page_size,
                "Page limit reached while the service was still returning records, data may be truncated"
            );
        }

        if report.records.is_empty() {
            Ok(FetchOutcome::NothingRetrieved(report.stats))
        } else {
            Ok(FetchOutcome::Records(report))
        }
    }
}

struct WorkerParams {
    worker_id: usize,
    offset_rx: Arc<Mutex<mpsc::Receiver<u64>>>,
    fetcher: Arc<dyn PageFetcher>,
    page_size: u64,
    last_offset: Option<u64>,
    cancel: CancellationToken,
}

/// Pull offsets until the channel is drained or the run is cancelled
async fn run_worker(params: WorkerParams) -> WorkerOutput {
    let WorkerParams {
        worker_id,
        offset_rx,
        fetcher,
        page_size,
        last_offset,
        cancel,
    } = params;
    let mut output = WorkerOutput::default();

    loop {
        let next = tokio::select! {
            next = async { offset_rx.lock().await.recv().await } => next,
            _ = cancel.cancelled() => None,
        };
        let Some(offset) = next else {
            break;
        };
        output.stats.pages_dispatched += 1;

        let result = tokio::select! {
            result = fetcher.fetch_page(offset, page_size) => result,
            _ = cancel.cancelled() => break,
        };

        if let Ok(page) = &result
            && Some(offset) == last_offset
            && (!page.is_empty() || page.exceeded_transfer_limit)
        {
            output.stats.limit_reached = true;
        }

        match result {
            Ok(page) if page.is_empty() => {
                debug!(worker_id, offset, "Empty page, no more data at this offset");
                output.stats.pages_empty += 1;
                output.stats.end_of_data_offset = Some(
                    output
                        .stats
                        .end_of_data_offset
                        .map_or(offset, |seen| seen.min(offset)),
                );
            }
            Ok(page) => {
                debug!(worker_id, offset, records = page.len(), "Fetched page");
                if page.exceeded_transfer_limit && (page.len() as u64) < page_size {
                    warn!(
                        worker_id,
                        offset,
                        records = page.len(),
                        page_size,
                        "Page capped below the requested size by the service"
                    );
                    output.stats.pages_capped += 1;
                }
                output.stats.pages_with_records += 1;
                output.stats.records += page.len() as u64;
                output.records.extend(page.records);
            }
            Err(e) => {
                warn!(worker_id, offset = e.offset, error = %e.kind, "Error fetching page, skipping");
                output.stats.pages_failed += 1;
            }
        }
    }

    output
}
