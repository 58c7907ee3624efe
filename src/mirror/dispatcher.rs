//! Execution of file batches, inline or from a queue.
//!
//! Every batch is downloaded in its own [`TransferSession`] under the run's
//! [`RetryPolicy`]. A batch that still fails after all retries is recorded
//! in [`MirrorStats`] and the run moves on to the next one.
//!
//! # Concurrency Model
//!
//! [`DownloadDispatcher::run`] drains a channel of batches with a bounded
//! worker pool:
//!
//! - A semaphore permit is acquired before starting each batch
//! - Each batch runs in its own spawned task
//! - Permits are released when a task completes (RAII), and a task only
//!   completes once its blocking download has returned
//! - Finished tasks are reaped while the queue is drained; the rest are
//!   joined before `run` returns

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use super::{FailedBatch, FileBatch, MirrorError, MirrorStats, RetryOutcome, RetryPolicy, TransferSession};
use crate::remote::{RemoteConnector, RemotePath};

/// Downloads batches and records their outcome.
pub struct DownloadDispatcher {
    connector: Arc<dyn RemoteConnector>,
    retry: RetryPolicy,
    stats: Arc<MirrorStats>,
}

impl DownloadDispatcher {
    /// Creates a dispatcher sharing the run's connector, policy and counters.
    #[must_use]
    pub fn new(connector: Arc<dyn RemoteConnector>, retry: RetryPolicy, stats: Arc<MirrorStats>) -> Self {
        Self {
            connector,
            retry,
            stats,
        }
    }

    /// Downloads one batch on the calling thread.
    ///
    /// Returns `true` if the batch was downloaded.
    pub fn dispatch_blocking(&self, batch: FileBatch) -> bool {
        let FileBatch {
            number,
            directory,
            destination,
            files,
        } = batch;
        let count = files.len();
        let connector = Arc::clone(&self.connector);
        let target = destination.clone();

        let outcome = self.retry.execute_blocking(&operation_label(number), move || {
            TransferSession::open(connector.as_ref())?.download_batch(&target, &files)
        });
        self.record(number, directory, destination, count, outcome)
    }

    /// Downloads one batch from the tokio blocking pool.
    ///
    /// Returns `true` if the batch was downloaded.
    pub async fn dispatch(&self, batch: FileBatch) -> bool {
        let FileBatch {
            number,
            directory,
            destination,
            files,
        } = batch;
        let count = files.len();
        let connector = Arc::clone(&self.connector);
        let target = destination.clone();

        let outcome = self
            .retry
            .execute_spawned(&operation_label(number), move || {
                TransferSession::open(connector.as_ref())?.download_batch(&target, &files)
            })
            .await;
        self.record(number, directory, destination, count, outcome)
    }

    /// Drains `batches` with at most `workers` concurrent downloads.
    ///
    /// Returns once the channel is closed and every spawned download has
    /// finished. Individual batch failures do not fail the run; they are
    /// recorded in the stats.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::SemaphoreClosed`] if the worker pool's
    /// semaphore is closed.
    #[instrument(skip(self, batches))]
    pub async fn run(
        self: Arc<Self>,
        mut batches: UnboundedReceiver<FileBatch>,
        workers: usize,
    ) -> Result<u64, MirrorError> {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut tasks = JoinSet::new();
        let mut downloaded = 0u64;

        while let Some(batch) = batches.recv().await {
            debug!(batch = batch.number, directory = %batch.directory, "dequeued batch");

            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|_| MirrorError::SemaphoreClosed)?;

            let dispatcher = Arc::clone(&self);
            tasks.spawn(async move {
                let _permit = permit;
                dispatcher.dispatch(batch).await
            });

            // Reap finished downloads so the set stays bounded by the pool.
            while let Some(joined) = tasks.try_join_next() {
                downloaded += tally(joined);
            }
        }

        debug!(task_count = tasks.len(), "waiting for batches to complete");

        while let Some(joined) = tasks.join_next().await {
            downloaded += tally(joined);
        }

        info!(downloaded, "download queue drained");
        Ok(downloaded)
    }

    fn record(
        &self,
        number: u64,
        directory: RemotePath,
        destination: PathBuf,
        count: usize,
        outcome: RetryOutcome<usize>,
    ) -> bool {
        match outcome.result {
            Ok(downloaded) => {
                info!(
                    batch = number,
                    destination = %destination.display(),
                    count = downloaded,
                    "downloaded batch"
                );
                self.stats.record_batch(downloaded, outcome.retries);
                true
            }
            Err(e) => {
                error!(
                    batch = number,
                    directory = %directory,
                    files = count,
                    error = %e,
                    "batch failed after all attempts"
                );
                self.stats.record_failed_batch(
                    FailedBatch {
                        number,
                        directory,
                        destination,
                        files: count,
                        error: e.to_string(),
                    },
                    outcome.retries,
                );
                false
            }
        }
    }
}

fn tally(joined: Result<bool, JoinError>) -> u64 {
    match joined {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(e) => {
            warn!(error = %e, "batch task panicked");
            0
        }
    }
}

fn operation_label(number: u64) -> String {
    format!("download batch {number}")
}
