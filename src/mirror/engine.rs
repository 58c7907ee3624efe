//! Entry point tying traversal and downloads together.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use super::{DownloadDispatcher, MirrorConfig, MirrorError, MirrorReport, MirrorStats, ScheduleMode, TreeWalker};
use crate::remote::RemoteConnector;

/// One configured mirror run.
///
/// Construct with [`Mirror::new`], grab [`Mirror::stats`] if you want to
/// display progress, then [`run`](Mirror::run) it.
pub struct Mirror {
    connector: Arc<dyn RemoteConnector>,
    config: MirrorConfig,
    stats: Arc<MirrorStats>,
}

impl Mirror {
    /// Validates `config` and prepares a run against `connector`.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::InvalidConfig`] if a configuration value is out
    /// of range.
    pub fn new(connector: Arc<dyn RemoteConnector>, config: MirrorConfig) -> Result<Self, MirrorError> {
        config.validate()?;
        Ok(Self {
            connector,
            config,
            stats: Arc::new(MirrorStats::new()),
        })
    }

    /// Live counters, updated while the run progresses.
    #[must_use]
    pub fn stats(&self) -> Arc<MirrorStats> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Mirrors the remote tree and returns the run summary.
    ///
    /// Unit failures (a directory that cannot be listed, a batch that cannot
    /// be downloaded) do not fail the run; inspect
    /// [`MirrorReport::is_complete`].
    ///
    /// # Errors
    ///
    /// Returns an error if the local root cannot be prepared or a run task
    /// fails.
    #[instrument(
        skip(self),
        fields(
            endpoint = %self.connector.endpoint(),
            remote_root = %self.config.remote_root(),
            local_root = %self.config.local_root().display(),
        )
    )]
    pub async fn run(self) -> Result<MirrorReport, MirrorError> {
        let started = Instant::now();
        let dispatcher = DownloadDispatcher::new(
            Arc::clone(&self.connector),
            self.config.retry_policy().clone(),
            Arc::clone(&self.stats),
        );
        let mut walker = TreeWalker::new(
            Arc::clone(&self.connector),
            &self.config,
            Arc::clone(&self.stats),
        );

        let walker = match self.config.mode() {
            ScheduleMode::Sequential => {
                info!("mirroring sequentially");
                tokio::task::spawn_blocking(move || {
                    walker.walk_blocking(&dispatcher)?;
                    Ok::<_, MirrorError>(walker)
                })
                .await??
            }
            ScheduleMode::Parallel { workers } => {
                info!(workers, "mirroring with parallel downloads");
                walker.walk(Arc::new(dispatcher), workers).await?;
                walker
            }
        };

        let report = self.stats.snapshot(walker.pending(), started.elapsed());
        if report.is_complete() {
            info!(
                directories = report.directories_listed,
                files = report.files_downloaded,
                batches = report.batches_completed,
                retries = report.retries,
                elapsed_ms = report.elapsed_ms,
                "mirror complete"
            );
        } else {
            warn!(
                directories = report.directories_listed,
                files = report.files_downloaded,
                failed_directories = report.failed_directories.len(),
                failed_batches = report.failed_batches.len(),
                elapsed_ms = report.elapsed_ms,
                "mirror finished with failures"
            );
        }
        Ok(report)
    }
}

/// Mirrors the remote tree described by `config` and waits for completion.
///
/// # Errors
///
/// See [`Mirror::new`] and [`Mirror::run`].
pub async fn mirror_tree(
    connector: Arc<dyn RemoteConnector>,
    config: MirrorConfig,
) -> Result<MirrorReport, MirrorError> {
    Mirror::new(connector, config)?.run().await
}
