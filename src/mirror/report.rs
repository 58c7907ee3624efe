//! Live counters and the final summary of a mirror run.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;

use crate::remote::RemotePath;

/// Counters updated while a mirror runs.
///
/// Uses atomics so the traversal, every download task, and a progress
/// display can share one instance.
#[derive(Debug, Default)]
pub struct MirrorStats {
    directories_listed: AtomicUsize,
    batches_queued: AtomicU64,
    batches_completed: AtomicU64,
    files_downloaded: AtomicUsize,
    retries: AtomicU64,
    failures: Mutex<Failures>,
}

#[derive(Debug, Default)]
struct Failures {
    directories: Vec<FailedDirectory>,
    batches: Vec<FailedBatch>,
}

impl MirrorStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories listed successfully.
    #[must_use]
    pub fn directories_listed(&self) -> usize {
        self.directories_listed.load(Ordering::SeqCst)
    }

    /// Batches handed to the dispatcher.
    #[must_use]
    pub fn batches_queued(&self) -> u64 {
        self.batches_queued.load(Ordering::SeqCst)
    }

    /// Batches downloaded successfully.
    #[must_use]
    pub fn batches_completed(&self) -> u64 {
        self.batches_completed.load(Ordering::SeqCst)
    }

    /// Files materialized locally.
    #[must_use]
    pub fn files_downloaded(&self) -> usize {
        self.files_downloaded.load(Ordering::SeqCst)
    }

    /// Retries performed across all operations.
    #[must_use]
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::SeqCst)
    }

    /// Units (directories plus batches) that failed after all retries.
    #[must_use]
    pub fn failed_units(&self) -> usize {
        self.with_failures(|f| f.directories.len() + f.batches.len())
    }

    pub(crate) fn record_listing(&self, retries: u32) {
        self.directories_listed.fetch_add(1, Ordering::SeqCst);
        self.add_retries(retries);
    }

    pub(crate) fn record_queued(&self) {
        self.batches_queued.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_batch(&self, files: usize, retries: u32) {
        self.batches_completed.fetch_add(1, Ordering::SeqCst);
        self.files_downloaded.fetch_add(files, Ordering::SeqCst);
        self.add_retries(retries);
    }

    pub(crate) fn record_failed_directory(&self, failure: FailedDirectory, retries: u32) {
        self.add_retries(retries);
        self.with_failures(|f| f.directories.push(failure));
    }

    pub(crate) fn record_failed_batch(&self, failure: FailedBatch, retries: u32) {
        self.add_retries(retries);
        self.with_failures(|f| f.batches.push(failure));
    }

    fn add_retries(&self, retries: u32) {
        self.retries.fetch_add(u64::from(retries), Ordering::SeqCst);
    }

    fn with_failures<R>(&self, f: impl FnOnce(&mut Failures) -> R) -> R {
        // A poisoned lock only means another task panicked mid-push; the
        // vectors are still valid.
        let mut guard = self
            .failures
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }

    /// Builds the final report from the current counters.
    #[must_use]
    pub fn snapshot(&self, abandoned_directories: usize, elapsed: Duration) -> MirrorReport {
        let (mut failed_directories, mut failed_batches) =
            self.with_failures(|f| (f.directories.clone(), f.batches.clone()));
        failed_directories.sort_by(|a, b| a.path.cmp(&b.path));
        failed_batches.sort_by_key(|batch| batch.number);

        MirrorReport {
            directories_listed: self.directories_listed(),
            batches_completed: self.batches_completed(),
            files_downloaded: self.files_downloaded(),
            retries: self.retries(),
            abandoned_directories,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            failed_directories,
            failed_batches,
        }
    }
}

/// A directory that could not be prepared or listed; its subtree is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDirectory {
    pub path: RemotePath,
    pub error: String,
}

/// A batch that could not be downloaded after all retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedBatch {
    pub number: u64,
    pub directory: RemotePath,
    pub destination: PathBuf,
    pub files: usize,
    pub error: String,
}

/// Final summary of a mirror run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorReport {
    pub directories_listed: usize,
    pub batches_completed: u64,
    pub files_downloaded: usize,
    pub retries: u64,
    /// Directories discovered but never listed because the folder ceiling
    /// was reached.
    pub abandoned_directories: usize,
    pub elapsed_ms: u64,
    pub failed_directories: Vec<FailedDirectory>,
    pub failed_batches: Vec<FailedBatch>,
}

impl MirrorReport {
    /// `true` when no directory or batch failed.
    ///
    /// A run halted by the folder ceiling still counts as complete.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_directories.is_empty() && self.failed_batches.is_empty()
    }

    /// Number of failed units (directories plus batches).
    #[must_use]
    pub fn failed_units(&self) -> usize {
        self.failed_directories.len() + self.failed_batches.len()
    }

    /// Remote directories whose local copy is missing or incomplete.
    #[must_use]
    pub fn partial_directories(&self) -> BTreeSet<&RemotePath> {
        self.failed_directories
            .iter()
            .map(|failure| &failure.path)
            .chain(self.failed_batches.iter().map(|failure| &failure.directory))
            .collect()
    }
}
