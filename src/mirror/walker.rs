//! Stack-based traversal of the remote tree.
//!
//! The walker owns the [`WorkStack`] and the processed-directory count for
//! one run and moves through [`WalkState`]:
//!
//! ```text
//! Idle ──begin──▶ Traversing ──stack empty / ceiling──▶ Done            (sequential)
//!                 Traversing ──stack empty / ceiling──▶ Draining ──▶ Done (parallel)
//! ```
//!
//! Each popped directory is created locally, listed in a fresh session
//! under the retry policy, its subdirectories pushed and its files batched.
//! A directory that cannot be created or listed is recorded as failed and
//! its subtree is skipped; traversal continues with the rest of the stack.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{
    Batcher, DownloadDispatcher, FailedDirectory, FileBatch, MirrorConfig, MirrorError,
    MirrorStats, PathMapper, RetryOutcome, RetryPolicy, TransferError, TransferSession, WorkStack,
};
use crate::remote::{DirectoryEntry, EntryKind, RemoteConnector, RemotePath};

/// Lifecycle of a traversal run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    /// Created, nothing touched yet.
    Idle,
    /// Popping and listing directories.
    Traversing,
    /// Traversal finished; queued batches are still downloading.
    Draining,
    /// Traversal and downloads finished.
    Done,
}

/// Walks the remote tree rooted at the configured remote root.
pub struct TreeWalker {
    connector: Arc<dyn RemoteConnector>,
    mapper: PathMapper,
    retry: RetryPolicy,
    ceiling: Option<usize>,
    batch_size: usize,
    batcher: Batcher,
    stack: WorkStack,
    processed: usize,
    state: WalkState,
    stats: Arc<MirrorStats>,
}

impl TreeWalker {
    #[must_use]
    pub fn new(connector: Arc<dyn RemoteConnector>, config: &MirrorConfig, stats: Arc<MirrorStats>) -> Self {
        Self {
            connector,
            mapper: PathMapper::new(config.remote_root().clone(), config.local_root()),
            retry: config.retry_policy().clone(),
            ceiling: config.folder_ceiling(),
            batch_size: config.batch_size(),
            batcher: Batcher::new(config.batch_size()),
            stack: WorkStack::new(),
            processed: 0,
            state: WalkState::Idle,
            stats,
        }
    }

    #[must_use]
    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Directories popped so far in the current run.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Directories still on the stack; after a run halted by the folder
    /// ceiling these are the abandoned ones.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.stack.len()
    }

    /// Batches issued so far in the current run.
    #[must_use]
    pub fn batches_issued(&self) -> u64 {
        self.batcher.issued()
    }

    /// Traverses the tree, downloading each batch inline before the next
    /// directory is popped.
    ///
    /// # Errors
    ///
    /// Returns an error only when the local root cannot be prepared.
    /// Directory and batch failures are recorded in the stats.
    pub fn walk_blocking(&mut self, dispatcher: &DownloadDispatcher) -> Result<(), MirrorError> {
        self.begin()?;

        while let Some((directory, local)) = self.next_directory() {
            let outcome = self.list_blocking(&directory);
            self.absorb_listing(&directory, &local, outcome, |batch| {
                dispatcher.dispatch_blocking(batch);
            });
        }

        self.finish();
        Ok(())
    }

    /// Traverses the tree while `dispatcher` downloads the discovered
    /// batches with up to `workers` concurrent sessions.
    ///
    /// Returns after traversal has finished and the download queue has been
    /// drained.
    ///
    /// # Errors
    ///
    /// Returns an error when the local root cannot be prepared or the
    /// dispatcher task fails. Directory and batch failures are recorded in
    /// the stats.
    pub async fn walk(&mut self, dispatcher: Arc<DownloadDispatcher>, workers: usize) -> Result<(), MirrorError> {
        self.begin()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let drain = tokio::spawn(dispatcher.run(rx, workers));

        while let Some((directory, local)) = self.next_directory() {
            let outcome = self.list(&directory).await;
            self.absorb_listing(&directory, &local, outcome, |batch| {
                if let Err(unsent) = tx.send(batch) {
                    warn!(batch = unsent.0.number, "download queue closed; batch dropped");
                }
            });
        }

        drop(tx);
        self.state = WalkState::Draining;
        debug!(queued = self.batcher.issued(), "traversal finished, draining downloads");

        drain.await??;
        self.finish();
        Ok(())
    }

    /// Idle → Traversing: reset the run state, seed the stack, and replace
    /// the local root with an empty directory.
    fn begin(&mut self) -> Result<(), MirrorError> {
        prepare_local_root(self.mapper.local_root())?;

        self.stack = WorkStack::new();
        self.batcher = Batcher::new(self.batch_size);
        self.processed = 0;
        self.stack.push(self.mapper.remote_root().clone());
        self.state = WalkState::Traversing;

        info!(
            remote_root = %self.mapper.remote_root(),
            local_root = %self.mapper.local_root().display(),
            ceiling = ?self.ceiling,
            "traversal started"
        );
        Ok(())
    }

    fn finish(&mut self) {
        if !self.stack.is_empty() {
            info!(
                processed = self.processed,
                abandoned = self.stack.len(),
                "folder ceiling reached, remaining directories skipped"
            );
        }
        self.state = WalkState::Done;
        debug!(processed = self.processed, batches = self.batcher.issued(), "traversal done");
    }

    fn ceiling_reached(&self) -> bool {
        self.ceiling.is_some_and(|ceiling| self.processed >= ceiling)
    }

    /// Pops the next directory and materializes its local counterpart.
    ///
    /// Directories whose local path cannot be created are recorded as
    /// failed and skipped.
    fn next_directory(&mut self) -> Option<(RemotePath, PathBuf)> {
        loop {
            if self.ceiling_reached() {
                return None;
            }
            let directory = self.stack.pop()?;
            self.processed += 1;

            info!(
                path = %directory,
                processed = self.processed,
                pending = self.stack.len(),
                "mirroring directory"
            );

            match self.create_local(&directory) {
                Ok(local) => return Some((directory, local)),
                Err(e) => self.fail_directory(directory, &e, 0),
            }
        }
    }

    fn create_local(&self, directory: &RemotePath) -> Result<PathBuf, TransferError> {
        let local = self.mapper.to_local(directory)?;
        // create_dir_all treats an existing directory as success.
        fs::create_dir_all(&local).map_err(|e| TransferError::local_io(&local, e))?;
        Ok(local)
    }

    fn list_blocking(&self, directory: &RemotePath) -> RetryOutcome<Vec<DirectoryEntry>> {
        let connector = Arc::clone(&self.connector);
        let path = directory.clone();
        self.retry
            .execute_blocking(&list_label(directory), move || {
                TransferSession::open(connector.as_ref())?.list_directory(&path)
            })
    }

    async fn list(&self, directory: &RemotePath) -> RetryOutcome<Vec<DirectoryEntry>> {
        let connector = Arc::clone(&self.connector);
        let path = directory.clone();
        self.retry
            .execute_spawned(&list_label(directory), move || {
                TransferSession::open(connector.as_ref())?.list_directory(&path)
            })
            .await
    }

    /// Pushes unseen subdirectories and routes the directory's files, in
    /// batches, to `route`.
    fn absorb_listing(
        &mut self,
        directory: &RemotePath,
        local: &Path,
        outcome: RetryOutcome<Vec<DirectoryEntry>>,
        mut route: impl FnMut(FileBatch),
    ) {
        let entries = match outcome.result {
            Ok(entries) => entries,
            Err(e) => {
                self.fail_directory(directory.clone(), &e, outcome.retries);
                return;
            }
        };
        self.stats.record_listing(outcome.retries);

        let mut files = Vec::new();
        let mut subdirectories = 0usize;
        for entry in entries {
            match entry.kind {
                EntryKind::Directory => {
                    if self.stack.push(entry.path) {
                        subdirectories += 1;
                    }
                }
                EntryKind::File => files.push(entry.path),
            }
        }

        debug!(
            path = %directory,
            subdirectories,
            files = files.len(),
            "listed directory"
        );

        for batch in self.batcher.batches(directory, local, files) {
            self.stats.record_queued();
            route(batch);
        }
    }

    fn fail_directory(&self, directory: RemotePath, e: &TransferError, retries: u32) {
        error!(path = %directory, error = %e, "directory skipped, subtree not mirrored");
        self.stats.record_failed_directory(
            FailedDirectory {
                path: directory,
                error: e.to_string(),
            },
            retries,
        );
    }
}

fn list_label(directory: &RemotePath) -> String {
    format!("list {directory}")
}

/// Deletes `local_root` if present and recreates it empty.
fn prepare_local_root(local_root: &Path) -> Result<(), MirrorError> {
    if local_root.parent().is_none() {
        return Err(MirrorError::UnsafeLocalRoot {
            path: local_root.to_path_buf(),
        });
    }

    let prepare_error = |source| MirrorError::PrepareLocalRoot {
        path: local_root.to_path_buf(),
        source,
    };

    match fs::remove_dir_all(local_root) {
        Ok(()) => debug!(path = %local_root.display(), "removed previous mirror"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(prepare_error(e)),
    }
    fs::create_dir_all(local_root).map_err(prepare_error)
}
