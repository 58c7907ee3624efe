//! Directory-tree mirroring engine.
//!
//! This module provides:
//! - Stack-based traversal of a remote tree ([`TreeWalker`])
//! - Remote-to-local path translation ([`PathMapper`])
//! - Bounded batching of discovered files ([`Batcher`], [`chunk`])
//! - Retry with exponential backoff and a per-attempt timeout ([`RetryPolicy`])
//! - Single-use connections ([`TransferSession`])
//! - Inline or queued batch execution ([`DownloadDispatcher`])
//!
//! Most callers only need [`mirror_tree`] or [`Mirror`].

mod batch;
mod config;
mod dispatcher;
mod engine;
mod error;
mod paths;
mod report;
mod retry;
mod session;
mod stack;
mod walker;

pub use batch::{Batcher, Chunks, DEFAULT_BATCH_SIZE, FileBatch, chunk};
pub use config::{DEFAULT_WORKERS, MAX_BATCH_SIZE, MAX_WORKERS, MirrorConfig, ScheduleMode};
pub use dispatcher::DownloadDispatcher;
pub use engine::{Mirror, mirror_tree};
pub use error::{MirrorError, TransferError};
pub use paths::PathMapper;
pub use report::{FailedBatch, FailedDirectory, MirrorReport, MirrorStats};
pub use retry::{
    DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES, FailureType, RetryDecision,
    RetryOutcome, RetryPolicy, classify_error,
};
pub use session::TransferSession;
pub use stack::WorkStack;
pub use walker::{TreeWalker, WalkState};
