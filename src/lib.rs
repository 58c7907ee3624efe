//! Sitemirror Core Library
//!
//! Mirrors a remote directory tree, reached over a connection-oriented
//! file-transfer protocol, onto local storage. Traversal is iterative,
//! files are downloaded in bounded batches over fresh connections, and every
//! network operation runs under a retry policy with exponential backoff and
//! a per-attempt timeout.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`mirror`] - Traversal, batching, retry and download dispatch
//! - [`remote`] - Remote capability traits plus FTP and local adapters
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sitemirror_core::{MirrorConfig, mirror_tree};
//! use sitemirror_core::remote::LocalConnector;
//!
//! # async fn run() -> Result<(), sitemirror_core::MirrorError> {
//! let config = MirrorConfig::new("/var/backups/site/wwwroot", "/");
//! let report = mirror_tree(Arc::new(LocalConnector::new("/mnt/site")), config).await?;
//! assert!(report.is_complete());
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod mirror;
pub mod remote;

// Re-export commonly used types
pub use mirror::{
    DEFAULT_MAX_RETRIES, DEFAULT_WORKERS, FailureType, Mirror, MirrorConfig, MirrorError,
    MirrorReport, MirrorStats, RetryDecision, RetryPolicy, ScheduleMode, TransferError,
    classify_error, mirror_tree,
};
pub use remote::{FtpConnector, FtpCredentials, LocalConnector, RemoteConnector, RemotePath};
