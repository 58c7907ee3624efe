//! Error types for the mirror module.
//!
//! [`TransferError`] covers one network unit of work (a listing or a batch
//! download) and is what the retry policy inspects. [`MirrorError`] covers
//! failures of the run as a whole.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors from a single remote operation.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Could not establish or authenticate a connection.
    #[error("connect to {endpoint} failed: {message}")]
    Connect {
        /// Endpoint label (host:port or local source root).
        endpoint: String,
        /// Underlying failure text.
        message: String,
    },

    /// The remote end failed a listing or transfer command.
    #[error("remote operation on {path} failed: {message}")]
    Protocol {
        /// Remote path the command targeted.
        path: String,
        /// Underlying failure text.
        message: String,
    },

    /// A downloaded file does not match the size the server reported.
    #[error("verification failed for {path}: expected {expected_bytes} bytes, got {actual_bytes}")]
    Verification {
        /// Remote path of the file.
        path: String,
        /// Size reported by the server.
        expected_bytes: u64,
        /// Size written locally.
        actual_bytes: u64,
    },

    /// Local filesystem error while materializing a download.
    #[error("IO error at {path}: {source}")]
    LocalIo {
        /// Local path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The attempt exceeded the per-attempt timeout and was abandoned.
    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout {
        /// Operation label, e.g. `list /site/wwwroot`.
        operation: String,
        /// The timeout that fired.
        after: Duration,
    },

    /// The attempt ended without producing a result (worker panic).
    #[error("{operation} aborted before completing")]
    Aborted {
        /// Operation label.
        operation: String,
    },

    /// A remote path lies outside the configured remote root.
    #[error("remote path {path} is outside the mirrored root {root}")]
    OutsideRoot {
        /// The offending remote path.
        path: String,
        /// The configured remote root.
        root: String,
    },
}

impl TransferError {
    /// Creates a connection error.
    pub fn connect(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    /// Creates a protocol error for a remote path.
    pub fn protocol(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Protocol {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Creates a size-verification error.
    pub fn verification(path: impl Into<String>, expected_bytes: u64, actual_bytes: u64) -> Self {
        Self::Verification {
            path: path.into(),
            expected_bytes,
            actual_bytes,
        }
    }

    /// Creates a local IO error.
    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Creates an aborted-attempt error.
    pub fn aborted(operation: impl Into<String>) -> Self {
        Self::Aborted {
            operation: operation.into(),
        }
    }

    /// Creates an outside-root error.
    pub fn outside_root(path: impl Into<String>, root: impl Into<String>) -> Self {
        Self::OutsideRoot {
            path: path.into(),
            root: root.into(),
        }
    }
}

/// Errors that stop a mirror run before or while it executes.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// A configuration value is out of range.
    #[error("invalid mirror configuration: {0}")]
    InvalidConfig(String),

    /// The local root would wipe a filesystem root.
    #[error("refusing to replace {path}: local root must not be a filesystem root")]
    UnsafeLocalRoot {
        /// The rejected local root.
        path: PathBuf,
    },

    /// The local root could not be removed or recreated.
    #[error("could not prepare local root {path}: {source}")]
    PrepareLocalRoot {
        /// The local root.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The download worker pool's semaphore was closed unexpectedly.
    #[error("download worker pool closed unexpectedly")]
    SemaphoreClosed,

    /// A traversal or download task panicked or was cancelled.
    #[error("mirror task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_display() {
        let error = TransferError::connect("ftp.example.com:21", "connection refused");
        let msg = error.to_string();
        assert!(msg.contains("ftp.example.com:21"), "Expected endpoint in: {msg}");
        assert!(msg.contains("connection refused"), "Expected cause in: {msg}");
    }

    #[test]
    fn test_protocol_error_display() {
        let error = TransferError::protocol("/site/wwwroot", "550 no such directory");
        let msg = error.to_string();
        assert!(msg.contains("/site/wwwroot"), "Expected path in: {msg}");
        assert!(msg.contains("550"), "Expected reply in: {msg}");
    }

    #[test]
    fn test_verification_error_display() {
        let error = TransferError::verification("/a/b.png", 10, 7);
        let msg = error.to_string();
        assert!(msg.contains("expected 10 bytes, got 7"), "Unexpected: {msg}");
    }

    #[test]
    fn test_timeout_error_display() {
        let error = TransferError::timeout("list /a", Duration::from_secs(300));
        let msg = error.to_string();
        assert!(msg.contains("list /a"), "Expected operation in: {msg}");
        assert!(msg.contains("300s"), "Expected timeout in: {msg}");
    }

    #[test]
    fn test_local_io_error_keeps_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = TransferError::local_io("/tmp/x", io_err);
        assert!(error.source().is_some());
        assert!(error.to_string().contains("/tmp/x"));
    }

    #[test]
    fn test_unsafe_local_root_display() {
        let error = MirrorError::UnsafeLocalRoot {
            path: PathBuf::from("/"),
        };
        assert!(error.to_string().contains("filesystem root"));
    }
}
