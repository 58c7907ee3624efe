//! Remote file-transfer capability consumed by the mirror engine.
//!
//! The engine never speaks a wire protocol itself. It relies on the
//! capability set {connect, list-directory, download-batch, disconnect},
//! expressed here as two traits:
//!
//! - [`RemoteConnector`] - factory that opens one connection per call
//! - [`RemoteClient`] - a live connection serving list/download calls
//!
//! Two adapters are provided:
//!
//! - [`FtpConnector`] - FTP servers via the `suppaftp` blocking client
//! - [`LocalConnector`] - a locally mounted tree (dry runs and tests)
//!
//! All calls are blocking. The async engine drives them from tokio's
//! blocking pool so one slow server never stalls the runtime.

mod ftp;
mod local;

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::mirror::TransferError;

pub use ftp::{DEFAULT_FTP_PORT, FtpConnector, FtpCredentials};
pub use local::LocalConnector;

/// Absolute, `/`-separated path on the remote tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RemotePath(String);

impl RemotePath {
    /// Creates a remote path, normalizing a missing leading `/` and any
    /// trailing `/` (except for the root itself).
    pub fn new(path: impl Into<String>) -> Self {
        let raw = path.into();
        let trimmed = raw.trim_end_matches('/');
        if trimmed.is_empty() {
            return Self("/".to_string());
        }
        if trimmed.starts_with('/') {
            Self(trimmed.to_string())
        } else {
            Self(format!("/{trimmed}"))
        }
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the remote filesystem root `/`.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Appends one child name to this path.
    #[must_use]
    pub fn join(&self, name: &str) -> Self {
        let name = name.trim_matches('/');
        if self.is_root() {
            Self(format!("/{name}"))
        } else {
            Self(format!("{}/{name}", self.0))
        }
    }

    /// Returns the final path component, or `None` for the root.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Returns the part of this path below `root`, including its leading `/`.
    ///
    /// Returns `Some("")` when the path equals `root` and `None` when the
    /// path is not inside `root`. The check is component-aware, so
    /// `/site/www2` is not inside `/site/www`.
    #[must_use]
    pub fn strip_root(&self, root: &RemotePath) -> Option<&str> {
        if root.is_root() {
            return Some(if self.is_root() { "" } else { &self.0 });
        }
        let rest = self.0.strip_prefix(root.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    /// Returns `true` if this path is `root` or one of its descendants.
    #[must_use]
    pub fn is_within(&self, root: &RemotePath) -> bool {
        self.strip_root(root).is_some()
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemotePath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RemotePath {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Kind of an object returned by a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Bare name of the entry.
    pub name: String,
    /// Full remote path of the entry.
    pub path: RemotePath,
    /// Whether the entry is a directory or a regular file.
    pub kind: EntryKind,
}

impl DirectoryEntry {
    /// Creates a directory entry below `parent`.
    #[must_use]
    pub fn directory(parent: &RemotePath, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: parent.join(name),
            kind: EntryKind::Directory,
        }
    }

    /// Creates a file entry below `parent`.
    #[must_use]
    pub fn file(parent: &RemotePath, name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: parent.join(name),
            kind: EntryKind::File,
        }
    }
}

/// Opens connections to one remote endpoint.
///
/// Implementations must be cheap to share across threads; every call to
/// [`connect`](RemoteConnector::connect) yields an independent connection
/// so concurrent operations never share one.
pub trait RemoteConnector: Send + Sync {
    /// Human-readable endpoint label for logs (host, path, ...).
    fn endpoint(&self) -> String;

    /// Establishes a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::Connect`] if the endpoint is unreachable or
    /// rejects the credentials.
    fn connect(&self) -> Result<Box<dyn RemoteClient>, TransferError>;
}

/// A live connection to the remote endpoint.
pub trait RemoteClient: Send {
    /// Lists the immediate children of `path` (non-recursive, unordered).
    ///
    /// # Errors
    ///
    /// Returns an error on any network or protocol failure.
    fn list(&mut self, path: &RemotePath) -> Result<Vec<DirectoryEntry>, TransferError>;

    /// Downloads `files` into the local `destination` directory, overwriting
    /// existing files, and returns how many files were materialized.
    ///
    /// # Errors
    ///
    /// Returns an error on transfer or verification failure; the whole batch
    /// is then considered failed.
    fn download_files(
        &mut self,
        destination: &Path,
        files: &[RemotePath],
    ) -> Result<usize, TransferError>;

    /// Tears down the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote end rejects the goodbye; callers treat
    /// this as informational.
    fn disconnect(&mut self) -> Result<(), TransferError>;
}
