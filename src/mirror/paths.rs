//! Translation of remote paths into local mirror paths.

use std::path::{Path, PathBuf};

use super::TransferError;
use crate::remote::RemotePath;

/// Maps paths under a remote root onto the local mirror root.
///
/// `to_local(remote_root) == local_root`, and for any `P` under the remote
/// root `R`, `to_local(P) == local_root + P[len(R):]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
    remote_root: RemotePath,
    local_root: PathBuf,
}

impl PathMapper {
    /// Creates a mapper for one remote root / local root pair.
    #[must_use]
    pub fn new(remote_root: RemotePath, local_root: impl Into<PathBuf>) -> Self {
        Self {
            remote_root,
            local_root: local_root.into(),
        }
    }

    /// Returns the remote root.
    #[must_use]
    pub fn remote_root(&self) -> &RemotePath {
        &self.remote_root
    }

    /// Returns the local root.
    #[must_use]
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    /// Computes the local path for `remote`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::OutsideRoot`] if `remote` is not the remote
    /// root or one of its descendants.
    pub fn to_local(&self, remote: &RemotePath) -> Result<PathBuf, TransferError> {
        let relative = remote
            .strip_root(&self.remote_root)
            .ok_or_else(|| TransferError::outside_root(remote.as_str(), self.remote_root.as_str()))?;

        let mut local = self.local_root.clone();
        for component in relative.split('/').filter(|part| !part.is_empty()) {
            local.push(component);
        }
        Ok(local)
    }
}
