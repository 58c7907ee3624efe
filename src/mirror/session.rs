//! Single-use connect → operate → disconnect handle.

use std::path::Path;

use tracing::debug;

use super::TransferError;
use crate::remote::{DirectoryEntry, RemoteClient, RemoteConnector, RemotePath};

/// One connection used for exactly one remote operation.
///
/// The operation methods consume the session, so it cannot be reused for a
/// second, unrelated operation. The connection is closed when the operation
/// returns; the `Drop` impl covers every other exit path (early return,
/// panic, or an attempt abandoned by the retry timeout).
pub struct TransferSession {
    client: Option<Box<dyn RemoteClient>>,
    endpoint: String,
}

impl TransferSession {
    /// Connects to the connector's endpoint.
    ///
    /// # Errors
    ///
    /// Returns the connector's error when the connection cannot be made.
    pub fn open(connector: &dyn RemoteConnector) -> Result<Self, TransferError> {
        let endpoint = connector.endpoint();
        let client = connector.connect()?;
        debug!(endpoint = %endpoint, "session opened");
        Ok(Self {
            client: Some(client),
            endpoint,
        })
    }

    /// Lists the immediate children of `path`, then disconnects.
    ///
    /// # Errors
    ///
    /// Propagates any listing failure; the connection is still released.
    pub fn list_directory(mut self, path: &RemotePath) -> Result<Vec<DirectoryEntry>, TransferError> {
        let result = self.client_mut()?.list(path);
        self.release();
        result
    }

    /// Downloads `files` into `destination`, then disconnects.
    ///
    /// Returns the number of files materialized locally.
    ///
    /// # Errors
    ///
    /// Propagates any transfer or verification failure; the connection is
    /// still released.
    pub fn download_batch(
        mut self,
        destination: &Path,
        files: &[RemotePath],
    ) -> Result<usize, TransferError> {
        let result = self.client_mut()?.download_files(destination, files);
        self.release();
        result
    }

    fn client_mut(&mut self) -> Result<&mut Box<dyn RemoteClient>, TransferError> {
        let endpoint = &self.endpoint;
        self.client
            .as_mut()
            .ok_or_else(|| TransferError::connect(endpoint.as_str(), "session already closed"))
    }

    fn release(&mut self) {
        if let Some(mut client) = self.client.take() {
            if let Err(error) = client.disconnect() {
                debug!(endpoint = %self.endpoint, error = %error, "disconnect failed");
            } else {
                debug!(endpoint = %self.endpoint, "session closed");
            }
        }
    }
}

impl Drop for TransferSession {
    fn drop(&mut self) {
        self.release();
    }
}
