//! FTP adapter over the `suppaftp` blocking client.

use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use suppaftp::list::File;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::debug;

use super::{DirectoryEntry, RemoteClient, RemoteConnector, RemotePath};
use crate::mirror::{DEFAULT_ATTEMPT_TIMEOUT, TransferError};

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Login details for one FTP server.
#[derive(Clone, PartialEq, Eq)]
pub struct FtpCredentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for FtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opens a fresh FTP control connection per session.
///
/// Connecting and every read or write on the control socket are bounded by
/// the I/O timeout, so a stalled server fails the call instead of holding
/// its session open.
#[derive(Debug, Clone)]
pub struct FtpConnector {
    credentials: FtpCredentials,
    io_timeout: Duration,
}

impl FtpConnector {
    #[must_use]
    pub fn new(credentials: FtpCredentials) -> Self {
        Self {
            credentials,
            io_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Sets the bound for connecting and for each control-socket read or
    /// write. A zero duration keeps the current value.
    #[must_use]
    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        if !io_timeout.is_zero() {
            self.io_timeout = io_timeout;
        }
        self
    }

    #[must_use]
    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    fn open_stream(&self, endpoint: &str) -> Result<FtpStream, TransferError> {
        let addresses: Vec<SocketAddr> = (self.credentials.host.as_str(), self.credentials.port)
            .to_socket_addrs()
            .map_err(|e| TransferError::connect(endpoint, e))?
            .collect();

        let mut last_error = None;
        for address in addresses {
            match FtpStream::connect_timeout(address, self.io_timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(%address, error = %e, "FTP address unreachable");
                    last_error = Some(e);
                }
            }
        }
        Err(match last_error {
            Some(e) => TransferError::connect(endpoint, e),
            None => TransferError::connect(endpoint, "host name resolved to no address"),
        })
    }
}

impl RemoteConnector for FtpConnector {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.credentials.host, self.credentials.port)
    }

    fn connect(&self) -> Result<Box<dyn RemoteClient>, TransferError> {
        let endpoint = self.endpoint();
        let mut stream = self.open_stream(&endpoint)?;

        let socket = stream.get_ref();
        socket
            .set_read_timeout(Some(self.io_timeout))
            .and_then(|()| socket.set_write_timeout(Some(self.io_timeout)))
            .map_err(|e| TransferError::connect(endpoint.as_str(), e))?;

        let FtpCredentials { user, password, .. } = &self.credentials;
        stream
            .login(user.as_str(), password.as_str())
            .map_err(|e| TransferError::connect(endpoint.as_str(), e))?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| TransferError::connect(endpoint.as_str(), e))?;

        Ok(Box::new(FtpClient { stream }))
    }
}

struct FtpClient {
    stream: FtpStream,
}

impl RemoteClient for FtpClient {
    fn list(&mut self, path: &RemotePath) -> Result<Vec<DirectoryEntry>, TransferError> {
        let lines = self
            .stream
            .list(Some(path.as_str()))
            .map_err(|e| TransferError::protocol(path.as_str(), e))?;
        Ok(parse_listing(path, &lines))
    }

    fn download_files(
        &mut self,
        destination: &Path,
        files: &[RemotePath],
    ) -> Result<usize, TransferError> {
        for file in files {
            let name = file
                .file_name()
                .ok_or_else(|| TransferError::protocol(file.as_str(), "not a file path"))?;
            // SIZE is optional; servers without it skip verification.
            let expected = self
                .stream
                .size(file.as_str())
                .ok()
                .and_then(|size| u64::try_from(size).ok());

            let target = destination.join(name);
            let created = fs::File::create(&target).map_err(|e| TransferError::local_io(&target, e))?;
            let mut writer = BufWriter::new(created);

            let copied = self
                .stream
                .retr(file.as_str(), |reader| {
                    stream_to(reader, &mut writer).map_err(FtpError::ConnectionError)
                })
                .map_err(|e| TransferError::protocol(file.as_str(), e))?;

            if let Some(expected) = expected {
                verify_size(file, expected, copied)?;
            }
        }
        Ok(files.len())
    }

    fn disconnect(&mut self) -> Result<(), TransferError> {
        self.stream
            .quit()
            .map_err(|e| TransferError::protocol("QUIT", e))
    }
}

/// Converts raw `LIST` lines (Unix or DOS format) into entries below
/// `parent`.
///
/// `.`, `..`, symlinks and lines the parser does not understand are
/// skipped.
fn parse_listing(parent: &RemotePath, lines: &[String]) -> Vec<DirectoryEntry> {
    lines
        .iter()
        .filter_map(|line| match File::from_str(line) {
            Ok(file) => Some(file),
            Err(e) => {
                debug!(line = %line, error = ?e, "skipping unparseable listing line");
                None
            }
        })
        .filter(|file| !matches!(file.name(), "." | ".."))
        .filter_map(|file| {
            if file.is_directory() {
                Some(DirectoryEntry::directory(parent, file.name()))
            } else if file.is_file() {
                Some(DirectoryEntry::file(parent, file.name()))
            } else {
                None
            }
        })
        .collect()
}

/// Copies the data channel into `writer` and returns the bytes copied.
fn stream_to(reader: &mut dyn Read, writer: &mut impl Write) -> io::Result<u64> {
    let copied = io::copy(reader, writer)?;
    writer.flush()?;
    Ok(copied)
}

fn verify_size(file: &RemotePath, expected: u64, actual: u64) -> Result<(), TransferError> {
    if expected == actual {
        Ok(())
    } else {
        Err(TransferError::verification(file.as_str(), expected, actual))
    }
}
