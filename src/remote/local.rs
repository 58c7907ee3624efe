//! Adapter serving a locally mounted directory as the remote tree.
//!
//! Used for dry runs against a mounted share and as a deterministic remote
//! in tests. Remote path `/a/b` resolves to `<root>/a/b`.

use std::fs;
use std::path::{Path, PathBuf};

use super::{DirectoryEntry, RemoteClient, RemoteConnector, RemotePath};
use crate::mirror::TransferError;

#[derive(Debug, Clone)]
pub struct LocalConnector {
    root: PathBuf,
}

impl LocalConnector {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl RemoteConnector for LocalConnector {
    fn endpoint(&self) -> String {
        self.root.display().to_string()
    }

    fn connect(&self) -> Result<Box<dyn RemoteClient>, TransferError> {
        if !self.root.is_dir() {
            return Err(TransferError::connect(self.endpoint(), "source root is not a directory"));
        }
        Ok(Box::new(LocalClient {
            root: self.root.clone(),
        }))
    }
}

struct LocalClient {
    root: PathBuf,
}

impl LocalClient {
    fn resolve(&self, path: &RemotePath) -> PathBuf {
        let mut resolved = self.root.clone();
        for component in path.as_str().split('/').filter(|part| !part.is_empty()) {
            resolved.push(component);
        }
        resolved
    }
}

impl RemoteClient for LocalClient {
    fn list(&mut self, path: &RemotePath) -> Result<Vec<DirectoryEntry>, TransferError> {
        let source = self.resolve(path);
        let reader = fs::read_dir(&source).map_err(|e| TransferError::protocol(path.as_str(), e))?;

        let mut entries = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|e| TransferError::protocol(path.as_str(), e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| TransferError::protocol(path.as_str(), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();

            if file_type.is_dir() {
                entries.push(DirectoryEntry::directory(path, &name));
            } else if file_type.is_file() {
                entries.push(DirectoryEntry::file(path, &name));
            }
        }
        Ok(entries)
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
            let source = self.resolve(file);
            let expected = fs::metadata(&source)
                .map_err(|e| TransferError::protocol(file.as_str(), e))?
                .len();

            let target = destination.join(name);
            let copied = fs::copy(&source, &target).map_err(|e| TransferError::local_io(&target, e))?;
            if copied != expected {
                return Err(TransferError::verification(file.as_str(), expected, copied));
            }
        }
        Ok(files.len())
    }

    fn disconnect(&mut self) -> Result<(), TransferError> {
        Ok(())
    }
}
