//! Shared utilities for integration tests.
//!
//! [`FakeRemote`] is an in-memory remote tree with fault injection (failing
//! or stalling listings, failing batch downloads) and session accounting.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use sitemirror_core::remote::{DirectoryEntry, RemoteClient, RemoteConnector, RemotePath};
use sitemirror_core::TransferError;

#[derive(Default)]
struct State {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    extra_entries: HashMap<String, Vec<DirectoryEntry>>,
    list_failures: Mutex<HashMap<String, usize>>,
    list_stalls: Mutex<HashMap<String, (usize, Duration)>>,
    download_failures: Mutex<HashMap<String, usize>>,
    download_stalls: Mutex<HashMap<String, (usize, Duration)>>,
    list_calls: Mutex<Vec<String>>,
    download_calls: AtomicUsize,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

/// In-memory remote tree. Clones share state.
#[derive(Clone, Default)]
pub struct FakeRemote {
    state: Arc<State>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut State {
        Arc::get_mut(&mut self.state).expect("configure FakeRemote before sharing it")
    }

    /// Adds a directory and all its ancestors.
    pub fn dir(mut self, path: &str) -> Self {
        let mut current = RemotePath::new(path);
        let state = self.state_mut();
        loop {
            state.dirs.insert(current.as_str().to_string());
            match parent_of(&current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        self
    }

    /// Adds a file (and its parent directories).
    pub fn file(self, path: &str, contents: &[u8]) -> Self {
        let path = RemotePath::new(path);
        let parent = parent_of(&path).expect("file needs a parent");
        let mut remote = self.dir(parent.as_str());
        remote
            .state_mut()
            .files
            .insert(path.as_str().to_string(), contents.to_vec());
        remote
    }

    /// Adds `count` small files named `f001`, `f002`, ... under `dir`.
    pub fn many_files(mut self, dir: &str, count: usize) -> Self {
        for n in 1..=count {
            let path = format!("{}/f{n:03}", dir.trim_end_matches('/'));
            self = self.file(&path, format!("file {n}").as_bytes());
        }
        self
    }

    /// Makes the listing of `dir` also return `entry` (duplicates, cycles).
    pub fn extra_entry(mut self, dir: &str, entry: DirectoryEntry) -> Self {
        self.state_mut()
            .extra_entries
            .entry(RemotePath::new(dir).as_str().to_string())
            .or_default()
            .push(entry);
        self
    }

    /// The next `times` listings of `dir` fail.
    pub fn fail_listing(self, dir: &str, times: usize) -> Self {
        self.state
            .list_failures
            .lock()
            .unwrap()
            .insert(RemotePath::new(dir).as_str().to_string(), times);
        self
    }

    /// The next `times` listings of `dir` sleep for `stall` first.
    pub fn stall_listing(self, dir: &str, times: usize, stall: Duration) -> Self {
        self.state
            .list_stalls
            .lock()
            .unwrap()
            .insert(RemotePath::new(dir).as_str().to_string(), (times, stall));
        self
    }

    /// The next `times` batches containing `file` fail.
    pub fn fail_download(self, file: &str, times: usize) -> Self {
        self.state
            .download_failures
            .lock()
            .unwrap()
            .insert(RemotePath::new(file).as_str().to_string(), times);
        self
    }

    /// The next `times` batches containing `file` sleep for `stall` first.
    pub fn stall_download(self, file: &str, times: usize, stall: Duration) -> Self {
        self.state
            .download_stalls
            .lock()
            .unwrap()
            .insert(RemotePath::new(file).as_str().to_string(), (times, stall));
        self
    }

    pub fn connector(&self) -> Arc<dyn RemoteConnector> {
        Arc::new(self.clone())
    }

    pub fn list_calls(&self) -> Vec<String> {
        self.state.list_calls.lock().unwrap().clone()
    }

    pub fn list_count(&self, dir: &str) -> usize {
        self.list_calls().iter().filter(|call| *call == dir).count()
    }

    pub fn download_calls(&self) -> usize {
        self.state.download_calls.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }

    pub fn peak_sessions(&self) -> usize {
        self.state.peak_active.load(Ordering::SeqCst)
    }

    pub fn file_count(&self) -> usize {
        self.state.files.len()
    }

    pub fn dir_count(&self) -> usize {
        self.state.dirs.len()
    }
}

fn parent_of(path: &RemotePath) -> Option<RemotePath> {
    if path.is_root() {
        return None;
    }
    let (parent, _) = path.as_str().rsplit_once('/')?;
    Some(RemotePath::new(parent))
}

/// Decrements a per-key fault counter; returns whether the fault fires.
fn take_fault(faults: &Mutex<HashMap<String, usize>>, key: &str) -> bool {
    let mut faults = faults.lock().unwrap();
    match faults.get_mut(key) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            true
        }
        _ => false,
    }
}

fn take_stall(stalls: &Mutex<HashMap<String, (usize, Duration)>>, key: &str) -> Option<Duration> {
    let mut stalls = stalls.lock().unwrap();
    match stalls.get_mut(key) {
        Some((remaining, stall)) if *remaining > 0 => {
            *remaining -= 1;
            Some(*stall)
        }
        _ => None,
    }
}

impl RemoteConnector for FakeRemote {
    fn endpoint(&self) -> String {
        "fake".to_string()
    }

    fn connect(&self) -> Result<Box<dyn RemoteClient>, TransferError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let active = self.state.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak_active.fetch_max(active, Ordering::SeqCst);
        Ok(Box::new(FakeClient {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeClient {
    state: Arc<State>,
}

impl RemoteClient for FakeClient {
    fn list(&mut self, path: &RemotePath) -> Result<Vec<DirectoryEntry>, TransferError> {
        let key = path.as_str().to_string();
        self.state.list_calls.lock().unwrap().push(key.clone());

        if let Some(stall) = take_stall(&self.state.list_stalls, &key) {
            thread::sleep(stall);
        }

        if take_fault(&self.state.list_failures, &key) {
            return Err(TransferError::protocol(key, "421 service not available"));
        }
        if !self.state.dirs.contains(&key) {
            return Err(TransferError::protocol(key, "550 no such directory"));
        }

        let mut entries = Vec::new();
        for dir in &self.state.dirs {
            let candidate = RemotePath::new(dir.as_str());
            if parent_of(&candidate).as_ref() == Some(path) {
                entries.push(DirectoryEntry::directory(path, candidate.file_name().unwrap()));
            }
        }
        for file in self.state.files.keys() {
            let candidate = RemotePath::new(file.as_str());
            if parent_of(&candidate).as_ref() == Some(path) {
                entries.push(DirectoryEntry::file(path, candidate.file_name().unwrap()));
            }
        }
        if let Some(extra) = self.state.extra_entries.get(&key) {
            entries.extend(extra.iter().cloned());
        }
        Ok(entries)
    }

    fn download_files(
        &mut self,
        destination: &Path,
        files: &[RemotePath],
    ) -> Result<usize, TransferError> {
        self.state.download_calls.fetch_add(1, Ordering::SeqCst);

        for file in files {
            if let Some(stall) = take_stall(&self.state.download_stalls, file.as_str()) {
                thread::sleep(stall);
            }
        }
        for file in files {
            if take_fault(&self.state.download_failures, file.as_str()) {
                return Err(TransferError::protocol(file.as_str(), "426 transfer aborted"));
            }
        }
        for file in files {
            let contents = self
                .state
                .files
                .get(file.as_str())
                .ok_or_else(|| TransferError::protocol(file.as_str(), "550 no such file"))?;
            let target = destination.join(file.file_name().unwrap());
            fs::write(&target, contents).map_err(|e| TransferError::local_io(&target, e))?;
        }
        Ok(files.len())
    }

    fn disconnect(&mut self) -> Result<(), TransferError> {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        self.state.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Reads every file under `root` into a map of relative path -> contents.
/// Directories are recorded with empty contents and a trailing `/`.
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut out = BTreeMap::new();
    collect(root, root, &mut out);
    out
}

fn collect(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        let relative = path
            .strip_prefix(root)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        if path.is_dir() {
            out.insert(format!("{relative}/"), Vec::new());
            collect(root, &path, out);
        } else {
            out.insert(relative, fs::read(&path).unwrap());
        }
    }
}

/// Writes a small site tree to `root` on the local filesystem.
pub fn write_local_site(root: &Path) {
    let files: [(&str, &[u8]); 5] = [
        ("index.php", b"<?php require 'wp-blog-header.php';"),
        ("wp-config.php", b"<?php define('DB_NAME', 'site');"),
        ("wp-content/themes/t/style.css", b"body { margin: 0 }"),
        ("wp-content/uploads/2024/01/a.png", &[0x89, b'P', b'N', b'G', 0, 1, 2, 3]),
        ("wp-content/uploads/2024/02/b.png", &[0x89, b'P', b'N', b'G', 9, 9]),
    ];
    for (relative, contents) in files {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    fs::create_dir_all(root.join("wp-content/cache")).unwrap();
}
