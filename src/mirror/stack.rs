//! Pending-directory stack for iterative traversal.

use std::collections::HashSet;

use crate::remote::RemotePath;

/// LIFO stack of remote directories not yet listed.
///
/// Every path is accepted at most once per stack lifetime, so a directory
/// reachable through two listings (or a link cycle) is walked once.
#[derive(Debug, Default)]
pub struct WorkStack {
    pending: Vec<RemotePath>,
    seen: HashSet<RemotePath>,
}

impl WorkStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `path` unless it was pushed before. Returns whether it was added.
    pub fn push(&mut self, path: RemotePath) -> bool {
        if self.seen.contains(&path) {
            return false;
        }
        self.seen.insert(path.clone());
        self.pending.push(path);
        true
    }

    /// Pops the most recently pushed pending path.
    pub fn pop(&mut self) -> Option<RemotePath> {
        self.pending.pop()
    }

    /// Number of pending paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns `true` if `path` is currently waiting to be listed.
    #[must_use]
    pub fn is_pending(&self, path: &RemotePath) -> bool {
        self.pending.contains(path)
    }
}
