//! Splitting discovered files into bounded download batches.

use std::path::PathBuf;

use crate::remote::RemotePath;

/// Default number of files per download call.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Lazily groups `source` into vectors of at most `size` items.
///
/// Order is preserved within and across groups, the final group may be
/// short, and an empty source yields no groups at all. A `size` of zero is
/// treated as one.
///
/// ```
/// use sitemirror_core::mirror::chunk;
///
/// let sizes: Vec<usize> = chunk(1..=23, 10).map(|group| group.len()).collect();
/// assert_eq!(sizes, vec![10, 10, 3]);
/// assert_eq!(chunk(Vec::<u8>::new(), 10).count(), 0);
/// ```
pub fn chunk<I>(source: I, size: usize) -> Chunks<I::IntoIter>
where
    I: IntoIterator,
{
    Chunks {
        inner: source.into_iter(),
        size: size.max(1),
    }
}

/// Iterator returned by [`chunk`]. Cloning it restarts from the same point.
#[derive(Debug, Clone)]
pub struct Chunks<I> {
    inner: I,
    size: usize,
}

impl<I: Iterator> Iterator for Chunks<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let group: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        (!group.is_empty()).then_some(group)
    }
}

/// One download call's worth of files from a single directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBatch {
    /// Run-wide batch number, starting at 1.
    pub number: u64,
    /// Remote directory the files were listed from.
    pub directory: RemotePath,
    /// Local directory the files are written into.
    pub destination: PathBuf,
    /// Remote files, in listing order.
    pub files: Vec<RemotePath>,
}

/// Numbers batches across one traversal run.
#[derive(Debug)]
pub struct Batcher {
    batch_size: usize,
    next_number: u64,
}

impl Batcher {
    /// Creates a batcher producing batches of at most `batch_size` files.
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            next_number: 1,
        }
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches handed out so far.
    #[must_use]
    pub fn issued(&self) -> u64 {
        self.next_number - 1
    }

    /// Splits one directory's files into numbered batches.
    pub fn batches<'a>(
        &'a mut self,
        directory: &'a RemotePath,
        destination: &'a std::path::Path,
        files: Vec<RemotePath>,
    ) -> impl Iterator<Item = FileBatch> + 'a {
        chunk(files, self.batch_size).map(move |files| {
            let number = self.next_number;
            self.next_number += 1;
            FileBatch {
                number,
                directory: directory.clone(),
                destination: destination.to_path_buf(),
                files,
            }
        })
    }
}
