//! Immutable configuration for one mirror run.

use std::path::{Path, PathBuf};

use super::batch::DEFAULT_BATCH_SIZE;
use super::{MirrorError, RetryPolicy};
use crate::remote::RemotePath;

/// Default number of concurrent batch downloads in parallel mode.
pub const DEFAULT_WORKERS: usize = 4;

/// Largest accepted batch size.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Largest accepted worker count.
pub const MAX_WORKERS: usize = 64;

/// How traversal and downloads are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleMode {
    /// One thread of control; each directory's batches download before the
    /// next directory is listed.
    Sequential,
    /// Traversal feeds a queue drained by up to `workers` concurrent
    /// batch downloads.
    Parallel { workers: usize },
}

impl Default for ScheduleMode {
    fn default() -> Self {
        Self::Parallel {
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Everything a mirror run needs besides the remote connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    local_root: PathBuf,
    remote_root: RemotePath,
    folder_ceiling: Option<usize>,
    batch_size: usize,
    mode: ScheduleMode,
    retry: RetryPolicy,
}

impl MirrorConfig {
    /// Creates a config with default ceiling (unbounded), batch size,
    /// schedule and retry policy.
    #[must_use]
    pub fn new(local_root: impl Into<PathBuf>, remote_root: impl Into<RemotePath>) -> Self {
        Self {
            local_root: local_root.into(),
            remote_root: remote_root.into(),
            folder_ceiling: None,
            batch_size: DEFAULT_BATCH_SIZE,
            mode: ScheduleMode::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Stops traversal after `ceiling` directories (`None` = unbounded).
    #[must_use]
    pub fn with_folder_ceiling(mut self, ceiling: Option<usize>) -> Self {
        self.folder_ceiling = ceiling;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ScheduleMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    #[must_use]
    pub fn remote_root(&self) -> &RemotePath {
        &self.remote_root
    }

    #[must_use]
    pub fn folder_ceiling(&self) -> Option<usize> {
        self.folder_ceiling
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn mode(&self) -> ScheduleMode {
        self.mode
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> Result<(), MirrorError> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(MirrorError::InvalidConfig(format!(
                "batch size {} must be between 1 and {MAX_BATCH_SIZE}",
                self.batch_size
            )));
        }
        if let ScheduleMode::Parallel { workers } = self.mode
            && !(1..=MAX_WORKERS).contains(&workers)
        {
            return Err(MirrorError::InvalidConfig(format!(
                "worker count {workers} must be between 1 and {MAX_WORKERS}"
            )));
        }
        if self.retry.attempt_timeout().is_zero() {
            return Err(MirrorError::InvalidConfig(
                "attempt timeout must be greater than zero".to_string(),
            ));
        }
        if self.local_root.as_os_str().is_empty() {
            return Err(MirrorError::InvalidConfig(
                "local root must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = MirrorConfig::new("/tmp/m", "/site/wwwroot");
        assert_eq!(config.folder_ceiling(), None);
        assert_eq!(config.batch_size(), 10);
        assert_eq!(config.mode(), ScheduleMode::Parallel { workers: 4 });
        assert_eq!(config.retry_policy().max_retries(), 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = MirrorConfig::new("/tmp/m", "/r")
            .with_folder_ceiling(Some(3))
            .with_batch_size(25)
            .with_mode(ScheduleMode::Sequential)
            .with_retry_policy(RetryPolicy::with_max_retries(1));
        assert_eq!(config.folder_ceiling(), Some(3));
        assert_eq!(config.batch_size(), 25);
        assert_eq!(config.mode(), ScheduleMode::Sequential);
        assert_eq!(config.retry_policy().max_retries(), 1);
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let config = MirrorConfig::new("/tmp/m", "/r").with_batch_size(0);
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("batch size"));
    }

    #[test]
    fn test_validate_rejects_too_many_workers() {
        let config =
            MirrorConfig::new("/tmp/m", "/r").with_mode(ScheduleMode::Parallel { workers: 65 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let policy = RetryPolicy::new(1, Duration::from_secs(1), Duration::ZERO);
        let config = MirrorConfig::new("/tmp/m", "/r").with_retry_policy(policy);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_local_root() {
        let config = MirrorConfig::new("", "/r");
        assert!(config.validate().is_err());
    }
}
