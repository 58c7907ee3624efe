//! Maps a finished run to the process exit outcome.

use sitemirror_core::mirror::MirrorReport;

use crate::ProcessExit;

/// Exit outcome for a finished run.
///
/// A run is `Success` when no directory listing or batch download failed,
/// `Partial` when something failed but at least one directory was listed or
/// one batch landed, and `Failure` when nothing was mirrored at all.
pub(crate) fn determine_exit_outcome(report: &MirrorReport) -> ProcessExit {
    if report.is_complete() {
        return ProcessExit::Success;
    }
    let mirrored_anything = report.directories_listed > 0 || report.batches_completed > 0;
    if mirrored_anything {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use sitemirror_core::mirror::{FailedBatch, FailedDirectory};
    use sitemirror_core::remote::RemotePath;

    use super::*;

    fn report(listed: usize, completed: u64) -> MirrorReport {
        MirrorReport {
            directories_listed: listed,
            batches_completed: completed,
            files_downloaded: 0,
            retries: 0,
            abandoned_directories: 0,
            elapsed_ms: 0,
            failed_directories: Vec::new(),
            failed_batches: Vec::new(),
        }
    }

    fn failed_root() -> FailedDirectory {
        FailedDirectory {
            path: RemotePath::new("/site/wwwroot"),
            error: "connection refused".to_string(),
        }
    }

    #[test]
    fn test_clean_run_succeeds() {
        assert_eq!(determine_exit_outcome(&report(12, 30)), ProcessExit::Success);
    }

    #[test]
    fn test_empty_tree_succeeds() {
        assert_eq!(determine_exit_outcome(&report(1, 0)), ProcessExit::Success);
    }

    #[test]
    fn test_ceiling_halt_with_pending_directories_succeeds() {
        let mut halted = report(5, 8);
        halted.abandoned_directories = 40;
        assert_eq!(determine_exit_outcome(&halted), ProcessExit::Success);
    }

    #[test]
    fn test_failed_batch_after_listing_is_partial() {
        let mut partial = report(3, 0);
        partial.failed_batches.push(FailedBatch {
            number: 1,
            directory: RemotePath::new("/site/wwwroot/uploads"),
            destination: PathBuf::from("/backup/wwwroot/uploads"),
            files: 10,
            error: "426 transfer aborted".to_string(),
        });
        assert_eq!(determine_exit_outcome(&partial), ProcessExit::Partial);
    }

    #[test]
    fn test_unlistable_root_is_failure() {
        let mut failed = report(0, 0);
        failed.failed_directories.push(failed_root());
        assert_eq!(determine_exit_outcome(&failed), ProcessExit::Failure);
    }
}
