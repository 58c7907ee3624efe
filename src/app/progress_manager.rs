//! Progress UI (spinner) for mirror runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use sitemirror_core::mirror::MirrorStats;
use tracing::debug;

/// Spawns the progress UI (spinner) when requested.
/// Returns (handle, stop) so the caller can signal stop and await the handle.
/// When `use_spinner` is false, returns (None, stop) with stop already true.
pub(crate) fn spawn_progress_ui(
    use_spinner: bool,
    stats: Arc<MirrorStats>,
) -> (Option<tokio::task::JoinHandle<()>>, Arc<AtomicBool>) {
    if !use_spinner {
        return (None, Arc::new(AtomicBool::new(true)));
    }
    let stop = Arc::new(AtomicBool::new(false));
    let handle = spawn_spinner_inner(stats, Arc::clone(&stop));
    (Some(handle), stop)
}

/// Signals the spinner to stop and waits for it.
///
/// Returns `false` if the spinner task panicked or was cancelled; the run
/// itself is unaffected.
pub(crate) async fn stop_progress_ui(handle: Option<tokio::task::JoinHandle<()>>, stop: &AtomicBool) -> bool {
    stop.store(true, Ordering::SeqCst);
    let Some(handle) = handle else {
        return true;
    };
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "progress spinner task failed");
            false
        }
    }
}

fn spawn_spinner_inner(stats: Arc<MirrorStats>, stop: Arc<AtomicBool>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        while !stop.load(Ordering::SeqCst) {
            spinner.set_message(progress_message(&stats));
            tokio::time::sleep(Duration::from_millis(120)).await;
        }

        spinner.finish_and_clear();
    })
}

fn progress_message(stats: &MirrorStats) -> String {
    let mut message = format!(
        "{} folders, batches {}/{}, {} files",
        stats.directories_listed(),
        stats.batches_completed(),
        stats.batches_queued(),
        stats.files_downloaded()
    );
    let failed = stats.failed_units();
    if failed > 0 {
        message.push_str(&format!(", {failed} failed"));
    }
    message
}
