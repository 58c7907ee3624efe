use std::fs;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sitemirror_core::mirror::{Mirror, MirrorConfig, MirrorReport, RetryPolicy, ScheduleMode};
use sitemirror_core::remote::{FtpConnector, FtpCredentials, LocalConnector, RemoteConnector, RemotePath};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::ProcessExit;
use crate::app::{exit_handler, progress_manager, validation};
use crate::cli::{Args, Backend};

pub(crate) async fn run_mirror(args: Args) -> Result<ProcessExit> {
    validation::validate_inputs(&args)?;

    let remote_root = RemotePath::new(args.remote.as_str());
    let local_root = validation::local_root_for(&args.working_dir, &args.name, &remote_root);
    let connector = build_connector(&args)?;
    let config = build_config(&args, remote_root, &local_root);

    let run_id = format!("{:016x}", rand::random::<u64>());
    let span = info_span!("mirror", run_id = %run_id, name = %args.name);

    async move {
        echo_config(&args, connector.as_ref(), &config);

        let mirror = Mirror::new(connector, config)?;
        let use_spinner = !args.quiet && io::stderr().is_terminal();
        let (spinner, stop) = progress_manager::spawn_progress_ui(use_spinner, mirror.stats());

        let result = mirror.run().await;

        progress_manager::stop_progress_ui(spinner, &stop).await;
        let report = result.context("mirror run failed")?;

        if let Some(path) = &args.report {
            write_report(path, &report)?;
            info!(path = %path.display(), "report written");
        }
        summarize(&report);
        Ok(exit_handler::determine_exit_outcome(&report))
    }
    .instrument(span)
    .await
}

fn build_connector(args: &Args) -> Result<Arc<dyn RemoteConnector>> {
    match args.backend {
        Backend::Ftp => {
            let credentials = FtpCredentials {
                host: args.host.clone().context("FTP host is missing")?,
                port: args.port,
                user: args.user.clone().context("FTP user is missing")?,
                password: args.password.clone().context("FTP password is missing")?,
            };
            debug!(?credentials, "using FTP backend");
            let connector = FtpConnector::new(credentials).with_io_timeout(Duration::from_secs(args.timeout));
            Ok(Arc::new(connector))
        }
        Backend::Local => {
            let source = args.source.clone().context("source directory is missing")?;
            Ok(Arc::new(LocalConnector::new(source)))
        }
    }
}

fn build_config(args: &Args, remote_root: RemotePath, local_root: &Path) -> MirrorConfig {
    let mode = if args.sequential {
        ScheduleMode::Sequential
    } else {
        ScheduleMode::Parallel {
            workers: usize::from(args.workers),
        }
    };
    let retry = RetryPolicy::new(
        u32::from(args.retries),
        sitemirror_core::mirror::DEFAULT_BASE_DELAY,
        Duration::from_secs(args.timeout),
    );

    MirrorConfig::new(local_root, remote_root)
        .with_folder_ceiling(args.folders)
        .with_batch_size(usize::from(args.batch_size))
        .with_mode(mode)
        .with_retry_policy(retry)
}

fn echo_config(args: &Args, connector: &dyn RemoteConnector, config: &MirrorConfig) {
    info!(
        backend = ?args.backend,
        endpoint = %connector.endpoint(),
        user = args.user.as_deref().unwrap_or("-"),
        password = if args.password.is_some() { "<redacted>" } else { "-" },
        remote_root = %config.remote_root(),
        local_root = %config.local_root().display(),
        batch_size = config.batch_size(),
        mode = ?config.mode(),
        retries = config.retry_policy().max_retries(),
        timeout_secs = config.retry_policy().attempt_timeout().as_secs(),
        "mirror configuration"
    );
    if let Some(folders) = config.folder_ceiling() {
        warn!(folders, "testing mode: traversal stops after {folders} folders");
    }
}

fn write_report(path: &Path, report: &MirrorReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("failed to write report to {}", path.display()))
}

fn summarize(report: &MirrorReport) {
    let elapsed = Duration::from_millis(report.elapsed_ms);
    if report.abandoned_directories > 0 {
        info!(
            abandoned = report.abandoned_directories,
            "folder ceiling left directories unmirrored"
        );
    }
    for directory in report.partial_directories() {
        warn!(path = %directory, "directory mirrored partially");
    }
    info!(
        directories = report.directories_listed,
        files = report.files_downloaded,
        failed = report.failed_units(),
        "done in {:.1}s",
        elapsed.as_secs_f64()
    );
}
