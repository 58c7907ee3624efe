//! Pre-run input checks and derived paths.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use sitemirror_core::remote::RemotePath;

use crate::cli::{Args, Backend};

/// Checks everything the run needs up front and reports every problem at
/// once instead of failing on the first.
pub(crate) fn validate_inputs(args: &Args) -> Result<()> {
    let problems = collect_problems(args);
    if problems.is_empty() {
        return Ok(());
    }
    bail!(
        "cannot start mirror:\n{}",
        problems
            .iter()
            .map(|problem| format!("  - {problem}"))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn collect_problems(args: &Args) -> Vec<String> {
    let mut problems = Vec::new();

    match args.backend {
        Backend::Ftp => {
            if is_blank(args.host.as_deref()) {
                problems.push("FTP host is missing (--host or FTP_HOST)".to_string());
            }
            if is_blank(args.user.as_deref()) {
                problems.push("FTP user is missing (--user or FTP_USER)".to_string());
            }
            if is_blank(args.password.as_deref()) {
                problems.push("FTP password is missing (--password or FTP_PASSWORD)".to_string());
            }
        }
        Backend::Local => match &args.source {
            None => problems.push("source directory is missing (--source or MIRROR_SOURCE)".to_string()),
            Some(source) if !source.is_dir() => problems.push(format!(
                "source directory {} does not exist",
                source.display()
            )),
            Some(_) => {}
        },
    }

    if !is_single_folder_name(&args.name) {
        problems.push(format!("backup name {:?} must be a single folder name", args.name));
    }
    if !args.working_dir.is_dir() {
        problems.push(format!(
            "working directory {} does not exist",
            args.working_dir.display()
        ));
    }

    problems
}

/// `.` and `..` resolve outside `<working_dir>/<name>`, and the mirror root
/// below the name is wiped at the start of every run.
fn is_single_folder_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && !matches!(trimmed, "." | "..") && !name.contains(['/', '\\'])
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|value| value.trim().is_empty())
}

/// Local mirror root: `<working_dir>/<name>/<last remote component>`, with
/// `root` standing in for the remote filesystem root.
pub(crate) fn local_root_for(working_dir: &Path, name: &str, remote_root: &RemotePath) -> PathBuf {
    working_dir
        .join(name)
        .join(remote_root.file_name().unwrap_or("root"))
}
