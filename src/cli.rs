//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use sitemirror_core::remote::DEFAULT_FTP_PORT;

/// Default remote root on App Service style hosts.
pub const DEFAULT_REMOTE_ROOT: &str = "/site/wwwroot";

/// Mirror a remote site tree onto local storage.
///
/// Walks the remote directory tree without recursion, downloads files in
/// bounded batches over fresh connections, and retries transient failures
/// with exponential backoff. Every option can also be set through the
/// environment variable shown in its help.
#[derive(Parser, Debug)]
#[command(name = "sitemirror")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Where the remote tree comes from
    #[arg(long, value_enum, default_value_t = Backend::Ftp, env = "MIRROR_BACKEND")]
    pub backend: Backend,

    /// FTP server host name
    #[arg(long, env = "FTP_HOST")]
    pub host: Option<String>,

    /// FTP control port
    #[arg(long, default_value_t = DEFAULT_FTP_PORT, env = "FTP_PORT")]
    pub port: u16,

    /// FTP user name
    #[arg(short = 'u', long, env = "FTP_USER")]
    pub user: Option<String>,

    /// FTP password
    #[arg(long, env = "FTP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Local directory served as the remote tree (local backend)
    #[arg(long, env = "MIRROR_SOURCE")]
    pub source: Option<PathBuf>,

    /// Remote directory to mirror
    #[arg(long, default_value = DEFAULT_REMOTE_ROOT, env = "FTP_REMOTE")]
    pub remote: String,

    /// Backup name; the mirror lands in <working-dir>/<name>/
    #[arg(short = 'n', long, default_value = "backup", env = "MIRROR_NAME")]
    pub name: String,

    /// Directory the backup folder is created in
    #[arg(short = 'w', long, default_value = ".", env = "MIRROR_WORKING_DIR")]
    pub working_dir: PathBuf,

    /// Stop after this many directories (testing mode; unbounded if unset)
    #[arg(short = 'f', long, env = "MIRROR_FOLDERS")]
    pub folders: Option<usize>,

    /// Maximum retries per listing or batch (0-20)
    #[arg(short = 'r', long, default_value_t = 5, env = "MIRROR_RETRIES", value_parser = clap::value_parser!(u8).range(0..=20))]
    pub retries: u8,

    /// Files per download batch (1-1000)
    #[arg(short = 'b', long, default_value_t = 10, env = "MIRROR_BATCH_SIZE", value_parser = clap::value_parser!(u16).range(1..=1000))]
    pub batch_size: u16,

    /// Concurrent batch downloads (1-64)
    #[arg(short = 'c', long, default_value_t = 4, env = "MIRROR_WORKERS", value_parser = clap::value_parser!(u8).range(1..=64))]
    pub workers: u8,

    /// List and download on one thread, one batch at a time
    #[arg(long, conflicts_with = "workers")]
    pub sequential: bool,

    /// Per-attempt timeout in seconds (1-3600)
    #[arg(short = 't', long, default_value_t = 300, env = "MIRROR_TIMEOUT", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,

    /// Write the run report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Remote tree provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// FTP server
    Ftp,
    /// Locally mounted directory
    Local,
}
