//! Command-line configuration and log setup.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::db::default_database_path;

/// Log file name used when `--log-file` is not given.
const LOG_FILE_NAME: &str = "library-manager.log";

/// Terminal manager for books, authors and categories.
#[derive(Debug, Parser)]
#[command(name = "library-manager", author, version, about, long_about = None)]
pub struct Cli {
    /// SQLite database file (created if missing)
    #[arg(short, long, env = "LIBRARY_DB")]
    pub database: Option<PathBuf>,

    /// Where to write logs; defaults to a file beside the database
    #[arg(long, env = "LIBRARY_LOG")]
    pub log_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => default_database_path(),
        }
    }

    pub fn log_path(&self, database: &Path) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            database
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(LOG_FILE_NAME)
        })
    }
}

/// Send `tracing` output to `path`. The terminal belongs to the UI, so logs
/// never go to stdout or stderr.
pub fn init_logging(path: &Path, level: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("failed to create log directory")?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}
