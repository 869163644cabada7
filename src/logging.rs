//! Tracing configuration and log routing.
//!
//! The binary logs to stderr using a compact formatter so stdout stays free for JSON output.
//! A second, non-blocking file layer is added according to `RUSTY_STORE_LOG_FILE`: unset means
//! `logs/rustystore.log`, `off` disables it, anything else is used as the file path.
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_ENV: &str = "RUSTY_STORE_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_NAME: &str = "rustystore.log";

/// Where file logs go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFile {
    /// `logs/rustystore.log` relative to the working directory.
    Default,
    /// Append to the given path.
    Path(PathBuf),
    /// No file logging.
    Disabled,
}

impl LogFile {
    /// Interpret the value of `RUSTY_STORE_LOG_FILE`.
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Default,
            Some(value) if value.eq_ignore_ascii_case("off") => Self::Disabled,
            Some(path) => Self::Path(PathBuf::from(path)),
        }
    }
}

/// Configure tracing subscribers for stderr and optional file logging.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer);

    let target = LogFile::from_env_value(std::env::var(LOG_FILE_ENV).ok().as_deref());
    if let Some(writer) = configure_file_writer(&target) {
        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact();

        registry.with(file_layer).init();
    } else {
        registry.init();
    }
}

/// Build a non-blocking writer for file logging.
///
/// Returns `None` when disabled, or when the directory or file cannot be opened.
fn configure_file_writer(target: &LogFile) -> Option<NonBlocking> {
    let (non_blocking, guard) = match target {
        LogFile::Disabled => return None,
        LogFile::Path(path) => match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => tracing_appender::non_blocking(file),
            Err(err) => {
                eprintln!("Failed to open log file {}: {err}", path.display());
                return None;
            }
        },
        LogFile::Default => {
            if let Err(err) = std::fs::create_dir_all(DEFAULT_LOG_DIR) {
                eprintln!("Failed to create logs directory: {err}");
                return None;
            }
            let appender = tracing_appender::rolling::never(DEFAULT_LOG_DIR, DEFAULT_LOG_NAME);
            tracing_appender::non_blocking(appender)
        }
    };
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
