//! Logging setup for the dashboard and developer tools.
//!
//! Installs a global tracing subscriber writing to a console stream and, when
//! the application directory is usable, to a timestamped per-launch log file.
//! Old log files are pruned to a fixed count.

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Maximum number of log files to retain.
const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "gridsurv";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static INSTALLED: OnceLock<Console> = OnceLock::new();

/// Stream that receives the human-readable console copy of every event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Console {
    /// The dashboard has no stdout payload, so events go to stdout.
    Stdout,
    /// Headless tools print reports on stdout and keep logs on stderr.
    Stderr,
}

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// No platform-specific directory could be resolved for log files.
    #[error("No suitable data directory available for logs")]
    NoDataDir,
    /// Failed to create or access the log directory.
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to enumerate existing log files for pruning.
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to remove an obsolete log file.
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to format a timestamp for the log filename.
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    /// Failed to set the global tracing subscriber.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
    /// Failed to create the log file for this launch.
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Initialize tracing for the dashboard: stdout plus a per-launch log file.
pub fn init() -> Result<(), LoggingError> {
    init_with_console(Console::Stdout)
}

/// Initialize tracing with the given console stream plus a per-launch log file.
///
/// Subsequent calls are no-ops. When the log file cannot be prepared, a
/// console-only subscriber is still installed and the file error is returned
/// so callers can report it without aborting startup.
pub fn init_with_console(console: Console) -> Result<(), LoggingError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    match prepare_log_file() {
        Ok(log_path) => install(console, Some(&log_path)),
        Err(err) => {
            install(console, None)?;
            Err(err)
        }
    }
}

fn prepare_log_file() -> Result<PathBuf, LoggingError> {
    let log_dir = app_dirs::logs_dir().map_err(map_app_dir_error)?;
    let log_path = log_dir.join(format_log_file_name(now_local_or_utc())?);
    ensure_file_exists(&log_path)?;
    prune_old_logs(&log_dir, MAX_LOG_FILES)?;
    Ok(log_path)
}

fn install(console: Console, log_path: Option<&Path>) -> Result<(), LoggingError> {
    let timer = build_timer();
    let console_layer = match console {
        Console::Stdout => fmt::layer()
            .with_timer(timer.clone())
            .with_writer(std::io::stdout)
            .boxed(),
        Console::Stderr => fmt::layer()
            .with_timer(timer.clone())
            .with_writer(std::io::stderr)
            .boxed(),
    };
    let file_layer = log_path.and_then(|path| {
        let dir = path.parent()?;
        let name = path.file_name()?;
        let (writer, guard) = tracing_appender::non_blocking(rolling::never(dir, name));
        let _ = LOG_GUARD.set(guard);
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(writer),
        )
    });

    let subscriber = Registry::default()
        .with(build_env_filter())
        .with(console_layer)
        .with(file_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = INSTALLED.set(console);

    match log_path {
        Some(path) => {
            tracing::info!(?console, "Logging initialized; log file at {}", path.display())
        }
        None => tracing::info!(?console, "Logging initialized without a log file"),
    }
    Ok(())
}

fn ensure_file_exists(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn prune_old_logs(dir: &Path, max_files: usize) -> Result<(), LoggingError> {
    let mut entries = fs::read_dir(dir)
        .map_err(|source| LoggingError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("log"))
        .map(|entry| {
            let modified = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.path())
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|(modified, _)| *modified);
    let excess = entries.len().saturating_sub(max_files);
    for (_, path) in entries.into_iter().take(excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn format_log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let name = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}_{name}.log"))
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn build_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> LoggingError {
    match error {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoDataDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            LoggingError::CreateDir { path, source }
        }
    }
}
