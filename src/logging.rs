use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing_subscriber::EnvFilter;

use crate::config::Verbosity;
use crate::error::BirdcallError;

/// Where log lines go. A file keeps them out of the way of the progress UI.
#[derive(Debug, Clone)]
pub enum LogTarget {
    Stderr,
    Directory(PathBuf),
}

pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("birdcall_{}.log", now.format("%Y%m%d_%H%M%S"))
}

/// Installs the global subscriber. `RUST_LOG` wins over `verbosity`.
/// Returns the log file path when logging to a directory.
pub fn init_logging(
    verbosity: Verbosity,
    target: LogTarget,
) -> Result<Option<PathBuf>, BirdcallError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.as_filter()));

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|err| BirdcallError::Filesystem(err.to_string()))?;
            Ok(None)
        }
        LogTarget::Directory(dir) => {
            let path = create_log_file_path(&dir)?;
            let file = File::create(&path)
                .map_err(|err| BirdcallError::Filesystem(format!("{}: {err}", path.display())))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|err| BirdcallError::Filesystem(err.to_string()))?;
            tracing::info!("log file created at: {}", path.display());
            Ok(Some(path))
        }
    }
}

fn create_log_file_path(dir: &Path) -> Result<PathBuf, BirdcallError> {
    fs::create_dir_all(dir)
        .map_err(|err| BirdcallError::Filesystem(format!("{}: {err}", dir.display())))?;
    Ok(dir.join(log_file_name(Local::now())))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn file_name_carries_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(log_file_name(now), "birdcall_20240309_070501.log");
    }

    #[test]
    fn log_directory_is_created() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("logs");
        let path = create_log_file_path(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(path.parent(), Some(dir.as_path()));
    }
}
