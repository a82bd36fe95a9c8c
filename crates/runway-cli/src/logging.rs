//! Tracing setup: stderr always, plus an optional plain-text log file

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{Error, GlobalArgs, Result};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` with `--verbose`.
/// Returns the log file path when one was requested. Failing to create it is
/// an error, so a run never mutates anything without the log it asked for.
pub fn init(global: &GlobalArgs, command: &str) -> Result<Option<PathBuf>> {
    let log_path = log_path(global, command, Utc::now());

    let file_layer = match &log_path {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter(global.verbose))
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::command_failed(format!("failed to install logger: {}", e)))?;

    Ok(log_path)
}

fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Where logs go: `--log-file` as given, or `runway-<cmd>-<stamp>.log` in `--log-dir`
pub fn log_path(global: &GlobalArgs, command: &str, now: DateTime<Utc>) -> Option<PathBuf> {
    match (&global.log_file, &global.log_dir) {
        (Some(file), _) => Some(file.clone()),
        (None, Some(dir)) => Some(dir.join(format!(
            "runway-{}-{}.log",
            command,
            now.format("%Y%m%d-%H%M%S")
        ))),
        (None, None) => None,
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::logging(parent, e.to_string()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::logging(path, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 5, 9).unwrap()
    }

    #[test]
    fn log_dir_gets_a_timestamped_file() {
        let global = GlobalArgs {
            log_dir: Some(PathBuf::from("/var/log/runway")),
            ..Default::default()
        };
        assert_eq!(
            log_path(&global, "migrate", at()),
            Some(PathBuf::from("/var/log/runway/runway-migrate-20260301-080509.log"))
        );
    }

    #[test]
    fn no_log_options_means_stderr_only() {
        assert_eq!(log_path(&GlobalArgs::default(), "rollback", at()), None);
    }

    #[test]
    fn log_file_parent_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn uncreatable_log_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let err = open_log_file(&blocker.join("run.log")).unwrap_err();
        assert!(matches!(err, Error::Logging { .. }));
    }
}
