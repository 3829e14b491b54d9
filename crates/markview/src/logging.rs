use anyhow::{anyhow, Result};
use markview_config::LogConfig;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable naming the log file.
pub const LOG_PATH_ENV: &str = "MARKVIEW_LOG_PATH";

/// Log files beyond this size are started over.
const MAX_LOG_FILE_SIZE: u64 = 8 * 1024 * 1024;

/// Picks the log file: command line, then environment, then settings.
pub fn log_path(
    from_args: Option<PathBuf>,
    from_env: Option<PathBuf>,
    config: &LogConfig,
) -> Option<PathBuf> {
    from_args
        .or(from_env)
        .or_else(|| config.log_file.as_ref().map(PathBuf::from))
}

/// Removes `log_path` if it grew too large, returns whether it was removed.
fn remove_oversized(log_path: &Path) -> std::io::Result<bool> {
    match std::fs::metadata(log_path) {
        Ok(metadata) if metadata.is_file() && metadata.len() > MAX_LOG_FILE_SIZE => {
            std::fs::remove_file(log_path)?;
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Installs the global subscriber.
///
/// With a log file, everything up to `max_level` goes to the file and the
/// returned guard must be kept alive to flush it. Otherwise logs go to stderr
/// filtered by `RUST_LOG`.
pub fn init(log: Option<PathBuf>, config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let from_env = std::env::var(LOG_PATH_ENV).ok().map(PathBuf::from);

    let Some(log_path) = log_path(log, from_env, config) else {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(None);
    };

    remove_oversized(&log_path)?;

    let file_name = log_path
        .file_name()
        .ok_or_else(|| anyhow!("no file name in {log_path:?}"))?;

    let directory = log_path
        .parent()
        .ok_or_else(|| anyhow!("{log_path:?} has no parent"))?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let max_level = config.max_level.parse().unwrap_or(tracing::Level::DEBUG);

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_line_number(true)
        .with_writer(non_blocking)
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path_precedence() {
        let config = LogConfig {
            log_file: Some("/tmp/from-settings.log".into()),
            ..Default::default()
        };

        assert_eq!(
            log_path(
                Some("/tmp/from-args.log".into()),
                Some("/tmp/from-env.log".into()),
                &config
            ),
            Some(PathBuf::from("/tmp/from-args.log"))
        );
        assert_eq!(
            log_path(None, Some("/tmp/from-env.log".into()), &config),
            Some(PathBuf::from("/tmp/from-env.log"))
        );
        assert_eq!(
            log_path(None, None, &config),
            Some(PathBuf::from("/tmp/from-settings.log"))
        );
        assert_eq!(log_path(None, None, &LogConfig::default()), None);
    }

    #[test]
    fn test_remove_oversized() {
        let dir = tempfile::tempdir().unwrap();

        let small = dir.path().join("small.log");
        std::fs::write(&small, "line\n").unwrap();
        assert!(!remove_oversized(&small).unwrap());
        assert!(small.exists());

        let large = dir.path().join("large.log");
        let file = std::fs::File::create(&large).unwrap();
        file.set_len(MAX_LOG_FILE_SIZE + 1).unwrap();
        assert!(remove_oversized(&large).unwrap());
        assert!(!large.exists());

        assert!(!remove_oversized(&dir.path().join("missing.log")).unwrap());
    }
}
