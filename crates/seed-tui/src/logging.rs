//! Logging setup
//!
//! The terminal belongs to the UI, so log output goes to a file through a
//! non-blocking `tracing-appender` writer.

use std::path::Path;

use anyhow::{anyhow, Context};
use seed_config::{expand_tilde, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber. `RUST_LOG` wins over `level_override`,
/// which wins over the configured level. Keep the returned guard alive until
/// exit so buffered lines are flushed.
pub fn init(config: &LoggingConfig, level_override: Option<&str>) -> anyhow::Result<Option<WorkerGuard>> {
    let level = level_override
        .map(str::to_string)
        .unwrap_or_else(|| config.level.to_string());
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&level)
            .map_err(|e| anyhow!("Invalid log level '{}': {}", level, e))?,
    };

    let Some(path) = config.file.as_deref().and_then(expand_tilde) else {
        tracing_subscriber::registry().with(filter).try_init()?;
        return Ok(None);
    };

    let (dir, file_name) = split_log_path(&path)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));

    let layer = if config.json_format {
        fmt::layer()
            .json()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry().with(filter).with(layer).try_init()?;
    tracing::info!(target: "seed", "Logging to {:?} at level {}", path, level);
    Ok(Some(guard))
}

fn split_log_path(path: &Path) -> anyhow::Result<(&Path, &std::ffi::OsStr)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("Log path {:?} has no file name", path))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok((dir, file_name))
}

/// Span carrying the session identity for gateway work.
pub fn session_span(sid: &str) -> tracing::Span {
    tracing::info_span!("session", sid = %sid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path(Path::new("/tmp/seed/logs/seed.log")).unwrap();
        assert_eq!(dir, Path::new("/tmp/seed/logs"));
        assert_eq!(name, "seed.log");
        assert!(split_log_path(Path::new("/")).is_err());
    }
}
