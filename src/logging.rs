//! Logging initialization
//!
//! Installs a `tracing` subscriber for programs built on the catalog.
//! `RUST_LOG` takes precedence over the configured level.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
};

use crate::config::Settings;

const LOG_FILE_PREFIX: &str = "paperdb.log";

/// Log to stderr, or to a daily rolling file under `log_dir`.
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the life of the program.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, TryInitError> {
    let filter = env_filter(level);

    let (layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (layer, Some(guard))
        }
        None => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed();
            (layer, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    tracing::debug!(level, "Logging initialized");
    Ok(guard)
}

pub fn init_from_settings(settings: &Settings) -> Result<Option<WorkerGuard>, TryInitError> {
    init_logging(&settings.log_level, settings.log_dir.as_deref())
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_init_is_rejected() {
        let dir = tempdir().unwrap();
        let _guard = init_logging("debug", Some(dir.path()));

        assert!(init_logging("info", None).is_err());
    }
}
