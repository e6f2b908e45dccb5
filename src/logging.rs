//! Tracing subscriber setup for the binary.
//!
//! Frames sent and received are logged at `debug` by the `lanbox` module;
//! run with `-v` or `RUST_LOG=debug` to see them. Directives in `RUST_LOG`
//! take precedence over the default level.

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;
use crate::error::{AppError, Result};

/// Install the global subscriber: console always, plus a daily-rotated
/// `lanbox.log` when a log directory is configured.
///
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init(config: &LoggingConfig, level: Level) -> Result<Option<WorkerGuard>> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env.as_deref(), level);

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "lanbox.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::config(format!("Failed to install logger: {e}")))?;

    Ok(guard)
}

/// `level` applies unless `directives` set a global level of their own.
fn build_filter(directives: Option<&str>, level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(directives.unwrap_or_default())
}
