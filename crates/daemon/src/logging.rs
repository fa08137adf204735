//! Tracing subscriber setup

use crate::config::{DaemonConfig, LogFormat};
use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "jsonify=info";
const LOG_FILE_PREFIX: &str = "jsonifyd.log";

/// Install the global subscriber
///
/// Console output is pretty or JSON per `log_format`. With `log_dir` set, a
/// daily-rotated JSON file is written as well; keep the returned guard alive
/// until exit or buffered lines are lost.
pub fn init(cfg: &DaemonConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .context("Failed to create env filter")?;

    let (pretty, json) = match cfg.log_format {
        LogFormat::Pretty => (Some(fmt::layer().pretty()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };

    let (file, guard) = match &cfg.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(json)
        .with(file);

    #[cfg(feature = "telemetry")]
    let registry = registry.with(crate::telemetry::layer()?);

    registry
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}
