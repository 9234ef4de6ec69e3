//! Logging setup for applications and the CLI
//!
//! The library only emits `tracing` events. `init` is for binaries that
//! want them in a daily-rotated file under
//! `$XDG_STATE_HOME/telemetrydeck/`; `RUST_LOG` overrides the configured
//! level.

use crate::config::{Config, LoggingConfig, LOG_FILE_NAME};
use crate::error::{Error, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Targets that log at the configured level; everything else (HTTP
/// internals mostly) stays at `warn`.
const OWN_TARGETS: &[&str] = &["telemetrydeck_core", "telemetrydeck", "telemetrydeck::diagnostics"];

/// Filter directives for `level`
fn directives(level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(OWN_TARGETS.iter().map(|target| format!("{}={}", target, level)));
    directives.join(",")
}

/// Install the file logger.
///
/// Fails if the state directory cannot be created or a global
/// subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directives(&config.level)))
        .map_err(|e| Error::Config(format!("invalid logging.level {:?}: {}", config.level, e)))?;

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("failed to install logger: {}", e)))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Send events to the test harness output; safe to call repeatedly
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Flushes buffered log lines when dropped
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}
