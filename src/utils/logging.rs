//! Operational logging
//!
//! Writes one line per event to stdout and appends the same lines to a single
//! log file. The file is never rotated; external logrotate is expected to
//! handle it.

use time::format_description::well_known::Rfc3339;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the logging system.
///
/// The level filter comes from `RUST_LOG` and defaults to `info`. If the log
/// file cannot be opened, logging continues on stdout only.
///
/// The returned `WorkerGuard` must be held in main so buffered file lines are
/// flushed on exit.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let (file_writer, guard) = match build_file_appender(config) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "Failed to open log file {}: {}; logging to stdout only",
                config.log_dir.join(&config.file_name).display(),
                e
            );
            (None, None)
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match config.format {
        LogFormat::Json => {
            let stdout_layer = fmt::layer().json().with_timer(UtcTime::new(Rfc3339));
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .json()
                    .with_timer(UtcTime::new(Rfc3339))
                    .with_ansi(false)
                    .with_writer(writer)
            });
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init()
        }
        LogFormat::Text => {
            let stdout_layer = fmt::layer().with_timer(UtcTime::new(Rfc3339));
            let file_layer = file_writer.map(|writer| {
                fmt::layer()
                    .with_timer(UtcTime::new(Rfc3339))
                    .with_ansi(false)
                    .with_writer(writer)
            });
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(file_layer)
                .try_init()
        }
    };

    if let Err(err) = result {
        // Detect "already initialized" via source downcasting
        use std::error::Error;
        let already_set = err
            .source()
            .and_then(|s| s.downcast_ref::<tracing::dispatcher::SetGlobalDefaultError>())
            .is_some();
        if !already_set {
            eprintln!("Failed to initialize tracing: {}", err);
        }
    }

    guard
}

/// Append-only appender for `<log_dir>/<file_name>`
fn build_file_appender(config: &LoggingConfig) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&config.file_name)
        .build(&config.log_dir)
}
