//! Tracing bootstrap for hosts and test binaries. The engine itself only
//! emits spans and events; nothing in the library installs a subscriber
//! implicitly.

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Flush guard for the non-blocking file writer. Hold it for the process
/// lifetime when file logging is enabled.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

pub fn file_logging_enabled() -> bool {
    std::env::var("MEMSPAN_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

/// Installs the global tracing subscriber: a stdout layer always, plus a
/// daily-rolling file under `MEMSPAN_LOG_DIR` when `MEMSPAN_FILE_LOGS` is
/// set. Returns `None` without touching anything if a subscriber is
/// already installed, so repeated calls across tests are harmless.
pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match file_logging_enabled().then(file_writer) {
        Some(Ok((writer, guard))) => {
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(FileLogGuard { _guard: guard }))
        }
        Some(Err(err)) => {
            eprintln!("file logging disabled: {err}");
            (None, None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .ok()?;

    guard
}

fn file_writer() -> std::io::Result<(NonBlocking, WorkerGuard)> {
    let log_dir = std::env::var("MEMSPAN_LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&log_dir)?;
    let appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "memspan.log");
    Ok(tracing_appender::non_blocking(appender))
}
