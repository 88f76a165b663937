//! Logging setup: file output with size-based rotation plus stdout
//!
//! Logs go to `~/.config/cuebot/cuebot.log` (or the platform equivalent),
//! rotated at 10 MB. `DEBUG_LOGGING=1` enables debug output for the cuebot
//! crates.

use std::path::PathBuf;

use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

fn filter(debug_logging: bool) -> EnvFilter {
    if debug_logging {
        EnvFilter::new("info,cuebot_cli=debug,cuebot_core=debug")
    } else {
        EnvFilter::new("info")
    }
}

/// Install the global subscriber.
///
/// Returns the `WorkerGuard` for the file writer; hold it for the process
/// lifetime so buffered lines are flushed on exit. Returns `None` (after
/// installing stdout-only logging) if the log file can't be opened.
pub fn init() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();

    let Some(log_path) = log_path() else {
        init_stdout_only(debug_logging);
        return None;
    };

    let file_appender = match BasicRollingFileAppender::new(
        &log_path,
        RollingConditionBasic::new().max_size(MAX_LOG_BYTES),
        1, // cuebot.log and cuebot.log.1
    ) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Failed to create log file at {:?}: {}", log_path, e);
            init_stdout_only(debug_logging);
            return None;
        }
    };
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .with(filter(debug_logging))
        .init();

    tracing::info!(log_file = ?log_path, debug_logging, "Logging initialized");
    Some(guard)
}

fn log_path() -> Option<PathBuf> {
    let log_dir = dirs::config_dir()?.join("cuebot");
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        // No subscriber yet
        eprintln!("Failed to create log directory {:?}: {}, using stdout only", log_dir, e);
        return None;
    }
    Some(log_dir.join("cuebot.log"))
}

fn init_stdout_only(debug_logging: bool) {
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(filter(debug_logging))
        .init();

    tracing::info!(debug_logging, "Logging initialized (stdout only)");
}
