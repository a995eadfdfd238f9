// SPDX-License-Identifier: Apache-2.0

//! Logging and observability helpers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, SystemTime};

use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "federa.log";

/// Installs the global JSON subscriber writing to a daily rolling file.
///
/// `RUST_LOG` wins over the configured filter. Calling this twice keeps the
/// first subscriber and the first panic hook. Returns the directory logs are
/// written to.
pub fn init_tracing(config: &LoggingConfig) -> PathBuf {
    let log_dir = log_directory(config);
    let _ = fs::create_dir_all(&log_dir);

    // 1. Clean up old logs
    if let Err(e) = cleanup_old_logs(&log_dir, config.retention_days) {
        eprintln!("Failed to clean up old logs: {}", e);
    }

    // 2. Setup file appender
    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("federa=info"));

    // 3. Setup subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file_appender)
        .json()
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();

    // 4. Register panic hook
    install_panic_hook();

    tracing::info!("Tracing initialized. Logs directory: {:?}", log_dir);
    log_dir
}

static PANIC_HOOK: Once = Once::new();

/// Chains a hook that logs panics in front of the current one.
///
/// Only the first call installs it. Returns whether this call did.
fn install_panic_hook() -> bool {
    let mut installed = false;
    PANIC_HOOK.call_once(|| {
        installed = true;
        let previous_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let payload = panic_info.payload();
            let location = panic_info
                .location()
                .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
                .unwrap_or_else(|| "unknown".to_string());

            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                format!("PANIC: {}", s)
            } else if let Some(s) = payload.downcast_ref::<String>() {
                format!("PANIC: {}", s)
            } else {
                "PANIC: unknown cause".to_string()
            };

            tracing::error!(target: "panic", location = %location, message = %msg, "Federation panicked");

            previous_hook(panic_info);
        }));
    });
    installed
}

/// Configured directory, else `<data dir>/federa/logs`, else `./logs`.
pub fn log_directory(config: &LoggingConfig) -> PathBuf {
    if let Some(dir) = &config.directory {
        return dir.clone();
    }
    match dirs::data_local_dir() {
        Some(mut path) => {
            path.push("federa");
            path.push("logs");
            path
        }
        None => PathBuf::from("logs"),
    }
}

/// Removes rolled log files whose last modification is older than the window.
fn cleanup_old_logs(log_dir: &Path, retention_days: u64) -> std::io::Result<usize> {
    let entries = fs::read_dir(log_dir)?;
    let now = SystemTime::now();
    let retention_duration = Duration::from_secs(retention_days * 24 * 60 * 60);
    let mut removed = 0;

    for entry in entries {
        let path = entry?.path();

        let is_log = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(LOG_FILE_PREFIX))
            .unwrap_or(false);
        if !is_log {
            continue;
        }

        let age = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());

        if matches!(age, Some(age) if age > retention_duration) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => eprintln!("Failed to remove old log file {:?}: {}", path, e),
            }
        }
    }
    Ok(removed)
}
