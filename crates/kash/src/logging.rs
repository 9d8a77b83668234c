// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber setup for `kash serve`.

use kash_config::model::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Base name of the daily log file inside `logging.dir`.
const LOG_FILE_PREFIX: &str = "kash.log";

/// Default directive when `RUST_LOG` is unset.
fn default_directive(config: &LoggingConfig) -> &'static str {
    if config.debug {
        "kash=info,warn"
    } else {
        "kash=error,error"
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must outlive the
/// server.
pub fn init_tracing(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    match config.dir.as_deref().filter(|dir| !dir.trim().is_empty()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_names(false)
                .with_writer(std::io::stderr)
                .try_init();
            None
        }
    }
}
