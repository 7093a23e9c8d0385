//! Tracing subscriber setup
//!
//! Used by the binary only; the library just emits `tracing` events.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the global tracing subscriber writing to `log_file_path`.
///
/// `RUST_LOG` overrides `default_filter`. Returns `false` when the log file
/// cannot be created or a subscriber is already installed.
pub fn init_global(log_file_path: &Path, default_filter: &str) -> bool {
    if let Some(parent) = log_file_path.parent() {
        if std::fs::create_dir_all(parent).is_err() {
            return false;
        }
    }
    let Ok(log_file) = File::create(log_file_path) else {
        return false;
    };
    build_subscriber(log_file, default_filter).try_init().is_ok()
}

/// Subscriber with an env filter and a plain-text file layer
pub fn build_subscriber(
    log_file: File,
    default_filter: &str,
) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
