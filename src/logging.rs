//! Logging setup
//!
//! The TUI owns the terminal, so interactive runs log to a file. Headless
//! runs log to stderr. Set `RUST_LOG=debug` for request details.

use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to `oprobe.log` in the state directory; logging stays off if the file cannot be created
pub fn init_file_logging() {
    let log_path = log_path();

    if let Some(parent) = log_path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            eprintln!("Warning: Could not create log directory: {e}");
            return;
        }
    }

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {e}");
            return;
        }
    };

    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(log_file))
                .with_ansi(false),
        )
        .init();
}

/// Log to stderr, keeping stdout for results
pub fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Returns the path for the log file.
pub fn log_path() -> PathBuf {
    if let Some(state_dir) = dirs::state_dir() {
        return state_dir.join("oprobe").join("oprobe.log");
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("oprobe").join("oprobe.log");
    }

    std::env::temp_dir().join("oprobe.log")
}
