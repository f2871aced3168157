use std::env;
use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "CHANNEL_FEED_LOG";
pub const LOG_FILE_ENV: &str = "CHANNEL_FEED_LOG_FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Plain output modes; diagnostics go to stderr.
    Stderr,
    /// The terminal UI owns the screen, so only a log file is used.
    FileOnly,
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
}

pub fn init(target: Target) {
    if let Ok(path) = env::var(LOG_FILE_ENV) {
        if !path.trim().is_empty() {
            match OpenOptions::new().create(true).append(true).open(path.trim()) {
                Ok(file) => {
                    let _ = tracing_subscriber::fmt()
                        .with_env_filter(filter())
                        .with_ansi(false)
                        .with_writer(Mutex::new(file))
                        .try_init();
                    return;
                }
                Err(err) => {
                    if target == Target::Stderr {
                        eprintln!("Failed to open log file {}: {err}", path.trim());
                    }
                }
            }
        }
    }

    if target == Target::Stderr {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .try_init();
    }
}
