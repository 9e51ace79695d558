//! Logging setup
//!
//! The library only emits `tracing` events; a host installs a subscriber
//! once at startup with [`init`]. Logging stays off unless `MDNOTES_LOG`
//! is set, so an embedding UI is not spammed on stderr by default.

use std::fs::File;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Environment variable holding the log level (`debug`, `info`, ...)
pub const LOG_ENV: &str = "MDNOTES_LOG";

/// Install the global subscriber if `MDNOTES_LOG` is set
///
/// Logs go to `config.log_file` when configured, stderr otherwise.
/// Returns `true` if a subscriber was installed by this call.
pub fn init(config: &Config) -> bool {
    let Ok(level) = std::env::var(LOG_ENV) else {
        return false;
    };
    let filter = EnvFilter::new(format!("mdnotes_core={}", level));

    let installed = match &config.log_file {
        Some(path) => {
            let file = match File::create(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", path, e);
                    return false;
                }
            };
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .is_ok()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    };

    if installed {
        info!(level = %level, file = ?config.log_file, "Logging initialized");
    }
    installed
}
