//! Diagnostic logging setup
//!
//! Logging stays off unless `PAGEMARK_LOG` is set. A bare level such as
//! `debug` applies to both pagemark crates; anything containing `=` is
//! passed to the filter unchanged.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::EnvFilter;

use pagemark_core::Config;

/// Environment variable enabling logs
const LOG_ENV: &str = "PAGEMARK_LOG";

/// Initialize logging from `PAGEMARK_LOG`
///
/// Logs go to `config.log_file` when set, otherwise to stderr.
pub fn init(config: &Config) {
    let Ok(log_level) = std::env::var(LOG_ENV) else {
        return;
    };
    let env_filter = EnvFilter::new(filter_directives(&log_level));

    match config.log_file {
        Some(ref log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file))
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

fn filter_directives(log_level: &str) -> String {
    if log_level.contains('=') {
        log_level.to_string()
    } else {
        format!("pagemark_core={},pagemark={}", log_level, log_level)
    }
}
