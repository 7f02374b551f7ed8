//! Logging backend selection.
//!
//! All code logs through the `log` facade. Binaries pick the backend once at
//! startup: `env_logger` on stderr (honouring `RUST_LOG`), or the local
//! system log.

use log::LevelFilter;

/// Initialise logging for a binary named `ident`.
///
/// If the system log is requested but cannot be opened, falls back to
/// `env_logger` and says so.
pub fn init(use_syslog: bool, ident: &str) {
    if !use_syslog {
        init_env_logger();
        return;
    }

    if let Err(e) = init_syslog(ident) {
        init_env_logger();
        log::warn!("Could not open syslog ({}), logging to stderr", e);
    }
}

fn init_env_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(unix)]
fn init_syslog(ident: &str) -> Result<(), Box<dyn std::error::Error>> {
    use syslog::{BasicLogger, Facility, Formatter3164};

    let formatter = Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: ident.to_string(),
        pid: std::process::id(),
    };
    let logger = syslog::unix(formatter).map_err(|e| e.to_string())?;

    log::set_boxed_logger(Box::new(BasicLogger::new(logger)))?;
    log::set_max_level(LevelFilter::Info);
    Ok(())
}

#[cfg(not(unix))]
fn init_syslog(_ident: &str) -> Result<(), Box<dyn std::error::Error>> {
    Err("syslog is only available on unix".into())
}
