//! Command-line interface for the probe generator.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use stream_monitor::config::DEFAULT_PORT;
use stream_monitor::{resolve_endpoint, ConfigError};

use crate::probe::ProbeConfig;

/// Default microseconds between sends
pub const DEFAULT_INTERVAL_US: u64 = 500;

/// Default run length in seconds
pub const DEFAULT_QUIT_SECS: u64 = 300;

/// UDP probe generator - sends timestamps to a reflector and reports echoes.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "udp-injector")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Reflector host to ping with UDP traffic.
    #[arg(long, default_value = "127.0.0.1")]
    pub target: String,

    /// UDP port to send traffic on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Microseconds between UDP sends.
    #[arg(long, default_value_t = DEFAULT_INTERVAL_US)]
    pub interval: u64,

    /// Seconds after which to quit. 0 runs until interrupted.
    #[arg(long, default_value_t = DEFAULT_QUIT_SECS)]
    pub quit: u64,

    /// Log to syslog instead of stderr.
    #[arg(long)]
    pub syslog: bool,
}

impl Cli {
    /// Validate arguments and resolve the target.
    pub fn resolve(&self) -> Result<ProbeConfig, ConfigError> {
        if self.interval == 0 {
            return Err(ConfigError::InvalidInterval(self.interval));
        }
        let target: SocketAddr = resolve_endpoint(&self.target, self.port)?;
        Ok(ProbeConfig {
            target,
            interval: Duration::from_micros(self.interval),
            quit_after: (self.quit > 0).then(|| Duration::from_secs(self.quit)),
        })
    }
}
