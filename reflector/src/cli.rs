//! Command-line interface for the reflector.

use std::net::SocketAddr;

use clap::Parser;
use stream_monitor::config::{
    DEFAULT_BUFFER_SIZE, DEFAULT_PORT, DEFAULT_RESET_SECS, DEFAULT_TIMEOUT_MS,
};
use stream_monitor::{resolve_endpoint, ConfigError, ReflectorConfig};

/// UDP reflector - echoes every datagram and logs stream silence.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "udp-reflector")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Local address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    pub ip: String,

    /// Local UDP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Base inactivity timeout in msec. Successive silence notices escalate
    /// along the Fibonacci sequence from this unit.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout: u64,

    /// Seconds of silence after which the stream is considered over.
    #[arg(long, default_value_t = DEFAULT_RESET_SECS)]
    pub reset: u64,

    /// Receive buffer in bytes. Longer datagrams are truncated.
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    pub buffer: usize,

    /// Log to syslog instead of stderr.
    #[arg(long)]
    pub syslog: bool,
}

impl Cli {
    /// Validate arguments and resolve the bind address.
    pub fn resolve(&self) -> Result<(SocketAddr, ReflectorConfig), ConfigError> {
        let config = ReflectorConfig::from_cli(self.timeout, self.reset, self.buffer)?;
        let addr = resolve_endpoint(&self.ip, self.port)?;
        Ok((addr, config))
    }
}
