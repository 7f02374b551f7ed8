//! Reflector configuration and endpoint resolution.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::error::ConfigError;

// ============================================================================
// Constants
// ============================================================================

/// Default UDP port shared by reflector and injector
pub const DEFAULT_PORT: u16 = 36000;

/// Default base read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Default silence before the stream is considered abandoned, in seconds
pub const DEFAULT_RESET_SECS: u64 = 120;

/// Default receive buffer. Longer datagrams are truncated to this size.
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

// ============================================================================
// Reflector Config
// ============================================================================

/// Tunables of the reflector control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectorConfig {
    /// Seed unit of the escalating read deadline
    pub base_timeout_millis: u64,
    /// Silence after which the stream is rearmed for a fresh start
    pub reset_after: Duration,
    /// Receive buffer capacity in bytes
    pub buffer_size: usize,
}

impl ReflectorConfig {
    /// Build a config from CLI units (msec, seconds, bytes) and validate it.
    pub fn from_cli(
        timeout_ms: u64,
        reset_secs: u64,
        buffer_size: usize,
    ) -> Result<Self, ConfigError> {
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(timeout_ms));
        }
        if reset_secs == 0 {
            return Err(ConfigError::InvalidReset(reset_secs));
        }
        if buffer_size == 0 {
            return Err(ConfigError::InvalidBuffer(buffer_size));
        }
        Ok(Self {
            base_timeout_millis: timeout_ms,
            reset_after: Duration::from_secs(reset_secs),
            buffer_size,
        })
    }
}

impl Default for ReflectorConfig {
    fn default() -> Self {
        Self {
            base_timeout_millis: DEFAULT_TIMEOUT_MS,
            reset_after: Duration::from_secs(DEFAULT_RESET_SECS),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Resolve `host:port` to a UDP endpoint, preferring IPv4.
pub fn resolve_endpoint(host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let endpoint = format!("{}:{}", host, port);
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|_| ConfigError::InvalidEndpoint(endpoint.clone()))?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or(ConfigError::InvalidEndpoint(endpoint))
}
