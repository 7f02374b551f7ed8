//! Error types for the reflector and probe tools.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Terminal failures of the reflector loop.
///
/// None of these are retried: the reflector has no degraded mode without a
/// working socket and relies on a supervisor to restart it.
#[derive(Debug, Error)]
pub enum ReflectorError {
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("socket receive failed: {0}")]
    Receive(#[source] io::Error),

    #[error("failed to echo datagram to {to}: {source}")]
    Echo {
        to: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Invalid command-line configuration. Fatal before any socket is bound.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not a valid UDP endpoint")]
    InvalidEndpoint(String),

    #[error("timeout must be at least 1 msec, got {0}")]
    InvalidTimeout(u64),

    #[error("reset must be at least 1 second, got {0}")]
    InvalidReset(u64),

    #[error("buffer must be at least 1 byte, got {0}")]
    InvalidBuffer(usize),

    #[error("interval must be at least 1 microsecond, got {0}")]
    InvalidInterval(u64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::InvalidEndpoint("nowhere:1".to_string()).to_string(),
            "nowhere:1 is not a valid UDP endpoint"
        );
        assert_eq!(
            ConfigError::InvalidTimeout(0).to_string(),
            "timeout must be at least 1 msec, got 0"
        );
    }

    #[test]
    fn test_echo_error_keeps_source() {
        let to: SocketAddr = "127.0.0.1:36000".parse().unwrap();
        let err = ReflectorError::Echo {
            to,
            source: io::Error::new(io::ErrorKind::BrokenPipe, "closed"),
        };
        assert!(err.to_string().contains("127.0.0.1:36000"));
        assert!(err.source().is_some());
    }
}
