//! UDP Reflector
//!
//! Echoes every received datagram back to its sender and logs stream
//! silence with Fibonacci-escalating read deadlines.
//!
//! Exit codes: 0 on SIGINT/SIGTERM, 1 on invalid configuration, 2 on a
//! fatal socket error.

use std::process::ExitCode;

use clap::Parser;
use stream_monitor::{
    ConfigError, LogSink, MioSocket, Reflector, ReflectorError, ShutdownFlag, SystemClock,
};
use thiserror::Error;

mod cli;

use cli::Cli;

/// Exit code constants.
mod codes {
    pub const SUCCESS: u8 = 0;
    pub const CONFIG_ERROR: u8 = 1;
    pub const SOCKET_ERROR: u8 = 2;
}

#[derive(Debug, Error)]
enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reflector(#[from] ReflectorError),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

fn exit_code(error: &CommandError) -> u8 {
    match error {
        CommandError::Config(_) => codes::CONFIG_ERROR,
        CommandError::Reflector(_) | CommandError::Signals(_) => codes::SOCKET_ERROR,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    stream_monitor::logging::init(cli.syslog, "udp-reflector");

    match run(&cli) {
        Ok(()) => ExitCode::from(codes::SUCCESS),
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<(), CommandError> {
    let (addr, config) = cli.resolve()?;

    let socket =
        MioSocket::bind(addr).map_err(|source| ReflectorError::Bind { addr, source })?;

    let shutdown = ShutdownFlag::new();
    #[cfg(unix)]
    let socket = {
        let mut socket = socket;
        let waker = shutdown.install().map_err(CommandError::Signals)?;
        socket.watch(waker).map_err(CommandError::Signals)?;
        socket
    };

    let mut reflector = Reflector::new(socket, SystemClock, &config);
    reflector.run(&mut LogSink, &shutdown)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config = CommandError::Config(ConfigError::InvalidReset(0));
        assert_eq!(exit_code(&config), codes::CONFIG_ERROR);

        let socket = CommandError::Reflector(ReflectorError::Receive(std::io::Error::new(
            std::io::ErrorKind::Other,
            "down",
        )));
        assert_eq!(exit_code(&socket), codes::SOCKET_ERROR);
    }

    #[test]
    fn test_bind_failure_is_socket_error() {
        // Two sockets cannot share a port without SO_REUSEPORT
        let Ok(taken) = std::net::UdpSocket::bind("127.0.0.1:0") else {
            return;
        };
        let port = taken.local_addr().unwrap().port();
        let cli = Cli::parse_from(["udp-reflector", "--ip", "127.0.0.1", "--port", &port.to_string()]);

        let err = run(&cli).unwrap_err();
        assert!(matches!(err, CommandError::Reflector(ReflectorError::Bind { .. })));
        assert_eq!(exit_code(&err), codes::SOCKET_ERROR);
    }
}
