//! UDP Probe Generator
//!
//! Sends an 8-byte timestamp to a reflector every interval and prints each
//! timestamp sent (`>>`) and echoed back (`<<`). Logs a summary with
//! loss and round-trip statistics at the end of the run.

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use stream_monitor::{MioSocket, ShutdownFlag, SystemClock};

mod cli;
mod probe;

use cli::Cli;
use probe::Prober;

fn main() -> ExitCode {
    let cli = Cli::parse();
    stream_monitor::logging::init(cli.syslog, "udp-injector");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.resolve()?;

    log::info!(
        "Pinging {} with {} microsecond intervals for {} seconds.",
        config.target,
        cli.interval,
        cli.quit
    );

    // Ephemeral local port of the same family as the target
    let local: SocketAddr = if config.target.is_ipv4() {
        "0.0.0.0:0".parse()?
    } else {
        "[::]:0".parse()?
    };
    let socket = MioSocket::bind(local)?;

    let shutdown = ShutdownFlag::new();
    #[cfg(unix)]
    let socket = {
        let mut socket = socket;
        socket.watch(shutdown.install()?)?;
        socket
    };

    let mut prober = Prober::new(socket, SystemClock, config);
    let stats = prober.run(&shutdown);
    stats.log_summary();

    Ok(())
}
