//! Periodic probe loop
//!
//! Every interval the prober sends one timestamp datagram, then collects
//! echoes until the next send is due. Send and read errors are counted,
//! never fatal: the prober is the side that tolerates loss.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use stream_monitor::wire::{decode_timestamp, encode_timestamp};
use stream_monitor::{Clock, DatagramSocket, RecvResult, ShutdownCheck};

/// Receive buffer for echoes
const ECHO_BUFFER_SIZE: usize = 2048;

// ============================================================================
// Config and Stats
// ============================================================================

/// Resolved probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub target: SocketAddr,
    pub interval: Duration,
    /// `None` runs until shutdown
    pub quit_after: Option<Duration>,
}

/// Counters for one probe run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProbeStats {
    pub sent: u64,
    pub received: u64,
    pub write_errors: u64,
    pub read_errors: u64,
    pub rtt_min: Option<Duration>,
    pub rtt_max: Option<Duration>,
    rtt_total: Duration,
    rtt_samples: u64,
}

impl ProbeStats {
    pub fn record_rtt(&mut self, rtt: Duration) {
        self.rtt_min = Some(self.rtt_min.map_or(rtt, |m| m.min(rtt)));
        self.rtt_max = Some(self.rtt_max.map_or(rtt, |m| m.max(rtt)));
        self.rtt_total += rtt;
        self.rtt_samples += 1;
    }

    pub fn rtt_avg(&self) -> Option<Duration> {
        if self.rtt_samples == 0 {
            return None;
        }
        let avg = self.rtt_total.as_nanos() / u128::from(self.rtt_samples);
        Some(Duration::from_nanos(u64::try_from(avg).unwrap_or(u64::MAX)))
    }

    pub fn log_summary(&self) {
        log::info!(
            "Total sent: {}, total received: {}",
            self.sent,
            self.received
        );
        log::info!(
            "Write errors: {}, read errors: {}",
            self.write_errors,
            self.read_errors
        );
        if let (Some(min), Some(avg), Some(max)) = (self.rtt_min, self.rtt_avg(), self.rtt_max) {
            log::info!(
                "RTT min/avg/max: {} / {} / {} µs",
                min.as_micros(),
                avg.as_micros(),
                max.as_micros()
            );
        }
    }
}

// ============================================================================
// Prober
// ============================================================================

pub struct Prober<S, C> {
    socket: S,
    clock: C,
    config: ProbeConfig,
    buf: Vec<u8>,
}

impl<S: DatagramSocket, C: Clock> Prober<S, C> {
    pub fn new(socket: S, clock: C, config: ProbeConfig) -> Self {
        Prober {
            socket,
            clock,
            config,
            buf: vec![0u8; ECHO_BUFFER_SIZE],
        }
    }

    #[cfg(test)]
    pub fn socket(&self) -> &S {
        &self.socket
    }

    /// Probe until the run length elapses or shutdown is requested.
    pub fn run(&mut self, shutdown: &impl ShutdownCheck) -> ProbeStats {
        let started = self.clock.now();
        let mut stats = ProbeStats::default();

        loop {
            if shutdown.should_stop() {
                log::info!("Shutdown requested, stopping probes");
                break;
            }
            if let Some(quit_after) = self.config.quit_after {
                if self.clock.now().saturating_duration_since(started) > quit_after {
                    log::info!(
                        "Reached the end of my {} second run.",
                        quit_after.as_secs()
                    );
                    break;
                }
            }

            self.send_probe(&mut stats);
            let deadline = self.clock.now() + self.config.interval;
            self.collect_echoes(deadline, &mut stats);
        }

        stats
    }

    fn send_probe(&mut self, stats: &mut ProbeStats) {
        let timestamp = self.clock.unix_nanos();
        println!(">> {}", timestamp);

        stats.sent += 1;
        if let Err(e) = self
            .socket
            .send_to(&encode_timestamp(timestamp), self.config.target)
        {
            stats.write_errors += 1;
            log::warn!("Send to {} failed: {}", self.config.target, e);
        }
    }

    /// Read echoes until `deadline`. Returns early if woken.
    fn collect_echoes(&mut self, deadline: Instant, stats: &mut ProbeStats) {
        loop {
            let remaining = deadline.saturating_duration_since(self.clock.now());
            if remaining.is_zero() {
                return;
            }

            match self.socket.recv(&mut self.buf, Some(remaining)) {
                RecvResult::Received { len, from } => {
                    if from != self.config.target {
                        log::debug!("Ignoring {} bytes from unexpected peer {}", len, from);
                        continue;
                    }
                    stats.received += 1;
                    self.record_echo(len, stats);
                }
                RecvResult::TimedOut | RecvResult::Woken => return,
                RecvResult::Failed(e) => {
                    stats.read_errors += 1;
                    log::warn!("Receive failed: {}", e);
                }
            }
        }
    }

    fn record_echo(&mut self, len: usize, stats: &mut ProbeStats) {
        let Some(sent_at) = decode_timestamp(&self.buf[..len]) else {
            log::debug!("Echo of {} bytes is too short for a timestamp", len);
            return;
        };
        println!("<< {}", sent_at);

        let now = self.clock.unix_nanos();
        match now.checked_sub(sent_at) {
            Some(rtt) => stats.record_rtt(Duration::from_nanos(rtt)),
            None => log::debug!("Echoed timestamp {} is in the future", sent_at),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
