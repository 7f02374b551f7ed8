//! Reflector control loop
//!
//! One sequential loop owns the socket and the `StreamState`:
//!
//! 1. If silence since the last datagram exceeds the reset threshold, rearm
//!    the stream (indefinite wait).
//! 2. Wait for a datagram, indefinitely while awaiting the first packet,
//!    otherwise up to the escalating deadline.
//! 3. Datagram: update state and echo the payload to its sender.
//!    Timeout: report the silence and escalate.
//!    Any other error: stop with `ReflectorError`.

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::config::ReflectorConfig;
use crate::error::ReflectorError;
use crate::event::{EventSink, ReflectorEvent};
use crate::shutdown::ShutdownCheck;
use crate::state::StreamState;
use crate::transport::{DatagramSocket, RecvResult};

// ============================================================================
// Decision
// ============================================================================

/// What the loop must do after one receive.
#[derive(Debug)]
pub enum Step {
    /// Echo the first `len` bytes of the buffer to `to`
    Echo { len: usize, to: SocketAddr, first: bool },
    /// A deadline of `waited` expired after `elapsed` total silence
    Silent { elapsed: Duration, waited: Duration },
    /// Nothing to do (woken, or a stray timeout while awaiting)
    Idle,
    /// Terminal socket failure
    Fatal(ReflectorError),
}

/// Apply one receive result to the state. Pure apart from `state`.
pub fn decide(
    state: &mut StreamState,
    result: RecvResult,
    now: Instant,
) -> Step {
    match result {
        RecvResult::Received { len, from } => {
            let first = state.record_datagram(now, from);
            Step::Echo { len, to: from, first }
        }
        RecvResult::TimedOut => match state.read_timeout() {
            Some(waited) => {
                let elapsed = state.record_timeout(now);
                Step::Silent { elapsed, waited }
            }
            None => Step::Idle,
        },
        RecvResult::Woken => Step::Idle,
        RecvResult::Failed(e) => Step::Fatal(ReflectorError::Receive(e)),
    }
}

// ============================================================================
// Reflector
// ============================================================================

/// UDP reflector: echoes every datagram and tracks stream silence.
pub struct Reflector<S, C> {
    socket: S,
    clock: C,
    state: StreamState,
    buf: Vec<u8>,
}

impl<S: DatagramSocket, C: Clock> Reflector<S, C> {
    /// Create the reflector. The stream state starts at `clock.now()`.
    pub fn new(socket: S, clock: C, config: &ReflectorConfig) -> Self {
        let state = StreamState::new(
            clock.now(),
            config.base_timeout_millis,
            config.reset_after,
        );
        Reflector {
            socket,
            clock,
            state,
            buf: vec![0u8; config.buffer_size],
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    /// Run until shutdown (`Ok`) or a fatal socket error (`Err`).
    pub fn run(
        &mut self,
        sink: &mut impl EventSink,
        shutdown: &impl ShutdownCheck,
    ) -> Result<(), ReflectorError> {
        let local = self.socket.local_addr().map_err(ReflectorError::Receive)?;
        sink.emit(ReflectorEvent::Started {
            local,
            base_timeout_millis: self.state.base_timeout_millis(),
            reset_after: self.state.reset_after(),
        });
        sink.emit(ReflectorEvent::WaitingForStream);

        loop {
            if shutdown.should_stop() {
                sink.emit(ReflectorEvent::Stopped);
                return Ok(());
            }
            self.turn(sink)?;
        }
    }

    /// One loop iteration: reset check, wait, act on the result.
    pub fn turn(&mut self, sink: &mut impl EventSink) -> Result<(), ReflectorError> {
        if let Some(silence) = self.state.check_reset(self.clock.now()) {
            sink.emit(ReflectorEvent::Reset { silence });
            sink.emit(ReflectorEvent::WaitingForStream);
        }

        let timeout = self.state.read_timeout();
        let result = self.socket.recv(&mut self.buf, timeout);

        match decide(&mut self.state, result, self.clock.now()) {
            Step::Echo { len, to, first } => {
                if first {
                    sink.emit(ReflectorEvent::FirstPacket { from: to });
                }
                if len == self.buf.len() {
                    sink.emit(ReflectorEvent::BufferFilled {
                        from: to,
                        capacity: len,
                    });
                }
                self.echo(len, to)
                    .map_err(|source| ReflectorError::Echo { to, source })?;
                sink.emit(ReflectorEvent::Echoed { to, len });
            }
            Step::Silent { elapsed, waited } => {
                sink.emit(ReflectorEvent::Silence { elapsed, waited });
            }
            Step::Idle => {}
            Step::Fatal(e) => return Err(e),
        }
        Ok(())
    }

    /// Send the first `len` bytes of the buffer, waiting out a full send
    /// buffer instead of failing.
    fn echo(&mut self, len: usize, to: SocketAddr) -> io::Result<()> {
        loop {
            match self.socket.send_to(&self.buf[..len], to) {
                Ok(_) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.socket.wait_writable()?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
