//! Structured reflector events and their log rendering.

use std::net::SocketAddr;
use std::time::Duration;

/// Transitions and notices emitted by the reflector loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReflectorEvent {
    /// Startup banner
    Started {
        local: SocketAddr,
        base_timeout_millis: u64,
        reset_after: Duration,
    },
    /// Blocking indefinitely until a stream starts
    WaitingForStream,
    /// First datagram of a stream
    FirstPacket { from: SocketAddr },
    /// A datagram was echoed back
    Echoed { to: SocketAddr, len: usize },
    /// A datagram filled the whole receive buffer and may have been truncated
    BufferFilled { from: SocketAddr, capacity: usize },
    /// A read deadline of `waited` expired; `elapsed` is total silence so far
    Silence { elapsed: Duration, waited: Duration },
    /// Silence exceeded the reset threshold and the stream was rearmed
    Reset { silence: Duration },
    /// Shutdown requested
    Stopped,
}

/// Receiver of reflector events.
pub trait EventSink {
    fn emit(&mut self, event: ReflectorEvent);
}

/// Records events in order. Handy for embedding and tests.
impl EventSink for Vec<ReflectorEvent> {
    fn emit(&mut self, event: ReflectorEvent) {
        self.push(event);
    }
}

/// Renders events through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, event: ReflectorEvent) {
        match event {
            ReflectorEvent::Started {
                local,
                base_timeout_millis,
                reset_after,
            } => {
                log::info!(
                    "Reflecting on {} and logging inactivity > {}msec (reset after {}s)",
                    local,
                    base_timeout_millis,
                    reset_after.as_secs()
                );
            }
            ReflectorEvent::WaitingForStream => log::info!("Waiting for stream ..."),
            ReflectorEvent::FirstPacket { from } => {
                log::info!("Received first packet from {}", from)
            }
            ReflectorEvent::Echoed { to, len } => log::trace!("Echoed {} bytes to {}", len, to),
            ReflectorEvent::BufferFilled { from, capacity } => {
                log::debug!(
                    "Datagram from {} filled the {} byte buffer, payload may be truncated",
                    from,
                    capacity
                );
            }
            ReflectorEvent::Silence { elapsed, waited } => {
                log::info!(
                    "Silence of {} msec (waited {} msec)",
                    elapsed.as_millis(),
                    waited.as_millis()
                );
            }
            ReflectorEvent::Reset { silence } => {
                log::warn!(
                    "Reset after {} msec of silence",
                    silence.as_millis()
                );
            }
            ReflectorEvent::Stopped => log::info!("Shutdown requested, stopping reflector"),
        }
    }
}
