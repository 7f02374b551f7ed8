//! Stream silence state machine
//!
//! The reflector tracks a single logical stream with two phases:
//!
//! ```text
//!                 datagram
//!   AwaitingFirst ─────────► Active ──┐ timeout: advance (a, b) -> (b, a+b)
//!        ▲                     │  ▲   │
//!        │ silence > reset     │  └───┘
//!        └─────────────────────┘
//! ```
//!
//! While awaiting, the read blocks indefinitely. While active, each read
//! waits `base * (1 + a)` milliseconds, so consecutive timeouts wait
//! 1, 2, 2, 3, 4, 6, 9, ... times the base and silence notices thin out
//! the longer a stream stays quiet.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

// ============================================================================
// Escalation
// ============================================================================

/// Seed of the escalation sequence.
pub const FIB_SEED: (u64, u64) = (0, 1);

/// Two consecutive Fibonacci numbers, advanced once per consecutive timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Escalation {
    a: u64,
    b: u64,
}

impl Escalation {
    pub fn new() -> Self {
        Self {
            a: FIB_SEED.0,
            b: FIB_SEED.1,
        }
    }

    /// Current `(a, b)` pair.
    pub fn pair(&self) -> (u64, u64) {
        (self.a, self.b)
    }

    /// Step to the next pair. Saturates instead of wrapping, keeping `a <= b`.
    pub fn advance(&mut self) {
        let next = self.a.saturating_add(self.b);
        self.a = self.b;
        self.b = next;
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Multiplier applied to the base timeout: `1 + a`.
    pub fn multiplier(&self) -> u64 {
        self.a.saturating_add(1)
    }
}

impl Default for Escalation {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Stream State
// ============================================================================

/// Phase of the monitored stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No datagram seen since start or since the last reset
    AwaitingFirst,
    /// Traffic has been seen; reads use escalating deadlines
    Active,
}

/// All state of the reflector control loop.
#[derive(Debug, Clone)]
pub struct StreamState {
    /// Most recent successful receive (start time until the first one)
    last_received: Instant,
    /// True until the first datagram of a stream, and again after a reset
    awaiting_first_packet: bool,
    escalation: Escalation,
    base_timeout_millis: u64,
    reset_after: Duration,
    /// Sender of the most recent datagram; echoes go here
    remote_endpoint: Option<SocketAddr>,
}

impl StreamState {
    /// Create the state at reflector startup.
    pub fn new(started: Instant, base_timeout_millis: u64, reset_after: Duration) -> Self {
        Self {
            last_received: started,
            awaiting_first_packet: true,
            escalation: Escalation::new(),
            base_timeout_millis,
            reset_after,
            remote_endpoint: None,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.awaiting_first_packet {
            Phase::AwaitingFirst
        } else {
            Phase::Active
        }
    }

    pub fn is_awaiting_first_packet(&self) -> bool {
        self.awaiting_first_packet
    }

    pub fn escalation(&self) -> Escalation {
        self.escalation
    }

    pub fn last_received(&self) -> Instant {
        self.last_received
    }

    pub fn remote_endpoint(&self) -> Option<SocketAddr> {
        self.remote_endpoint
    }

    pub fn base_timeout_millis(&self) -> u64 {
        self.base_timeout_millis
    }

    pub fn reset_after(&self) -> Duration {
        self.reset_after
    }

    /// Time since the last successful receive.
    pub fn silence(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_received)
    }

    /// Force the stream back to `AwaitingFirst` once silence exceeds the
    /// reset threshold.
    ///
    /// Returns the silence duration when this call moved an active stream
    /// back to awaiting. An already-awaiting stream stays put and reports
    /// nothing.
    pub fn check_reset(&mut self, now: Instant) -> Option<Duration> {
        let silence = self.silence(now);
        if silence <= self.reset_after || self.awaiting_first_packet {
            return None;
        }
        self.awaiting_first_packet = true;
        self.escalation.reset();
        Some(silence)
    }

    /// Read timeout for the next wait. `None` blocks indefinitely.
    pub fn read_timeout(&self) -> Option<Duration> {
        if self.awaiting_first_packet {
            return None;
        }
        let millis = self
            .base_timeout_millis
            .saturating_mul(self.escalation.multiplier());
        Some(Duration::from_millis(millis))
    }

    /// Record a received datagram.
    ///
    /// Returns true on the `AwaitingFirst -> Active` edge.
    pub fn record_datagram(&mut self, now: Instant, from: SocketAddr) -> bool {
        let first = self.awaiting_first_packet;
        self.remote_endpoint = Some(from);
        self.last_received = now;
        self.escalation.reset();
        self.awaiting_first_packet = false;
        first
    }

    /// Record an expired read deadline and escalate. Returns the silence so far.
    pub fn record_timeout(&mut self, now: Instant) -> Duration {
        self.escalation.advance();
        self.silence(now)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_escalation_follows_fibonacci() {
        let mut esc = Escalation::new();
        let mut pairs = vec![esc.pair()];
        for _ in 0..6 {
            esc.advance();
            pairs.push(esc.pair());
        }
        assert_eq!(
            pairs,
            vec![(0, 1), (1, 1), (1, 2), (2, 3), (3, 5), (5, 8), (8, 13)]
        );
    }

    #[test]
    fn test_escalation_after_four_timeouts() {
        let mut esc = Escalation::new();
        for _ in 0..4 {
            esc.advance();
        }
        assert_eq!(esc.pair(), (3, 5));
        assert_eq!(esc.multiplier(), 4);
    }

    #[test]
    fn test_escalation_saturates() {
        let mut esc = Escalation::new();
        for _ in 0..200 {
            esc.advance();
            let (a, b) = esc.pair();
            assert!(a <= b);
        }
        assert_eq!(esc.pair().1, u64::MAX);
    }

    #[test]
    fn test_new_state_awaits_first_packet() {
        let start = Instant::now();
        let state = StreamState::new(start, 100, Duration::from_secs(5));

        assert_eq!(state.phase(), Phase::AwaitingFirst);
        assert_eq!(state.read_timeout(), None);
        assert_eq!(state.last_received(), start);
        assert_eq!(state.remote_endpoint(), None);
        assert_eq!(state.escalation().pair(), FIB_SEED);
    }

    #[test]
    fn test_first_datagram_activates_stream() {
        let start = Instant::now();
        let mut state = StreamState::new(start, 100, Duration::from_secs(5));

        let now = start + Duration::from_millis(10);
        assert!(state.record_datagram(now, addr(4000)));
        assert_eq!(state.phase(), Phase::Active);
        assert_eq!(state.remote_endpoint(), Some(addr(4000)));
        assert_eq!(state.last_received(), now);
        assert_eq!(state.read_timeout(), Some(Duration::from_millis(100)));

        // Only the first datagram of a stream reports the edge
        assert!(!state.record_datagram(now, addr(4001)));
        assert_eq!(state.remote_endpoint(), Some(addr(4001)));
    }

    #[test]
    fn test_timeouts_escalate_read_deadline() {
        let start = Instant::now();
        let mut state = StreamState::new(start, 100, Duration::from_secs(60));
        state.record_datagram(start, addr(4000));

        let mut deadlines = Vec::new();
        let mut now = start;
        for _ in 0..7 {
            let timeout = state.read_timeout().unwrap();
            deadlines.push(timeout.as_millis());
            now += timeout;
            state.record_timeout(now);
        }
        assert_eq!(deadlines, vec![100, 200, 200, 300, 400, 600, 900]);

        // Fifth deadline after four timeouts is 4x base
        assert_eq!(deadlines[4], 400);
    }

    #[test]
    fn test_record_timeout_reports_silence_since_last_receive() {
        let start = Instant::now();
        let mut state = StreamState::new(start, 100, Duration::from_secs(60));
        state.record_datagram(start + Duration::from_millis(50), addr(4000));

        let silence = state.record_timeout(start + Duration::from_millis(450));
        assert_eq!(silence, Duration::from_millis(400));
    }

    #[test]
    fn test_datagram_resets_escalation() {
        let start = Instant::now();
        let mut state = StreamState::new(start, 100, Duration::from_secs(60));
        state.record_datagram(start, addr(4000));
        for _ in 0..10 {
            state.record_timeout(start);
        }
        assert_eq!(state.escalation().pair(), (55, 89));

        state.record_datagram(start, addr(4000));
        assert_eq!(state.escalation().pair(), FIB_SEED);
        assert_eq!(state.read_timeout(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_reset_after_long_silence() {
        let start = Instant::now();
        let reset = Duration::from_secs(5);
        let mut state = StreamState::new(start, 100, reset);
        state.record_datagram(start, addr(4000));

        // At exactly the threshold nothing happens
        assert_eq!(state.check_reset(start + reset), None);
        assert_eq!(state.phase(), Phase::Active);

        let later = start + reset + Duration::from_millis(1);
        assert_eq!(state.check_reset(later), Some(reset + Duration::from_millis(1)));
        assert_eq!(state.phase(), Phase::AwaitingFirst);
        assert_eq!(state.read_timeout(), None);
    }

    #[test]
    fn test_reset_only_reported_on_edge() {
        let start = Instant::now();
        let mut state = StreamState::new(start, 100, Duration::from_secs(1));

        // Never active: no reset to report even after long idle
        assert_eq!(state.check_reset(start + Duration::from_secs(10)), None);

        state.record_datagram(start, addr(4000));
        let later = start + Duration::from_secs(2);
        assert!(state.check_reset(later).is_some());
        assert_eq!(state.check_reset(later), None);
    }

    #[test]
    fn test_deadline_saturates_for_huge_base() {
        let start = Instant::now();
        let mut state = StreamState::new(start, u64::MAX / 2, Duration::from_secs(60));
        state.record_datagram(start, addr(4000));
        for _ in 0..5 {
            state.record_timeout(start);
        }
        assert_eq!(state.read_timeout(), Some(Duration::from_millis(u64::MAX)));
    }
}
