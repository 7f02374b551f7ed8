//! Clock abstraction for the reflector and probe loops.
//!
//! Both loops read time through the `Clock` trait so tests can drive them
//! with a clock that only moves when told to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of monotonic and wall-clock time.
pub trait Clock {
    /// Monotonic instant, used for deadlines and silence measurement.
    fn now(&self) -> Instant;

    /// Wall-clock nanoseconds since the Unix epoch, used for probe timestamps.
    fn unix_nanos(&self) -> u64;
}

/// Real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_nanos(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests.
///
/// Clones share the same offset, so a mock socket holding a clone can move
/// time forward when it simulates a timeout.
#[derive(Debug, Clone)]
pub struct MockClock {
    origin: Instant,
    epoch_nanos: u64,
    offset_nanos: Arc<AtomicU64>,
}

impl MockClock {
    /// Create a mock clock frozen at `origin`, reporting `epoch_nanos` as wall time.
    pub fn new(origin: Instant, epoch_nanos: u64) -> Self {
        Self {
            origin,
            epoch_nanos,
            offset_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        self.offset_nanos
            .fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Total time advanced since creation.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.offset_nanos.load(Ordering::SeqCst))
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new(Instant::now(), 1_700_000_000_000_000_000)
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn unix_nanos(&self) -> u64 {
        self.epoch_nanos
            .saturating_add(self.offset_nanos.load(Ordering::SeqCst))
    }
}
