//! UDP reflector core
//!
//! Echoes every datagram back to its sender while watching for stream
//! silence. Read deadlines escalate along the Fibonacci sequence so a quiet
//! stream produces increasingly sparse silence notices, and an absolute
//! reset threshold rearms the reflector for a fresh stream.
//!
//! ```text
//! ┌──────────┐  8-byte timestamp  ┌───────────┐
//! │ injector │ ─────────────────► │ reflector │
//! │          │ ◄───────────────── │           │
//! └──────────┘   identical echo   └───────────┘
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod logging;
pub mod reflector;
pub mod shutdown;
pub mod state;
pub mod transport;
pub mod wire;

// Re-export commonly used types
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{resolve_endpoint, ReflectorConfig};
pub use error::{ConfigError, ReflectorError};
pub use event::{EventSink, LogSink, ReflectorEvent};
pub use reflector::{decide, Reflector, Step};
pub use shutdown::{NeverShutdown, ShutdownCheck, ShutdownFlag};
pub use state::{Escalation, Phase, StreamState};
pub use transport::{DatagramSocket, MioSocket, RecvResult};
