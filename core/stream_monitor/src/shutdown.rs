//! Signal handling for graceful shutdown.
//!
//! `ShutdownFlag` is set by SIGINT/SIGTERM/SIGQUIT and checked at the top of
//! every loop iteration. A second signal while the flag is already set
//! terminates the process immediately.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Trait for checking shutdown status.
pub trait ShutdownCheck {
    /// Returns true if shutdown has been requested.
    fn should_stop(&self) -> bool;
}

/// Flag shared between signal handlers and the control loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Create a flag with no signal handlers attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register termination signal handlers.
    ///
    /// Returns the read end of a self-pipe that receives a byte on every
    /// signal, for registration with `MioSocket::watch` so an indefinite
    /// wait notices the flag.
    #[cfg(unix)]
    pub fn install(&self) -> io::Result<mio::net::UnixStream> {
        use signal_hook::consts::TERM_SIGNALS;
        use signal_hook::{flag, low_level};

        let (read, write) = std::os::unix::net::UnixStream::pair()?;
        read.set_nonblocking(true)?;
        write.set_nonblocking(true)?;

        for &signal in TERM_SIGNALS {
            // Order matters: the exit check must run before the flag is set
            flag::register_conditional_shutdown(signal, 1, Arc::clone(&self.flag))?;
            flag::register(signal, Arc::clone(&self.flag))?;
            low_level::pipe::register(signal, write.try_clone()?)?;
        }

        Ok(mio::net::UnixStream::from_std(read))
    }

    /// Request shutdown programmatically.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl ShutdownCheck for ShutdownFlag {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Shutdown checker that never fires.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverShutdown;

impl ShutdownCheck for NeverShutdown {
    fn should_stop(&self) -> bool {
        false
    }
}
