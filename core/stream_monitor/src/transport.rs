//! Datagram transport with optional read deadline
//!
//! `DatagramSocket` is the seam between the control loops and the network.
//! A receive never fails on deadline expiry: it reports `TimedOut`, which the
//! reflector treats as a state-machine signal rather than an error.

use std::io;
#[cfg(unix)]
use std::io::Read;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use mio::net::UdpSocket;
use mio::{Events, Interest, Poll, Token};

// ============================================================================
// Constants
// ============================================================================

/// mio token for the UDP socket
const SOCKET_TOKEN: Token = Token(0);

/// mio token for the shutdown self-pipe
const WAKE_TOKEN: Token = Token(1);

// ============================================================================
// Receive Result
// ============================================================================

/// Outcome of one receive-with-deadline.
#[derive(Debug)]
pub enum RecvResult {
    /// A datagram of `len` bytes (possibly truncated to the buffer) from `from`
    Received { len: usize, from: SocketAddr },
    /// The deadline expired with no datagram
    TimedOut,
    /// The wait was ended by the shutdown pipe, not by traffic
    Woken,
    /// Any other socket error
    Failed(io::Error),
}

/// A UDP socket that can wait for a datagram up to an optional deadline.
pub trait DatagramSocket {
    /// Wait for one datagram. `None` waits indefinitely.
    fn recv(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> RecvResult;

    /// Send `payload` to `target`. May fail with `WouldBlock` when the send
    /// buffer is full.
    fn send_to(&mut self, payload: &[u8], target: SocketAddr) -> io::Result<usize>;

    /// Block until a send is likely to succeed, or the wait is woken.
    fn wait_writable(&mut self) -> io::Result<()>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

// ============================================================================
// mio Socket
// ============================================================================

/// mio-backed UDP socket with an optional wakeup pipe.
pub struct MioSocket {
    poll: Poll,
    events: Events,
    socket: UdpSocket,
    #[cfg(unix)]
    waker: Option<mio::net::UnixStream>,
}

impl MioSocket {
    /// Bind a non-blocking UDP socket and register it for readability.
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        Self::register(UdpSocket::bind(addr)?)
    }

    /// Wrap an already bound std socket.
    pub fn from_std(socket: std::net::UdpSocket) -> io::Result<Self> {
        socket.set_nonblocking(true)?;
        Self::register(UdpSocket::from_std(socket))
    }

    fn register(mut socket: UdpSocket) -> io::Result<Self> {
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut socket, SOCKET_TOKEN, Interest::READABLE)?;

        Ok(MioSocket {
            poll,
            events: Events::with_capacity(16),
            socket,
            #[cfg(unix)]
            waker: None,
        })
    }

    /// Register the read end of a pipe. Any byte written to it ends the
    /// current wait with `RecvResult::Woken`.
    #[cfg(unix)]
    pub fn watch(&mut self, mut waker: mio::net::UnixStream) -> io::Result<()> {
        self.poll
            .registry()
            .register(&mut waker, WAKE_TOKEN, Interest::READABLE)?;
        self.waker = Some(waker);
        Ok(())
    }

    #[cfg(unix)]
    fn drain_waker(&mut self) {
        if let Some(waker) = self.waker.as_mut() {
            let mut scratch = [0u8; 64];
            while let Ok(n) = waker.read(&mut scratch) {
                if n == 0 {
                    break;
                }
            }
        }
    }

    #[cfg(not(unix))]
    fn drain_waker(&mut self) {}

    fn poll_writable(&mut self) -> io::Result<()> {
        loop {
            match self.poll.poll(&mut self.events, None) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            // The wake byte is left in the pipe; the caller checks shutdown next
            let ready = self.events.iter().any(|event| {
                (event.token() == SOCKET_TOKEN && event.is_writable())
                    || event.token() == WAKE_TOKEN
            });
            if ready {
                return Ok(());
            }
        }
    }
}

impl DatagramSocket for MioSocket {
    fn recv(&mut self, buf: &mut [u8], timeout: Option<Duration>) -> RecvResult {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            // Readiness is edge-triggered: try the socket before every poll
            match self.socket.recv_from(buf) {
                Ok((len, from)) => return RecvResult::Received { len, from },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return RecvResult::Failed(e),
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return RecvResult::TimedOut;
                    }
                    Some(deadline - now)
                }
                None => None,
            };

            match self.poll.poll(&mut self.events, remaining) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return RecvResult::Failed(e),
            }

            if self.events.iter().any(|event| event.token() == WAKE_TOKEN) {
                self.drain_waker();
                return RecvResult::Woken;
            }
        }
    }

    fn send_to(&mut self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        loop {
            match self.socket.send_to(payload, target) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn wait_writable(&mut self) -> io::Result<()> {
        // Writable interest only for the duration of the wait, else every
        // poll in `recv` would wake on an idle send buffer
        self.poll.registry().reregister(
            &mut self.socket,
            SOCKET_TOKEN,
            Interest::READABLE | Interest::WRITABLE,
        )?;
        let result = self.poll_writable();
        self.poll
            .registry()
            .reregister(&mut self.socket, SOCKET_TOKEN, Interest::READABLE)?;
        result
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback() -> Option<MioSocket> {
        MioSocket::bind("127.0.0.1:0".parse().unwrap()).ok()
    }

    #[test]
    fn test_recv_times_out() {
        let Some(mut socket) = loopback() else {
            println!("Could not bind UDP socket, skipping test");
            return;
        };
        let mut buf = [0u8; 64];
        let start = Instant::now();
        let result = socket.recv(&mut buf, Some(Duration::from_millis(30)));
        assert!(matches!(result, RecvResult::TimedOut));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_recv_returns_datagram_and_source() {
        let Some(mut socket) = loopback() else {
            println!("Could not bind UDP socket, skipping test");
            return;
        };
        let target = socket.local_addr().unwrap();
        let peer = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.send_to(b"hello", target).unwrap();

        let mut buf = [0u8; 64];
        match socket.recv(&mut buf, Some(Duration::from_secs(2))) {
            RecvResult::Received { len, from } => {
                assert_eq!(&buf[..len], b"hello");
                assert_eq!(from, peer.local_addr().unwrap());
            }
            other => panic!("expected datagram, got {:?}", other),
        }
    }

    #[test]
    fn test_recv_truncates_to_buffer() {
        let Some(mut socket) = loopback() else {
            println!("Could not bind UDP socket, skipping test");
            return;
        };
        let target = socket.local_addr().unwrap();
        let peer = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.send_to(&[7u8; 100], target).unwrap();

        let mut buf = [0u8; 16];
        match socket.recv(&mut buf, Some(Duration::from_secs(2))) {
            RecvResult::Received { len, .. } => assert_eq!(len, 16),
            other => panic!("expected datagram, got {:?}", other),
        }
    }

    #[test]
    fn test_wait_writable_returns_on_idle_socket() {
        let Some(mut socket) = loopback() else {
            println!("Could not bind UDP socket, skipping test");
            return;
        };
        socket.wait_writable().unwrap();

        // Readable interest is restored afterwards
        let target = socket.local_addr().unwrap();
        let peer = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        peer.send_to(b"after", target).unwrap();
        let mut buf = [0u8; 64];
        match socket.recv(&mut buf, Some(Duration::from_secs(2))) {
            RecvResult::Received { len, .. } => assert_eq!(&buf[..len], b"after"),
            other => panic!("expected datagram, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_waker_ends_indefinite_wait() {
        use std::io::Write;

        let Some(mut socket) = loopback() else {
            println!("Could not bind UDP socket, skipping test");
            return;
        };
        let (read, mut write) = std::os::unix::net::UnixStream::pair().unwrap();
        read.set_nonblocking(true).unwrap();
        socket
            .watch(mio::net::UnixStream::from_std(read))
            .unwrap();

        write.write_all(&[1]).unwrap();
        let mut buf = [0u8; 64];
        assert!(matches!(socket.recv(&mut buf, None), RecvResult::Woken));
    }
}
