//! Connection establishment with candidate fallback.
//!
//! The dialer walks an [`AddressSet`] in resolution order and keeps the first
//! candidate that accepts a connection. This is what lets a dual-stack host
//! connect transparently over IPv6 or IPv4: the first listed family is tried
//! first, and an unreachable candidate just falls through to the next one.

use std::io;
use std::net::TcpStream;
use std::os::fd::AsRawFd;
use std::time::Duration;

use socket2::{Protocol, SockAddr as Socket2Addr, Socket, Type};

use crate::resolve::{AddressSet, ResolvedAddress};
use crate::{ClientSocket, Error, Result};

/// TCP connection builder.
///
/// Defaults: TCP_NODELAY on, blocking connect with no timeout.
#[derive(Debug, Clone)]
pub struct Dialer {
    timeout: Option<Duration>,
    nodelay: bool,
}

impl Default for Dialer {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialer {
    /// Create a dialer with default settings.
    pub fn new() -> Self {
        Dialer {
            timeout: None,
            nodelay: true,
        }
    }

    /// Set a per-candidate connect timeout.
    ///
    /// Applies to each candidate attempt separately, not to the whole dial.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set TCP_NODELAY on created sockets (default: on).
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Connect to the first candidate in `set` that accepts.
    ///
    /// Candidates are tried strictly in resolution order. A failed *connect*
    /// closes that candidate's socket and falls through to the next one; a
    /// failed socket *creation* is fatal for the whole attempt — the
    /// transport itself is unavailable, so trying further candidates would be
    /// pointless. The returned socket stores a copy of the one address that
    /// won, not the set.
    ///
    /// # Errors
    ///
    /// [`Error::SocketCreate`] if a socket cannot be created for a
    /// candidate's family; [`Error::Unreachable`] after every candidate has
    /// been tried and refused. Exhaustion is not retried and the set is not
    /// re-resolved.
    pub fn dial(&self, set: &AddressSet) -> Result<ClientSocket> {
        for candidate in set {
            let socket = Socket::new(
                candidate.family().domain(),
                Type::STREAM,
                Some(Protocol::TCP),
            )
            .map_err(Error::SocketCreate)?;

            socket.set_nodelay(self.nodelay).map_err(Error::Io)?;

            match self.attempt(&socket, candidate) {
                Ok(()) => {
                    tracing::debug!(host = set.host(), addr = %candidate, "connected");
                    let stream: TcpStream = socket.into();
                    return Ok(ClientSocket::from_parts(stream, candidate.addr()));
                }
                Err(e) => {
                    tracing::debug!(
                        host = set.host(),
                        addr = %candidate,
                        error = %e,
                        "candidate refused, trying next"
                    );
                    drop(socket);
                }
            }
        }

        Err(Error::Unreachable {
            host: set.host().to_string(),
            tried: set.len(),
        })
    }

    /// Resolve `hostname` and dial the resulting candidate set.
    ///
    /// The intermediate [`AddressSet`] is released before returning.
    pub fn dial_host(&self, hostname: &str, port: u16) -> Result<ClientSocket> {
        let set = crate::resolve(hostname, port)?;
        self.dial(&set)
    }

    /// One connect attempt against one candidate.
    fn attempt(&self, socket: &Socket, candidate: &ResolvedAddress) -> io::Result<()> {
        let target = Socket2Addr::from(candidate.addr().to_std());

        let Some(timeout) = self.timeout else {
            return socket.connect(&target);
        };

        socket.set_nonblocking(true)?;
        match socket.connect(&target) {
            Ok(()) => {}
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.raw_os_error() == Some(libc::EINPROGRESS) =>
            {
                Self::wait_for_connect(socket, timeout)?;
            }
            Err(e) => return Err(e),
        }
        socket.set_nonblocking(false)
    }

    /// Wait for a non-blocking connect to complete.
    fn wait_for_connect(socket: &Socket, timeout: Duration) -> io::Result<()> {
        use libc::{poll, pollfd, POLLWRNORM};

        let mut pfd = pollfd {
            fd: socket.as_raw_fd(),
            events: POLLWRNORM,
            revents: 0,
        };

        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let ret = unsafe { poll(&mut pfd, 1, timeout_ms) };

        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        if ret == 0 {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out"));
        }

        // Writable does not mean connected; check the pending socket error.
        if let Some(err) = socket.take_error()? {
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::AddressSet;
    use crate::SockAddr;
    use std::net::{SocketAddr, TcpListener};

    /// A loopback port that refuses connections: bind, note the port, drop.
    fn refused_addr() -> SockAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        SockAddr::from_std(addr)
    }

    #[test]
    fn dials_single_live_candidate() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = SockAddr::from_std(listener.local_addr().unwrap());
        let set = AddressSet::from_addrs("localhost", addr.port(), [addr]);

        let sock = Dialer::new().dial(&set).unwrap();
        assert_eq!(sock.peer(), addr);
    }

    #[test]
    fn falls_back_to_first_connectable_candidate() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let live = SockAddr::from_std(listener.local_addr().unwrap());
        let dead_a = refused_addr();
        let dead_b = refused_addr();

        let set = AddressSet::from_addrs("localhost", live.port(), [dead_a, dead_b, live]);
        let sock = Dialer::new().dial(&set).unwrap();

        // The winner is the first candidate that accepted, and only its
        // address is kept.
        assert_eq!(sock.peer(), live);
    }

    #[test]
    fn exhausted_candidates_report_unreachable() {
        let set = AddressSet::from_addrs("localhost", 1, [refused_addr(), refused_addr()]);
        match Dialer::new().dial(&set) {
            Err(Error::Unreachable { host, tried }) => {
                assert_eq!(host, "localhost");
                assert_eq!(tried, 2);
            }
            other => panic!("expected Unreachable, got {:?}", other),
        }
    }

    #[test]
    fn connect_timeout_applies_per_candidate() {
        // 192.0.2.0/24 is TEST-NET-1, guaranteed non-routable.
        let black_hole: SocketAddr = "192.0.2.1:80".parse().unwrap();
        let set = AddressSet::from_addrs("test-net", 80, [SockAddr::from_std(black_hole)]);

        let result = Dialer::new()
            .timeout(Duration::from_millis(100))
            .dial(&set);
        assert!(result.is_err());
    }

    #[test]
    fn nodelay_is_set_on_the_winning_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = SockAddr::from_std(listener.local_addr().unwrap());
        let set = AddressSet::from_addrs("localhost", addr.port(), [addr]);

        let sock = Dialer::new().nodelay(true).dial(&set).unwrap();
        assert!(!sock.is_closed());
    }
}
