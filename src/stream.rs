//! Connected client sockets and synchronous I/O.
//!
//! I/O on an established socket never returns a hard error: each call yields
//! an [`IoStatus`] and the caller decides what a failure or end-of-stream
//! means for the connection. Note the deliberate asymmetry between reads and
//! writes: a zero-byte *read* is the peer closing, a zero-byte *write* is
//! just a write of zero bytes.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsRawFd, RawFd};

use crate::readloop::{ReadLoop, ReadLoopHandle};
use crate::{Error, Result, SockAddr};

/// Outcome of a single read or write call.
#[derive(Debug)]
pub enum IoStatus {
    /// The call transferred this many bytes. For writes, zero is a valid
    /// count, not a failure.
    Ok(usize),
    /// The peer closed its write side. Reads only; a write never produces
    /// this.
    EndOfStream,
    /// The underlying call failed. The socket is left as-is; closing is the
    /// caller's decision.
    Error(io::Error),
}

impl IoStatus {
    /// Bytes transferred, if the call succeeded.
    pub fn bytes(&self) -> Option<usize> {
        match self {
            IoStatus::Ok(n) => Some(*n),
            _ => None,
        }
    }
}

/// Capability interface for anything a read loop can drive.
///
/// [`ClientSocket`] is the real implementation; a test transport only has to
/// supply these three methods to be substitutable.
pub trait ByteStream {
    /// Single blocking read into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> IoStatus;

    /// Single blocking write of `buf`.
    fn write(&mut self, buf: &[u8]) -> IoStatus;

    /// The descriptor to poll for readability, or `None` once closed.
    fn poll_fd(&self) -> Option<RawFd>;
}

/// One connected TCP endpoint.
///
/// Holds the live OS handle and a copy of the specific resolved address that
/// accepted the connection. Once [`close`](ClientSocket::close)d the handle is
/// released and never reused; subsequent I/O reports [`IoStatus::Error`]
/// deterministically.
#[derive(Debug)]
pub struct ClientSocket {
    stream: Option<TcpStream>,
    peer: SockAddr,
}

impl ClientSocket {
    pub(crate) fn from_parts(stream: TcpStream, peer: SockAddr) -> Self {
        ClientSocket {
            stream: Some(stream),
            peer,
        }
    }

    /// Resolve `hostname` and connect to the first candidate that accepts.
    ///
    /// Composes [`resolve`](crate::resolve()) with a default [`Dialer`]
    /// (TCP_NODELAY on, blocking connect); the intermediate address set is
    /// released before returning. See [`Dialer::dial`] for the fallback
    /// policy and error cases.
    ///
    /// [`Dialer`]: crate::Dialer
    /// [`Dialer::dial`]: crate::Dialer::dial
    pub fn connect(hostname: &str, port: u16) -> Result<Self> {
        let set = crate::resolve(hostname, port)?;
        crate::Dialer::new().dial(&set)
    }

    /// The resolved address this socket connected to.
    pub fn peer(&self) -> SockAddr {
        self.peer
    }

    /// Whether [`close`](ClientSocket::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Single blocking read.
    ///
    /// Zero bytes from the OS means the peer closed its write side and maps
    /// to [`IoStatus::EndOfStream`]. No retry on short reads; callers loop.
    /// An empty `buf` is rejected as an error, since a zero-length read would
    /// be indistinguishable from end-of-stream.
    pub fn read(&mut self, buf: &mut [u8]) -> IoStatus {
        if buf.is_empty() {
            return IoStatus::Error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "read buffer is empty",
            ));
        }
        let Some(stream) = self.stream.as_mut() else {
            return IoStatus::Error(closed_error());
        };
        match stream.read(buf) {
            Ok(0) => IoStatus::EndOfStream,
            Ok(n) => IoStatus::Ok(n),
            Err(e) => IoStatus::Error(e),
        }
    }

    /// Single blocking write.
    ///
    /// A zero-byte write is reported as `Ok(0)` — zero is not end-of-stream
    /// for writes. No retry on short writes; callers loop.
    pub fn write(&mut self, buf: &[u8]) -> IoStatus {
        let Some(stream) = self.stream.as_mut() else {
            return IoStatus::Error(closed_error());
        };
        match stream.write(buf) {
            Ok(n) => IoStatus::Ok(n),
            Err(e) => IoStatus::Error(e),
        }
    }

    /// Release the OS handle. Idempotent: closing an already-closed socket is
    /// a no-op.
    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            tracing::trace!(peer = %self.peer, "closing client socket");
            drop(stream);
        }
    }

    /// Duplicate the handle. The clone refers to the same connection; closing
    /// one side does not invalidate the other's descriptor.
    pub fn try_clone(&self) -> Result<Self> {
        let stream = self.stream.as_ref().ok_or(Error::Closed)?;
        Ok(ClientSocket {
            stream: Some(stream.try_clone()?),
            peer: self.peer,
        })
    }

    /// Start a background read loop on this connection with default settings.
    ///
    /// The loop runs on a dedicated thread against a duplicated handle, so
    /// the caller keeps ownership of this socket (and may continue writing
    /// through it). `callback` is invoked with the loop's socket whenever it
    /// polls readable; returning `true` keeps the loop going, `false` ends
    /// it. Invocations are strictly sequential.
    ///
    /// At most one read loop should be active per connection at a time, and
    /// the owner must not issue direct reads while one is running; the two
    /// read paths are not coordinated.
    pub fn async_read<F>(&self, callback: F) -> Result<ReadLoopHandle>
    where
        F: FnMut(&mut ClientSocket) -> bool + Send + 'static,
    {
        ReadLoop::new().spawn(self.try_clone()?, callback)
    }
}

impl ByteStream for ClientSocket {
    fn read(&mut self, buf: &mut [u8]) -> IoStatus {
        ClientSocket::read(self, buf)
    }

    fn write(&mut self, buf: &[u8]) -> IoStatus {
        ClientSocket::write(self, buf)
    }

    fn poll_fd(&self) -> Option<RawFd> {
        self.stream.as_ref().map(|s| s.as_raw_fd())
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket is closed")
}
