//! Minimal client-side TCP networking.
//!
//! `redial` resolves a hostname into an ordered set of candidate addresses,
//! establishes a connection by trying each candidate in order until one
//! succeeds, and exposes blocking read/write plus an asynchronous read mode
//! built on a background polling thread and a user callback.
//!
//! # Examples
//!
//! ```no_run
//! use redial::ClientSocket;
//!
//! let mut sock = ClientSocket::connect("example.com", 80).unwrap();
//! sock.write(b"GET / HTTP/1.0\r\n\r\n");
//! let mut buf = [0u8; 4096];
//! match sock.read(&mut buf) {
//!     redial::IoStatus::Ok(n) => println!("read {} bytes", n),
//!     redial::IoStatus::EndOfStream => println!("peer closed"),
//!     redial::IoStatus::Error(e) => eprintln!("read failed: {}", e),
//! }
//! ```
//!
//! Asynchronous reads run on a dedicated polling thread; the callback's return
//! value decides whether the loop keeps going:
//!
//! ```no_run
//! use redial::{ClientSocket, IoStatus};
//!
//! let sock = ClientSocket::connect("example.com", 80).unwrap();
//! let handle = sock
//!     .async_read(|s| {
//!         let mut buf = [0u8; 1024];
//!         matches!(s.read(&mut buf), IoStatus::Ok(_))
//!     })
//!     .unwrap();
//! // ... the caller keeps using `sock` for writes ...
//! handle.join().unwrap();
//! ```

pub mod addr;
pub mod dial;
pub mod readloop;
pub mod resolve;
pub mod stream;

pub use addr::{Family, SockAddr};
pub use dial::Dialer;
pub use readloop::{ReadLoop, ReadLoopHandle};
pub use resolve::{resolve, AddressSet, ResolvedAddress};
pub use stream::{ByteStream, ClientSocket, IoStatus};

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by resolution, connection establishment, and the read loop.
///
/// Per-call outcomes on an established socket are an [`IoStatus`] value, not an
/// `Error`; the caller decides whether a mid-stream failure warrants closing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error outside the connect/poll paths.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The hostname failed validation before resolution was attempted.
    #[error("invalid hostname: {0}")]
    InvalidHost(String),

    /// The system resolver failed or returned no stream-capable addresses.
    #[error("address resolution failed: {0}")]
    ResolutionFailed(String),

    /// Socket creation failed. Fatal for the whole connect attempt: the
    /// transport itself is unavailable, so remaining candidates are not tried.
    #[error("socket creation failed: {0}")]
    SocketCreate(std::io::Error),

    /// Every candidate address was tried and none accepted a connection.
    #[error("{host}: none of {tried} resolved address(es) accepted a connection")]
    Unreachable {
        /// Hostname the candidate set was resolved from.
        host: String,
        /// Number of candidates attempted.
        tried: usize,
    },

    /// The readiness poll itself failed; the read loop exited without further
    /// callback invocations.
    #[error("readiness poll failed: {0}")]
    Poll(std::io::Error),

    /// The socket was already closed when the operation needed a live handle.
    #[error("socket is closed")]
    Closed,
}
