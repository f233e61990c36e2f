//! Background read loops.
//!
//! One [`ReadLoop`] spawn is one dedicated polling thread for one connection.
//! The thread alternates between a bounded readiness poll and a user callback:
//! a poll timeout just loops again, readability hands the socket to the
//! callback, and the callback's return value decides whether the loop keeps
//! going. The loop itself never reads data — detecting readiness and
//! consuming bytes are deliberately separate, so the callback uses the normal
//! synchronous read contract.
//!
//! The poll interval is short and bounded so the thread stays responsive to
//! the socket being closed out from under it: a closed descriptor turns the
//! next poll into a failure, which ends the loop.

use std::io;
use std::os::fd::RawFd;
use std::thread;
use std::time::Duration;

use crate::stream::ByteStream;
use crate::{Error, Result};

/// Default readiness-poll timeout.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of one readiness poll.
enum Readiness {
    /// Data (or a hangup, which a read will observe as end-of-stream) is
    /// available.
    Readable,
    /// The poll timed out with no event.
    Timeout,
    /// The poll itself failed; the loop must stop.
    Failed(io::Error),
}

/// Builder for a background read loop.
#[derive(Debug, Clone)]
pub struct ReadLoop {
    interval: Duration,
}

impl Default for ReadLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadLoop {
    /// Create a read loop with the default poll interval.
    pub fn new() -> Self {
        ReadLoop {
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the readiness-poll timeout.
    ///
    /// This bounds how long the loop sleeps between checks, trading CPU
    /// against how quickly the loop notices external closure. It does not
    /// delay callback delivery: readiness wakes the poll immediately.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the polling thread for `stream`.
    ///
    /// `callback` runs on the loop thread each time the stream polls
    /// readable, strictly sequentially; returning `true` continues the loop,
    /// `false` terminates it. Termination drops the loop's own state only —
    /// whoever owns the original connection keeps it.
    ///
    /// A poll failure ends the loop without invoking the callback again; it
    /// is reported through [`ReadLoopHandle::join`].
    ///
    /// # Errors
    ///
    /// [`Error::Closed`] if `stream` has no live descriptor to poll.
    pub fn spawn<S, F>(&self, stream: S, callback: F) -> Result<ReadLoopHandle>
    where
        S: ByteStream + Send + 'static,
        F: FnMut(&mut S) -> bool + Send + 'static,
    {
        let fd = stream.poll_fd().ok_or(Error::Closed)?;
        let interval = self.interval;

        let thread = thread::Builder::new()
            .name("redial-readloop".to_string())
            .spawn(move || run(stream, fd, interval, callback))?;

        Ok(ReadLoopHandle { thread })
    }
}

/// Handle to a spawned read loop.
///
/// Joining is the notification path for loop failures: the thread's result is
/// `Ok(())` when the callback signalled completion and [`Error::Poll`] when
/// the readiness poll failed.
#[derive(Debug)]
pub struct ReadLoopHandle {
    thread: thread::JoinHandle<Result<()>>,
}

impl ReadLoopHandle {
    /// Whether the loop thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the loop to end and return how it ended.
    pub fn join(self) -> Result<()> {
        self.thread
            .join()
            .map_err(|_| Error::Poll(io::Error::other("read loop thread panicked")))?
    }
}

fn run<S, F>(mut stream: S, fd: RawFd, interval: Duration, mut callback: F) -> Result<()>
where
    S: ByteStream,
    F: FnMut(&mut S) -> bool,
{
    loop {
        match poll_readable(fd, interval) {
            Readiness::Timeout => continue,
            Readiness::Readable => {
                tracing::trace!(fd, "socket readable, invoking callback");
                if !callback(&mut stream) {
                    tracing::debug!(fd, "callback signalled completion, read loop done");
                    return Ok(());
                }
            }
            Readiness::Failed(e) => {
                tracing::warn!(fd, error = %e, "readiness poll failed, read loop aborting");
                return Err(Error::Poll(e));
            }
        }
    }
}

/// Poll one descriptor for readability with a bounded timeout.
fn poll_readable(fd: RawFd, timeout: Duration) -> Readiness {
    use libc::{poll, pollfd, POLLERR, POLLHUP, POLLIN, POLLNVAL};

    let mut pfd = pollfd {
        fd,
        events: POLLIN,
        revents: 0,
    };

    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
    let ret = unsafe { poll(&mut pfd, 1, timeout_ms) };

    if ret < 0 {
        return Readiness::Failed(io::Error::last_os_error());
    }
    if ret == 0 {
        return Readiness::Timeout;
    }

    // A hangup counts as readable: the callback's read will see the
    // end-of-stream and can decide to stop.
    if pfd.revents & (POLLIN | POLLHUP) != 0 {
        return Readiness::Readable;
    }
    if pfd.revents & POLLNVAL != 0 {
        return Readiness::Failed(io::Error::new(
            io::ErrorKind::InvalidInput,
            "polled descriptor is not open",
        ));
    }
    if pfd.revents & POLLERR != 0 {
        return Readiness::Failed(io::Error::other("descriptor error condition"));
    }
    Readiness::Timeout
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::IoStatus;

    /// A transport whose descriptor is not a real open fd.
    struct BogusStream(Option<RawFd>);

    impl ByteStream for BogusStream {
        fn read(&mut self, _buf: &mut [u8]) -> IoStatus {
            IoStatus::Error(io::Error::other("bogus"))
        }

        fn write(&mut self, _buf: &[u8]) -> IoStatus {
            IoStatus::Error(io::Error::other("bogus"))
        }

        fn poll_fd(&self) -> Option<RawFd> {
            self.0
        }
    }

    #[test]
    fn spawn_on_closed_stream_is_rejected() {
        let result = ReadLoop::new().spawn(BogusStream(None), |_| false);
        assert!(matches!(result, Err(Error::Closed)));
    }

    #[test]
    fn poll_failure_ends_loop_without_callback() {
        // fd 9999 is not open, so poll reports POLLNVAL immediately.
        let handle = ReadLoop::new()
            .interval(Duration::from_millis(10))
            .spawn(BogusStream(Some(9999)), |_| {
                panic!("callback must not run after a poll failure")
            })
            .unwrap();

        match handle.join() {
            Err(Error::Poll(_)) => {}
            other => panic!("expected Poll error, got {:?}", other),
        }
    }
}
