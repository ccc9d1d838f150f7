//! Timeout-bounded read/write primitives over three resource kinds.
//!
//! All three submodules implement one uniform contract on top of different
//! native readiness models:
//!
//! ```text
//! file   — poll(2) then read/write        (wait-then-transfer)
//! pipe   — poll(2) + FIONREAD peek        (peek-then-read, never blocks)
//! socket — select(2) read/write sets      (readiness multiplexing)
//! ```
//!
//! A call either completes fully or returns whatever partial progress was
//! made inside the timeout window; the caller re-invokes to continue. Once
//! data starts flowing within a call, subsequent iterations wait with
//! timeout 0 so an available burst is drained greedily without blocking.
//!
//! There is no background thread or event loop anywhere in this crate —
//! every blocking point is one of the readiness waits above, bounded by the
//! caller-supplied timeout.

pub mod file;
pub mod pipe;
pub mod socket;

use std::os::fd::RawFd;

use crate::error::{Error, Result};

/// One OS read per loop iteration transfers at most this many bytes, so
/// bounded-read accounting and the greedy-drain timeout check stay
/// fine-grained on fast streams.
pub(crate) const READ_CHUNK: usize = 2048;

/// Caller-supplied wait budget in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout(i64);

impl Timeout {
    /// Return immediately if the resource is not ready.
    pub const POLL: Timeout = Timeout(0);

    /// Block until the resource becomes ready or is closed.
    pub const INFINITE: Timeout = Timeout(-1);

    /// From a protocol timeout argument: negative = infinite, 0 = poll.
    pub fn from_millis(ms: i64) -> Self {
        if ms < 0 {
            Timeout::INFINITE
        } else {
            Timeout(ms)
        }
    }

    /// Whether this timeout blocks indefinitely.
    pub fn is_infinite(self) -> bool {
        self.0 < 0
    }

    /// Millisecond value for `poll(2)` (-1 = infinite).
    pub(crate) fn poll_millis(self) -> libc::c_int {
        if self.is_infinite() {
            -1
        } else {
            self.0.min(libc::c_int::MAX as i64) as libc::c_int
        }
    }

    /// Split seconds/microseconds value for `select(2)`.
    ///
    /// Only meaningful for finite timeouts; `select` takes a null pointer
    /// for the infinite case.
    pub(crate) fn to_timeval(self) -> libc::timeval {
        let ms = self.0.max(0);
        libc::timeval {
            tv_sec: (ms / 1000) as libc::time_t,
            tv_usec: ((ms % 1000) * 1000) as libc::suseconds_t,
        }
    }
}

/// Outcome of a readiness wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    /// The resource is ready for the requested direction (or at EOF).
    Ready,
    /// The timeout elapsed with no readiness.
    TimedOut,
}

/// What one read call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes accumulated within the timeout window (possibly empty).
    pub data: Vec<u8>,
    /// True only on orderly transport closure — never set by a timeout.
    pub eof: bool,
}

/// Wait for `events` readiness on `fd` via `poll(2)`, bounded by `timeout`.
///
/// Hangup and error revents count as ready: the follow-up read observes the
/// actual condition (EOF or errno) and reports it precisely.
pub(crate) fn wait_fd(fd: RawFd, events: libc::c_short, timeout: Timeout) -> Result<Readiness> {
    let mut pfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    let n = unsafe { libc::poll(&mut pfd, 1, timeout.poll_millis()) };
    if n < 0 {
        return Err(Error::io_call("poll", std::io::Error::last_os_error()));
    }
    if n == 0 {
        return Ok(Readiness::TimedOut);
    }
    if pfd.revents & libc::POLLNVAL != 0 {
        return Err(Error::io_call(
            "poll",
            std::io::Error::from_raw_os_error(libc::EBADF),
        ));
    }
    Ok(Readiness::Ready)
}
