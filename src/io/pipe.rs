//! Anonymous-pipe read specialization: peek-then-read.
//!
//! Generic wait primitives cannot tell "pipe has data" from "pipe was
//! closed" without consuming bytes, so the pipe reader peeks first:
//! `poll(2)` bounds the wait, then `ioctl(FIONREAD)` reports the exact byte
//! count available. A ready descriptor with zero available bytes means the
//! write side is gone — end-of-stream. A positive count permits a read of
//! exactly that many bytes, guaranteed not to block.
//!
//! Writes and closes have no pipe-specific behavior and reuse the generic
//! descriptor paths.

use std::os::fd::RawFd;

use crate::error::{Error, Result};
use crate::io::{file, wait_fd, ReadOutcome, Readiness, Timeout, READ_CHUNK};

/// Non-destructively report the byte count available on `fd`.
fn peek(fd: RawFd) -> Result<usize> {
    let mut available: libc::c_int = 0;
    if unsafe { libc::ioctl(fd, libc::FIONREAD, &mut available) } == -1 {
        return Err(Error::io_call("ioctl", std::io::Error::last_os_error()));
    }
    Ok(available.max(0) as usize)
}

/// Read up to `max` bytes (`max < 0` = unbounded) from a pipe within
/// `timeout`.
///
/// Same contract as [`file::read`], with the peek specialization above:
/// `eof` is reported when the peer closed the write end, never on timeout.
///
/// # Errors
///
/// `IoError` on a wait, peek, or read failure.
pub fn read(fd: RawFd, max: i64, timeout: Timeout) -> Result<ReadOutcome> {
    let mut remaining = max;
    let mut timeout = timeout;
    let mut out = Vec::new();
    let mut buf = [0u8; READ_CHUNK];

    while remaining != 0 {
        match wait_fd(fd, libc::POLLIN, timeout)? {
            Readiness::TimedOut => break,
            Readiness::Ready => {}
        }
        let available = peek(fd)?;
        if available == 0 {
            // Readable with nothing buffered: the write side is closed.
            return Ok(ReadOutcome { data: out, eof: true });
        }
        let cap = if remaining > 0 {
            available.min(READ_CHUNK).min(remaining as usize)
        } else {
            available.min(READ_CHUNK)
        };
        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), cap) };
        if n == -1 {
            return Err(Error::io_call("read", std::io::Error::last_os_error()));
        }
        if n == 0 {
            return Ok(ReadOutcome { data: out, eof: true });
        }
        out.extend_from_slice(&buf[..n as usize]);
        if remaining > 0 {
            remaining -= n as i64;
        }
        // Data is flowing: drain without waiting.
        timeout = Timeout::POLL;
    }
    Ok(ReadOutcome { data: out, eof: false })
}

/// Write to a pipe — identical to the generic descriptor write.
pub fn write(fd: RawFd, data: &[u8], timeout: Timeout) -> Result<usize> {
    file::write(fd, data, timeout)
}

/// Close a pipe end — identical to the generic descriptor close.
pub fn close(fd: RawFd) -> Result<()> {
    file::close(fd)
}
