//! Blocking-resource reader/writer: open, close, and timeout-bounded
//! read/write over generic descriptors.
//!
//! The read loop is wait-then-transfer: `poll(2)` bounds each wait, one
//! `read(2)` moves at most [`READ_CHUNK`](super::READ_CHUNK) bytes, and the
//! first successful transfer forces the remaining wait budget to zero so an
//! available burst drains without further blocking. The write loop is the
//! symmetric shape over `poll(POLLOUT)` and `write(2)`.

use std::ffi::CString;
use std::os::fd::RawFd;

use crate::error::{Error, Result};
use crate::io::{wait_fd, ReadOutcome, Readiness, Timeout, READ_CHUNK};

/// Open `path` with native flag bits and (for `O_CREAT`) `mode`.
///
/// # Errors
///
/// `IoError` with the `open(2)` failure text, or `ProtocolError` if `path`
/// contains an interior NUL.
pub fn open(path: &str, flags: libc::c_int, mode: libc::c_int) -> Result<RawFd> {
    let c_path = CString::new(path)
        .map_err(|_| Error::protocol("path contains an interior NUL byte"))?;
    let fd = unsafe { libc::open(c_path.as_ptr(), flags, mode as libc::mode_t) };
    if fd == -1 {
        return Err(Error::io_call("open", std::io::Error::last_os_error()));
    }
    Ok(fd)
}

/// Close a descriptor the caller owns.
///
/// Closing an already-closed descriptor reports `IoError` (EBADF) — it
/// never crashes and never affects other handles.
pub fn close(fd: RawFd) -> Result<()> {
    if unsafe { libc::close(fd) } == -1 {
        return Err(Error::io_call("close", std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Read up to `max` bytes (`max < 0` = unbounded) within `timeout`.
///
/// Returns the accumulated bytes plus an end-of-stream flag that is true
/// only when `read(2)` reported orderly closure — a timeout yields whatever
/// was accumulated with `eof == false`.
///
/// # Errors
///
/// `IoError` on a wait or read failure. Partial data accumulated before the
/// failure is discarded.
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
        let cap = if remaining > 0 {
            READ_CHUNK.min(remaining as usize)
        } else {
            READ_CHUNK
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

/// Write `data` within `timeout`, returning the count actually transferred.
///
/// `0 ≤ returned ≤ data.len()`; the full length whenever the descriptor
/// stays writable for the whole call.
///
/// # Errors
///
/// `IoError` on a wait or write failure.
pub fn write(fd: RawFd, data: &[u8], timeout: Timeout) -> Result<usize> {
    let mut written = 0;
    let mut timeout = timeout;

    while written < data.len() {
        match wait_fd(fd, libc::POLLOUT, timeout)? {
            Readiness::TimedOut => break,
            Readiness::Ready => {}
        }
        // One bounded write per wake. POLLOUT on a pipe guarantees room for
        // at least PIPE_BUF bytes, so a chunk this size cannot block past
        // the deadline.
        let cap = (data.len() - written).min(READ_CHUNK);
        let n = unsafe { libc::write(fd, data[written..].as_ptr().cast(), cap) };
        if n == -1 {
            return Err(Error::io_call("write", std::io::Error::last_os_error()));
        }
        written += n as usize;
        // Progress made: keep writing without waiting.
        timeout = Timeout::POLL;
    }
    Ok(written)
}
