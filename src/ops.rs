//! Operation dispatch over the textual call boundary.
//!
//! The embedding host invokes every operation with a name and one encoded
//! argument blob (see [`crate::stack`]) and receives a tagged [`Reply`]:
//!
//! - [`Reply::Empty`] — success with no payload (`file-close`, `kill`, …)
//! - [`Reply::Payload`] — success with encoded result fields
//! - [`Reply::Error`] — failure, always a human-readable message
//!
//! Arguments are positional and strictly typed per operation; a count or
//! type mismatch aborts the call with a `ProtocolError` before any OS call
//! is made. Handles travel as opaque numbers — the caller owns them and
//! must direct each one to the operation family it was created by (file
//! descriptors to `file-*`, pipe ends to `pipe-*`, and so on); this is a
//! documented caller contract, not something the boundary can enforce.

use std::ffi::{CStr, CString};

use crate::error::{Error, Result};
use crate::flags::parse_open_flags;
use crate::io::{file, pipe, socket, ReadOutcome, Timeout};
use crate::process::{kill, spawn_piped, wait_nonblocking, WaitState};
use crate::stack::{ArgStack, ResultStack};

/// Outcome of one boundary call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Success, no payload.
    Empty,
    /// Success with encoded result fields.
    Payload(Vec<u8>),
    /// Failure with a human-readable message.
    Error(String),
}

/// Invoke `op` with an encoded argument blob.
///
/// Never panics on malformed input — every failure, including an unknown
/// operation name, comes back as [`Reply::Error`].
pub fn invoke(op: &str, args: &[u8]) -> Reply {
    match run(op, args) {
        Ok(Some(payload)) => Reply::Payload(payload),
        Ok(None) => Reply::Empty,
        Err(e) => {
            log::debug!("[{op}] failed: {e}");
            Reply::Error(e.to_string())
        }
    }
}

fn run(op: &str, args: &[u8]) -> Result<Option<Vec<u8>>> {
    match op {
        "open-library" => open_library(args),
        "close-library" => close_library(args),

        "file-open" => file_open(args),
        "file-close" => generic_close(args, file::close),
        "file-read" => generic_read(args, file::read),
        "file-write" => generic_write(args, file::write),

        "pipe-open" => pipe_open(args),
        "pipe-close" => generic_close(args, pipe::close),
        "pipe-read" => generic_read(args, pipe::read),
        "pipe-write" => generic_write(args, pipe::write),

        "pty-open" => Err(Error::Unsupported("pty-open is not available")),
        "pty-close" => Err(Error::Unsupported("pty-close is not available")),
        "pty-read" => Err(Error::Unsupported("pty-read is not available")),
        "pty-write" => Err(Error::Unsupported("pty-write is not available")),
        "pty-get-winsize" => Err(Error::Unsupported("pty-get-winsize is not available")),
        "pty-set-winsize" => Err(Error::Unsupported("pty-set-winsize is not available")),

        "kill" => kill_op(args),
        "wait" => wait_op(args),

        "socket-open" => socket_open(args),
        "socket-close" => socket_close(args),
        "socket-read" => generic_read(args, socket::read),
        "socket-write" => generic_write(args, socket::write),

        "shell-open" => shell_open(args),

        other => Err(Error::protocol(format!("unknown operation: {other}"))),
    }
}

// ─── Shared op shapes ──────────────────────────────────────────────────────

/// `(fd, max-bytes, timeout-ms) → (data, eof-flag)` for any resource kind.
fn generic_read(
    args: &[u8],
    read: fn(i32, i64, Timeout) -> Result<ReadOutcome>,
) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let fd = args.pop_num()? as i32;
    let max = args.pop_num()?;
    let timeout = Timeout::from_millis(args.pop_num()?);
    args.finish()?;

    let out = read(fd, max, timeout)?;
    let mut res = ResultStack::new();
    res.push_bin(&out.data);
    res.push_num(i64::from(out.eof));
    Ok(Some(res.into_bytes()))
}

/// `(fd, data, timeout-ms) → bytes-written` for any resource kind.
fn generic_write(
    args: &[u8],
    write: fn(i32, &[u8], Timeout) -> Result<usize>,
) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let fd = args.pop_num()? as i32;
    let data = args.pop_bin()?;
    let timeout = Timeout::from_millis(args.pop_num()?);
    args.finish()?;

    let written = write(fd, &data, timeout)?;
    let mut res = ResultStack::new();
    res.push_num(written as i64);
    Ok(Some(res.into_bytes()))
}

/// `(fd) → ()` for any resource kind.
fn generic_close(args: &[u8], close: fn(i32) -> Result<()>) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let fd = args.pop_num()? as i32;
    args.finish()?;
    close(fd)?;
    Ok(None)
}

// ─── Files ─────────────────────────────────────────────────────────────────

fn file_open(args: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let path = args.pop_str()?;
    let flag_names = args.pop_str()?;
    let mode = args.pop_num()? as libc::c_int;
    args.finish()?;

    let fd = file::open(&path, parse_open_flags(&flag_names), mode)?;
    let mut res = ResultStack::new();
    res.push_num(i64::from(fd));
    Ok(Some(res.into_bytes()))
}

// ─── Processes ─────────────────────────────────────────────────────────────

fn pipe_open(args: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let npipe = args.pop_num()?;
    let cmdline = args.pop_str()?;
    args.finish()?;

    let child = spawn_piped(npipe, &cmdline)?;
    let mut res = ResultStack::new();
    res.push_num(i64::from(child.pid));
    res.push_num(i64::from(child.stdin_fd));
    res.push_num(i64::from(child.stdout_fd));
    if let Some(err_fd) = child.stderr_fd {
        res.push_num(i64::from(err_fd));
    }
    Ok(Some(res.into_bytes()))
}

fn kill_op(args: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let pid = args.pop_num()? as i32;
    let sig = args.pop_num()? as i32;
    args.finish()?;
    kill(pid, sig)?;
    Ok(None)
}

fn wait_op(args: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let pid = args.pop_num()? as i32;
    args.finish()?;

    let mut res = ResultStack::new();
    match wait_nonblocking(pid)? {
        WaitState::Running => {
            res.push_str("run");
            res.push_num(0);
        }
        WaitState::Exited(code) => {
            res.push_str("exit");
            res.push_num(i64::from(code));
        }
    }
    Ok(Some(res.into_bytes()))
}

// ─── Sockets ───────────────────────────────────────────────────────────────

fn socket_open(args: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let host = args.pop_str()?;
    let port = args.pop_str()?;
    args.finish()?;

    let fd = socket::open(&host, &port)?;
    let mut res = ResultStack::new();
    res.push_num(i64::from(fd));
    Ok(Some(res.into_bytes()))
}

fn socket_close(args: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let fd = args.pop_num()? as i32;
    args.finish()?;
    socket::close(fd)?;
    Ok(None)
}

// ─── Dynamic libraries ─────────────────────────────────────────────────────

fn dl_error_text() -> String {
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        "unknown error".to_owned()
    } else {
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}

fn open_library(args: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let path = args.pop_str()?;
    args.finish()?;

    let c_path = CString::new(path)
        .map_err(|_| Error::protocol("path contains an interior NUL byte"))?;
    let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY) };
    if handle.is_null() {
        return Err(Error::Io(format!("dlopen() error: {}", dl_error_text())));
    }
    let mut res = ResultStack::new();
    res.push_num(handle as usize as i64);
    Ok(Some(res.into_bytes()))
}

fn close_library(args: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let handle = args.pop_num()?;
    args.finish()?;

    if unsafe { libc::dlclose(handle as usize as *mut libc::c_void) } != 0 {
        return Err(Error::Io(format!("dlclose() error: {}", dl_error_text())));
    }
    Ok(None)
}

// ─── Shell delegation ──────────────────────────────────────────────────────

fn shell_open(args: &[u8]) -> Result<Option<Vec<u8>>> {
    let mut args = ArgStack::decode(args)?;
    let path = args.pop_str()?;
    args.finish()?;

    #[cfg(target_os = "macos")]
    let opener = "open";
    #[cfg(not(target_os = "macos"))]
    let opener = "xdg-open";

    delegate_to_opener(opener, &path)?;
    Ok(None)
}

/// Run the platform opener to completion. The opener hands the path to the
/// desktop environment and exits immediately, so waiting on it is cheap and
/// leaves no unreaped process behind.
fn delegate_to_opener(opener: &str, path: &str) -> Result<()> {
    let status = std::process::Command::new(opener)
        .arg(path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map_err(|e| Error::Io(format!("{opener}() error: {e}")))?;
    if !status.success() {
        return Err(Error::Io(format!("{opener}() error: {status}")));
    }
    Ok(())
}
