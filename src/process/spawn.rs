//! Process launcher: spawn a child with its standard streams redirected
//! onto freshly constructed pipes.
//!
//! ```text
//! pipe-count 3                         pipe-count 2
//!
//! parent                child          parent                child
//! stdin_fd  ──pipe──►  stdin           stdin_fd  ──pipe──►  stdin
//! stdout_fd ◄──pipe──  stdout          stdout_fd ◄──pipe─┬─ stdout
//! stderr_fd ◄──pipe──  stderr                            └─ stderr (dup)
//! ```
//!
//! Every descriptor is held in an [`OwnedFd`] from the moment it exists, so
//! any failure mid-sequence (pipe creation, duplication, spawn) unwinds
//! through drops and releases everything already allocated — no descriptor
//! leaks on any exit path. On success the child-facing ends are consumed by
//! the spawn and closed in the parent; only the caller-facing ends are
//! handed back, as raw descriptors the caller now owns.
//!
//! All pipe ends are created close-on-exec. The spawn dup2s the child-facing
//! ends onto the child's fds 0/1/2, which clears the flag on exactly those
//! three; everything else (the caller-facing ends, pipes belonging to other
//! children) vanishes at exec. Without this a child would hold a write end
//! of its own stdin pipe and closing the caller's `stdin_fd` could never
//! deliver EOF.

use std::os::fd::{FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::process::{Command, Stdio};

use crate::cmdline;
use crate::error::{Error, Result};

/// A spawned child and the caller-facing pipe ends.
///
/// The caller owns all returned descriptors and the process handle; the
/// crate keeps no record of them. Lifetime correlation between the process
/// and its pipe ends is the caller's responsibility.
#[derive(Debug)]
pub struct SpawnedChild {
    /// Process identifier for `kill` / `wait`.
    pub pid: i32,
    /// Write end feeding the child's stdin.
    pub stdin_fd: RawFd,
    /// Read end carrying the child's stdout (and stderr when merged).
    pub stdout_fd: RawFd,
    /// Read end carrying the child's stderr; `None` when merged into stdout.
    pub stderr_fd: Option<RawFd>,
}

/// Allocate one pipe, both ends owned and close-on-exec.
fn pipe_pair() -> Result<(OwnedFd, OwnedFd)> {
    let mut fds: [libc::c_int; 2] = [0; 2];
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } == -1 {
        return Err(Error::spawn_call("pipe2", std::io::Error::last_os_error()));
    }
    // Safety: pipe2(2) succeeded, both descriptors are fresh and unowned.
    let read = unsafe { OwnedFd::from_raw_fd(fds[0]) };
    let write = unsafe { OwnedFd::from_raw_fd(fds[1]) };
    Ok((read, write))
}

/// Spawn `cmdline` with `npipe` redirected streams (2 = stderr merged into
/// stdout, 3 = stderr separate).
///
/// # Errors
///
/// `SpawnError` on a pipe-count out of range, an empty or malformed command
/// line, pipe creation, descriptor duplication, or process creation. All
/// descriptors allocated before the failure are closed before returning.
pub fn spawn_piped(npipe: i64, cmdline: &str) -> Result<SpawnedChild> {
    if npipe != 2 && npipe != 3 {
        return Err(Error::Spawn("npipe range error".into()));
    }
    let argv = cmdline::split(cmdline)?;
    if argv.is_empty() {
        return Err(Error::Spawn("empty command line".into()));
    }

    // Child reads stdin_read; parent keeps stdin_write.
    let (stdin_read, stdin_write) = pipe_pair()?;
    // Child writes stdout_write; parent keeps stdout_read.
    let (stdout_read, stdout_write) = pipe_pair()?;

    // stderr: its own pipe, or a duplicate of the stdout write end.
    let (stderr_read, stderr_write) = if npipe == 3 {
        let (r, w) = pipe_pair()?;
        (Some(r), w)
    } else {
        let dup = stdout_write
            .try_clone()
            .map_err(|e| Error::spawn_call("dup", e))?;
        (None, dup)
    };

    let child = Command::new(&argv[0])
        .args(&argv[1..])
        .stdin(Stdio::from(stdin_read))
        .stdout(Stdio::from(stdout_write))
        .stderr(Stdio::from(stderr_write))
        .spawn()
        .map_err(|e| Error::spawn_call("spawn", e))?;
    // Child-facing ends were consumed by the spawn and are now closed in
    // the parent; dropping `child` neither kills nor reaps the process.
    let pid = child.id() as i32;
    drop(child);

    log::debug!("[pipe-open] spawned pid {pid} for {:?} (npipe {npipe})", argv[0]);

    Ok(SpawnedChild {
        pid,
        stdin_fd: stdin_write.into_raw_fd(),
        stdout_fd: stdout_read.into_raw_fd(),
        stderr_fd: stderr_read.map(IntoRawFd::into_raw_fd),
    })
}
