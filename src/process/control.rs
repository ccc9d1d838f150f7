//! Process control: signal delivery and non-blocking exit polling.

use crate::error::{Error, Result};

/// Current run state of a spawned child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// The process has not changed state; poll again later.
    Running,
    /// The process exited with this code (`128 + signal` when signaled).
    Exited(i32),
}

/// Deliver `sig` to `pid` so the target's own signal/exit path runs.
///
/// A non-positive signal number defaults to `SIGTERM`. The signal number is
/// otherwise passed through unchanged.
///
/// # Errors
///
/// `KillError` if delivery fails (no such process, permission, bad signal).
pub fn kill(pid: i32, sig: i32) -> Result<()> {
    let sig = if sig <= 0 { libc::SIGTERM } else { sig };
    if unsafe { libc::kill(pid, sig) } == -1 {
        return Err(Error::Kill(format!(
            "kill() error: {}",
            std::io::Error::last_os_error()
        )));
    }
    log::debug!("[kill] delivered signal {sig} to pid {pid}");
    Ok(())
}

/// Poll `pid` without blocking.
///
/// Returns [`WaitState::Running`] while the child has not exited. An exited
/// child is reaped and reported once; a later poll of the same pid fails
/// with `IoError` (the status is gone with the zombie).
///
/// # Errors
///
/// `IoError` on a `waitpid` failure, including polling a pid that was
/// already reaped or never was a child of this process.
pub fn wait_nonblocking(pid: i32) -> Result<WaitState> {
    let mut status: libc::c_int = 0;
    let r = unsafe { libc::waitpid(pid, &mut status, libc::WNOHANG) };
    if r == -1 {
        return Err(Error::io_call("waitpid", std::io::Error::last_os_error()));
    }
    if r == 0 {
        return Ok(WaitState::Running);
    }
    if libc::WIFEXITED(status) {
        Ok(WaitState::Exited(libc::WEXITSTATUS(status)))
    } else if libc::WIFSIGNALED(status) {
        Ok(WaitState::Exited(128 + libc::WTERMSIG(status)))
    } else {
        // Stopped/continued: still alive from the caller's point of view.
        Ok(WaitState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::spawn::spawn_piped;

    fn poll_until_exit(pid: i32) -> i32 {
        for _ in 0..1000 {
            match wait_nonblocking(pid).unwrap() {
                WaitState::Running => std::thread::sleep(std::time::Duration::from_millis(5)),
                WaitState::Exited(code) => return code,
            }
        }
        panic!("child {pid} did not exit in time");
    }

    #[test]
    fn test_running_then_exit_with_real_code() {
        let child = spawn_piped(2, "sh -c 'sleep 0.2; exit 7'").unwrap();
        assert_eq!(wait_nonblocking(child.pid).unwrap(), WaitState::Running);
        assert_eq!(poll_until_exit(child.pid), 7);
        crate::io::pipe::close(child.stdin_fd).unwrap();
        crate::io::pipe::close(child.stdout_fd).unwrap();
    }

    #[test]
    fn test_kill_reports_signal_exit() {
        let child = spawn_piped(2, "sleep 30").unwrap();
        kill(child.pid, libc::SIGKILL).unwrap();
        assert_eq!(poll_until_exit(child.pid), 128 + libc::SIGKILL);
        crate::io::pipe::close(child.stdin_fd).unwrap();
        crate::io::pipe::close(child.stdout_fd).unwrap();
    }

    #[test]
    fn test_default_signal_terminates() {
        let child = spawn_piped(2, "sleep 30").unwrap();
        kill(child.pid, 0).unwrap(); // non-positive → SIGTERM
        assert_eq!(poll_until_exit(child.pid), 128 + libc::SIGTERM);
        crate::io::pipe::close(child.stdin_fd).unwrap();
        crate::io::pipe::close(child.stdout_fd).unwrap();
    }

    #[test]
    fn test_kill_missing_process_is_kill_error() {
        // PID near the usual pid_max; extremely unlikely to exist.
        let err = kill(0x3FFFFFF, libc::SIGTERM).unwrap_err();
        assert!(matches!(err, Error::Kill(_)));
        assert!(err.to_string().starts_with("kill() error: "));
    }

    #[test]
    fn test_wait_after_reap_is_io_error() {
        let child = spawn_piped(2, "true").unwrap();
        poll_until_exit(child.pid);
        let err = wait_nonblocking(child.pid).unwrap_err();
        assert!(err.to_string().starts_with("waitpid() error: "));
        crate::io::pipe::close(child.stdin_fd).unwrap();
        crate::io::pipe::close(child.stdout_fd).unwrap();
    }
}
