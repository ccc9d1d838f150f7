//! TCP socket open/close and timeout-bounded read/write.
//!
//! Readiness comes from `select(2)` with a single-descriptor read or write
//! set and a split seconds/microseconds timeout, rather than the generic
//! `poll` wait the file path uses. The read/write contract is otherwise
//! identical to [`super::file`].
//!
//! `open` resolves the port (an all-digit string is parsed directly,
//! anything else is looked up as a service name) and the host (via
//! `getaddrinfo`) before connecting, so resolution failures and connect
//! failures surface as distinguishable errors.
//!
//! # Subsystem lifetime
//!
//! The socket subsystem is process-wide, reference-counted state: the first
//! `open` acquires and initializes it, the last `close` releases and tears
//! it down. The count lives behind a mutex ([`subsystem`]) so concurrent
//! embedding hosts stay correct; a failed `open` releases the count it
//! acquired via a scoped guard.

use std::ffi::CString;
use std::net::{TcpStream, ToSocketAddrs};
use std::os::fd::{IntoRawFd, RawFd};

use scopeguard::ScopeGuard;

use crate::error::{Error, Result};
use crate::io::{ReadOutcome, Timeout, READ_CHUNK};

/// Process-wide reference-counted socket subsystem.
///
/// On Unix there is no `WSAStartup` equivalent to run, but the
/// acquire/release pair is kept explicit so the initialization point is
/// observable and the count stays correct if a platform ever needs real
/// setup work.
pub mod subsystem {
    use std::sync::Mutex;

    static LIVE: Mutex<usize> = Mutex::new(0);

    /// Record one more live socket; initializes the subsystem on 0 → 1.
    pub fn acquire() {
        let mut live = LIVE.lock().expect("socket subsystem lock poisoned");
        *live += 1;
        if *live == 1 {
            log::debug!("[socket] subsystem initialized");
        }
    }

    /// Record one fewer live socket; tears the subsystem down on 1 → 0.
    pub fn release() {
        let mut live = LIVE.lock().expect("socket subsystem lock poisoned");
        *live = live.saturating_sub(1);
        if *live == 0 {
            log::debug!("[socket] subsystem torn down");
        }
    }

    /// Current live-socket count.
    pub fn live_count() -> usize {
        *LIVE.lock().expect("socket subsystem lock poisoned")
    }
}

/// Resolve a port argument: all-digit strings parse directly, anything else
/// is looked up as a TCP service name.
fn resolve_port(port: &str) -> Result<u16> {
    if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
        return port
            .parse()
            .map_err(|_| Error::Socket(format!("port number out of range: {port}")));
    }
    let c_name = CString::new(port)
        .map_err(|_| Error::protocol("port contains an interior NUL byte"))?;
    let servent = unsafe { libc::getservbyname(c_name.as_ptr(), std::ptr::null()) };
    if servent.is_null() {
        return Err(Error::Socket(format!("getservbyname() error: {port}")));
    }
    // s_port is in network byte order.
    Ok(u16::from_be(unsafe { (*servent).s_port } as u16))
}

/// Resolve `host`:`port` and connect. Returns the connected socket
/// descriptor; the caller owns it until `close`.
///
/// # Errors
///
/// `SocketError` distinguishing the failing stage: port resolution, host
/// resolution (`getaddrinfo`), or `connect`.
pub fn open(host: &str, port: &str) -> Result<RawFd> {
    subsystem::acquire();
    // Balance the count on any failure below.
    let guard = scopeguard::guard((), |()| subsystem::release());

    let port = resolve_port(port)?;
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::socket_call("getaddrinfo", e))?;
    let addr = addrs
        .next()
        .ok_or_else(|| Error::Socket(format!("getaddrinfo() error: no address for {host}")))?;
    let stream = TcpStream::connect(addr).map_err(|e| Error::socket_call("connect", e))?;

    ScopeGuard::into_inner(guard); // success: count stays acquired
    log::debug!("[socket-open] connected to {addr}");
    Ok(stream.into_raw_fd())
}

/// Close a socket and release its subsystem count.
///
/// # Errors
///
/// `SocketError` if `close(2)` fails; the subsystem count is only released
/// after a successful close.
pub fn close(fd: RawFd) -> Result<()> {
    if unsafe { libc::close(fd) } == -1 {
        return Err(Error::socket_call("close", std::io::Error::last_os_error()));
    }
    subsystem::release();
    Ok(())
}

/// Wait direction for [`wait_socket`].
#[derive(Debug, Clone, Copy)]
enum Direction {
    Read,
    Write,
}

/// `select(2)` on a single descriptor, bounded by `timeout`.
fn wait_socket(fd: RawFd, dir: Direction, timeout: Timeout) -> Result<bool> {
    let mut set = unsafe { std::mem::zeroed::<libc::fd_set>() };
    unsafe {
        libc::FD_ZERO(&mut set);
        libc::FD_SET(fd, &mut set);
    }
    let mut tv = timeout.to_timeval();
    let tv_ptr = if timeout.is_infinite() {
        std::ptr::null_mut()
    } else {
        &mut tv as *mut libc::timeval
    };
    let (read_set, write_set): (*mut libc::fd_set, *mut libc::fd_set) = match dir {
        Direction::Read => (&mut set, std::ptr::null_mut()),
        Direction::Write => (std::ptr::null_mut(), &mut set),
    };
    let n = unsafe { libc::select(fd + 1, read_set, write_set, std::ptr::null_mut(), tv_ptr) };
    if n < 0 {
        return Err(Error::socket_call("select", std::io::Error::last_os_error()));
    }
    Ok(n > 0)
}

/// Read up to `max` bytes (`max < 0` = unbounded) within `timeout`.
///
/// Identical contract to [`super::file::read`]: `eof` only on orderly
/// closure, accumulated bytes on timeout, greedy drain once data flows.
///
/// # Errors
///
/// `SocketError` on a `select` failure, `IoError` on a `recv` failure.
pub fn read(fd: RawFd, max: i64, timeout: Timeout) -> Result<ReadOutcome> {
    let mut remaining = max;
    let mut timeout = timeout;
    let mut out = Vec::new();
    let mut buf = [0u8; READ_CHUNK];

    while remaining != 0 {
        if !wait_socket(fd, Direction::Read, timeout)? {
            break; // timeout
        }
        let cap = if remaining > 0 {
            READ_CHUNK.min(remaining as usize)
        } else {
            READ_CHUNK
        };
        let n = unsafe { libc::recv(fd, buf.as_mut_ptr().cast(), cap, 0) };
        if n == -1 {
            return Err(Error::io_call("recv", std::io::Error::last_os_error()));
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

/// Write `data` within `timeout`, returning the count actually sent.
///
/// # Errors
///
/// `SocketError` on a `select` failure, `IoError` on a `send` failure.
pub fn write(fd: RawFd, data: &[u8], timeout: Timeout) -> Result<usize> {
    let mut written = 0;
    let mut timeout = timeout;

    while written < data.len() {
        if !wait_socket(fd, Direction::Write, timeout)? {
            break; // timeout
        }
        // Non-blocking send: a writable socket may still accept less than
        // the remaining payload, and a blocking send would sit out the
        // deadline waiting for the rest to fit.
        let n = unsafe {
            libc::send(
                fd,
                data[written..].as_ptr().cast(),
                data.len() - written,
                libc::MSG_DONTWAIT,
            )
        };
        if n == -1 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::WouldBlock {
                // Lost the readiness race; wait again.
                continue;
            }
            return Err(Error::io_call("send", err));
        }
        written += n as usize;
        // Progress made: keep sending without waiting.
        timeout = Timeout::POLL;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read as _, Write as _};
    use std::net::TcpListener;

    #[test]
    fn test_resolve_numeric_port() {
        assert_eq!(resolve_port("8080").unwrap(), 8080);
    }

    #[test]
    fn test_resolve_out_of_range_port_fails() {
        assert!(matches!(resolve_port("99999"), Err(Error::Socket(_))));
    }

    #[test]
    fn test_resolve_unknown_service_fails() {
        let err = resolve_port("no-such-service-xyz").unwrap_err();
        assert!(err.to_string().contains("getservbyname"));
    }

    #[test]
    fn test_open_echo_read_close() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 16];
            let n = conn.read(&mut buf).unwrap();
            conn.write_all(&buf[..n]).unwrap();
            // conn drops here: orderly shutdown
        });

        let fd = open("127.0.0.1", &port).unwrap();
        assert!(subsystem::live_count() >= 1);

        assert_eq!(write(fd, b"ping", Timeout::from_millis(2000)).unwrap(), 4);
        let out = read(fd, 4, Timeout::from_millis(2000)).unwrap();
        assert_eq!(out.data, b"ping");
        assert!(!out.eof);

        // After the server closes, the next read observes EOF.
        server.join().unwrap();
        let out = read(fd, -1, Timeout::from_millis(2000)).unwrap();
        assert!(out.eof);

        close(fd).unwrap();
    }

    #[test]
    fn test_zero_timeout_read_does_not_block() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        let fd = open("127.0.0.1", &port).unwrap();

        let out = read(fd, -1, Timeout::POLL).unwrap();
        assert!(out.data.is_empty());
        assert!(!out.eof);

        close(fd).unwrap();
        drop(listener);
    }

    fn shrink_buffer(fd: RawFd, opt: libc::c_int) {
        let size: libc::c_int = 4096;
        let r = unsafe {
            libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                opt,
                (&size as *const libc::c_int).cast(),
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        assert_eq!(r, 0, "setsockopt");
    }

    #[test]
    fn test_write_to_unread_peer_times_out_with_partial_count() {
        use std::os::fd::AsRawFd;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        // Small buffers on both sides so the payload cannot be absorbed;
        // the receive buffer is inherited by the accepted connection.
        shrink_buffer(listener.as_raw_fd(), libc::SO_RCVBUF);
        let port = listener.local_addr().unwrap().port().to_string();

        let fd = open("127.0.0.1", &port).unwrap();
        shrink_buffer(fd, libc::SO_SNDBUF);
        let (_conn, _) = listener.accept().unwrap(); // never read from

        let payload = vec![0u8; 1024 * 1024];
        let start = std::time::Instant::now();
        let n = write(fd, &payload, Timeout::from_millis(100)).unwrap();
        assert!(n > 0, "some bytes fit in the send buffer");
        assert!(n < payload.len(), "an unread peer cannot absorb the payload");
        assert!(
            start.elapsed() < std::time::Duration::from_secs(5),
            "the call must return at the deadline, not block on the full buffer"
        );

        close(fd).unwrap();
    }

    #[test]
    fn test_connect_refused_is_socket_error_and_balances_count() {
        // Bind then drop to get a port that is very likely unused.
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port().to_string()
        };
        let before = subsystem::live_count();
        let err = open("127.0.0.1", &port).unwrap_err();
        assert!(matches!(err, Error::Socket(_)));
        assert!(err.to_string().starts_with("connect() error: "));
        assert_eq!(subsystem::live_count(), before, "failed open must release");
    }

    #[test]
    fn test_resolution_failure_names_getaddrinfo() {
        let err = open("host.invalid.procio.test", "80").unwrap_err();
        assert!(err.to_string().starts_with("getaddrinfo() error: "), "{err}");
    }
}
