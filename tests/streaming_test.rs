// Integration tests for the typed API: timeout-bounded streaming from a
// live child process, exercising the wait/drain read contract end to end.
//
// Run with: cargo test --test streaming_test

use std::time::{Duration, Instant};

use procio::io::{pipe, Timeout};
use procio::process::{spawn_piped, wait_nonblocking, WaitState};

fn reap(pid: i32) {
    while matches!(wait_nonblocking(pid).unwrap(), WaitState::Running) {
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_incremental_output_arrives_per_poll() {
    // The child emits a line, pauses, emits another. A generous timeout on
    // the first read must return as soon as the first line lands rather
    // than waiting out the pause for the second.
    let child = spawn_piped(2, "sh -c 'echo first; sleep 0.4; echo second'").unwrap();

    let start = Instant::now();
    let chunk = pipe::read(child.stdout_fd, -1, Timeout::from_millis(5000)).unwrap();
    assert_eq!(chunk.data, b"first\n");
    assert!(!chunk.eof);
    assert!(
        start.elapsed() < Duration::from_millis(350),
        "read must return with the first burst, not wait for the pause"
    );

    // Second burst, then EOF when the child exits.
    let mut rest = Vec::new();
    loop {
        let chunk = pipe::read(child.stdout_fd, -1, Timeout::from_millis(5000)).unwrap();
        rest.extend_from_slice(&chunk.data);
        if chunk.eof {
            break;
        }
    }
    assert_eq!(rest, b"second\n");

    pipe::close(child.stdin_fd).unwrap();
    pipe::close(child.stdout_fd).unwrap();
    reap(child.pid);
}

#[test]
fn test_timeout_returns_partial_without_eof() {
    // Nothing arrives within the deadline: empty, not EOF, and the
    // deadline is honored rather than blocking indefinitely.
    let child = spawn_piped(2, "sh -c 'sleep 1; echo late'").unwrap();

    let start = Instant::now();
    let chunk = pipe::read(child.stdout_fd, -1, Timeout::from_millis(100)).unwrap();
    let elapsed = start.elapsed();
    assert!(chunk.data.is_empty());
    assert!(!chunk.eof);
    assert!(elapsed >= Duration::from_millis(90), "deadline honored: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(800), "deadline bounded: {elapsed:?}");

    // The late line is still there for a later read.
    let mut out = Vec::new();
    loop {
        let chunk = pipe::read(child.stdout_fd, -1, Timeout::from_millis(5000)).unwrap();
        out.extend_from_slice(&chunk.data);
        if chunk.eof {
            break;
        }
    }
    assert_eq!(out, b"late\n");

    pipe::close(child.stdin_fd).unwrap();
    pipe::close(child.stdout_fd).unwrap();
    reap(child.pid);
}

#[test]
fn test_large_payload_crosses_in_bounded_chunks() {
    // 256 KiB through cat: far beyond one pipe buffer and one read chunk,
    // so both the chunked read loop and the write readiness loop engage.
    let payload: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
    let child = spawn_piped(2, "cat").unwrap();

    let fd_in = child.stdin_fd;
    let body = payload.clone();
    let writer = std::thread::spawn(move || {
        let mut sent = 0;
        while sent < body.len() {
            sent += pipe::write(fd_in, &body[sent..], Timeout::from_millis(5000)).unwrap();
        }
        pipe::close(fd_in).unwrap();
    });

    let mut received = Vec::new();
    loop {
        let chunk = pipe::read(child.stdout_fd, -1, Timeout::from_millis(5000)).unwrap();
        received.extend_from_slice(&chunk.data);
        if chunk.eof {
            break;
        }
    }
    writer.join().unwrap();

    assert_eq!(received.len(), payload.len());
    assert_eq!(received, payload);

    pipe::close(child.stdout_fd).unwrap();
    reap(child.pid);
}

#[test]
fn test_bounded_read_leaves_surplus_for_next_call() {
    let child = spawn_piped(2, "sh -c 'printf abcdefgh'").unwrap();

    let first = pipe::read(child.stdout_fd, 3, Timeout::from_millis(5000)).unwrap();
    assert_eq!(first.data, b"abc");
    assert!(!first.eof, "byte limit reached is not end of stream");

    let mut rest = Vec::new();
    loop {
        let chunk = pipe::read(child.stdout_fd, -1, Timeout::from_millis(5000)).unwrap();
        rest.extend_from_slice(&chunk.data);
        if chunk.eof {
            break;
        }
    }
    assert_eq!(rest, b"defgh");

    pipe::close(child.stdin_fd).unwrap();
    pipe::close(child.stdout_fd).unwrap();
    reap(child.pid);
}
