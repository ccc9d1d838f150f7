//! Error taxonomy for the call boundary.
//!
//! Every failure surfaces synchronously to the immediate caller as a
//! descriptive message (operation name + underlying system error text).
//! The variants form a closed set so embedding hosts can branch on the
//! failure class while still getting a plain string via `Display`:
//!
//! - [`Error::Protocol`] — malformed or mismatched arguments; raised before
//!   any OS call is made.
//! - [`Error::Io`] — wait/read/write/peek failure on an open resource.
//! - [`Error::Spawn`] — any step of process + pipe construction failed.
//! - [`Error::Socket`] — resolution, connect, or subsystem failure.
//! - [`Error::Kill`] — signal delivery failure.
//! - [`Error::Unsupported`] — operation family with no implementation (pty).
//!
//! No error is fatal to the embedding process; each call fails independently
//! and every handle the caller owns remains usable afterwards.

use std::fmt::Display;

/// Failure classes for every operation in the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or mismatched call arguments. Never reaches the OS.
    #[error("{0}")]
    Protocol(String),

    /// Wait, read, write, or peek failure on an open resource.
    #[error("{0}")]
    Io(String),

    /// Pipe creation, descriptor duplication, or process creation failure.
    #[error("{0}")]
    Spawn(String),

    /// Name resolution, connect, or socket-subsystem failure.
    #[error("{0}")]
    Socket(String),

    /// Signal delivery to a process failed.
    #[error("{0}")]
    Kill(String),

    /// Operation family that is permanently unimplemented.
    #[error("{0}")]
    Unsupported(&'static str),
}

impl Error {
    /// `IoError` from a named syscall and its OS error.
    pub(crate) fn io_call(call: &str, err: impl Display) -> Self {
        Error::Io(format!("{call}() error: {err}"))
    }

    /// `SpawnError` from a named syscall and its OS error.
    pub(crate) fn spawn_call(call: &str, err: impl Display) -> Self {
        Error::Spawn(format!("{call}() error: {err}"))
    }

    /// `SocketError` from a named syscall and its OS error.
    pub(crate) fn socket_call(call: &str, err: impl Display) -> Self {
        Error::Socket(format!("{call}() error: {err}"))
    }

    /// `ProtocolError` with a plain message.
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
