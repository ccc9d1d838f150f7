//! Host-agnostic process and I/O primitives behind a textual call boundary.
//!
//! The crate gives an embedding host (an editor, a scripting runtime, any
//! program that cannot link OS specifics directly) a small set of named
//! operations over files, pipes, child processes, and TCP sockets. Every
//! call crosses one uniform boundary:
//!
//! ```text
//! host ──"pipe-open", encoded args──►  invoke()  ──syscalls──►  OS
//!      ◄────────tagged Reply──────────
//! ```
//!
//! Arguments and results travel as typed, length-prefixed fields (see
//! [`stack`]); handles are opaque numbers the caller owns outright. The
//! crate keeps no per-handle state — the only global is the reference
//! count behind the socket subsystem.
//!
//! Reads and writes are timeout-bounded: a blocking wait up to the given
//! deadline, then greedy draining while data flows, with accumulated
//! partial data returned on timeout rather than discarded. See
//! [`io::file::read`] for the exact contract.
//!
//! The typed layer is public too, so a host linking the crate natively can
//! call [`process::spawn_piped`] or [`io::socket::open`] directly and skip
//! the encoding round-trip.

pub mod cmdline;
pub mod error;
pub mod flags;
pub mod io;
pub mod ops;
pub mod process;
pub mod stack;

pub use error::{Error, Result};
pub use io::{ReadOutcome, Timeout};
pub use ops::{invoke, Reply};
