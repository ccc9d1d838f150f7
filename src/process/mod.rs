//! Child-process lifecycle: redirected spawn, signal delivery, and
//! non-blocking exit polling.

pub mod control;
pub mod spawn;

pub use control::{kill, wait_nonblocking, WaitState};
pub use spawn::{spawn_piped, SpawnedChild};
