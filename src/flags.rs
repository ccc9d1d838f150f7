//! Symbolic open-flag-name parsing.
//!
//! `file-open` receives its flags as a whitespace-separated set of symbolic
//! names (`"O_WRONLY O_CREAT O_TRUNC"`). Names map to the platform's native
//! `O_*` bits; names the platform does not support — and names we do not
//! recognize at all — are silently ignored so one flag string can serve
//! multiple hosts.

use libc::c_int;

/// Map a whitespace-separated set of symbolic flag names to native open bits.
///
/// Order does not matter and duplicates are harmless. `O_RDRW` is accepted
/// as a legacy alias for `O_RDWR` (historical caller compatibility).
/// `O_BINARY` / `O_TEXT` are recognized but have no effect on Unix.
pub fn parse_open_flags(names: &str) -> c_int {
    let mut bits: c_int = 0;
    for name in names.split_whitespace() {
        bits |= match name {
            "O_RDONLY" => libc::O_RDONLY,
            "O_WRONLY" => libc::O_WRONLY,
            "O_RDWR" | "O_RDRW" => libc::O_RDWR,
            "O_NONBLOCK" => libc::O_NONBLOCK,
            "O_APPEND" => libc::O_APPEND,
            "O_CREAT" => libc::O_CREAT,
            "O_EXCL" => libc::O_EXCL,
            "O_TRUNC" => libc::O_TRUNC,
            "O_NOFOLLOW" => libc::O_NOFOLLOW,
            #[cfg(target_os = "linux")]
            "O_DIRECT" => libc::O_DIRECT,
            "O_FSYNC" => libc::O_SYNC,
            // Text/binary translation modes do not exist on Unix.
            "O_BINARY" | "O_TEXT" => 0,
            _ => 0,
        };
    }
    bits
}
