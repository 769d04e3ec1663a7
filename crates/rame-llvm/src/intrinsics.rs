//! Reserved intrinsic names.
//!
//! They start with a digit so no user identifier can collide with them;
//! after mangling they become `_Z50READ` and `_Z60WRITE`, the symbols the
//! reference runtime defines.

/// Reads one integer from standard input. Signature: `() -> i16`.
pub const READ: &str = "0READ";

/// Writes one integer to standard output. Signature: `(i16) -> ()`.
pub const WRITE: &str = "0WRITE";
