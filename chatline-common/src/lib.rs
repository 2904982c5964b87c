//! Chatline Common Library
//!
//! Wire protocol, line I/O and validators shared by the chatline server and client.

pub mod io;
pub mod protocol;
pub mod validators;

/// Default TCP port for chatline connections
pub const DEFAULT_PORT: u16 = 5570;

/// Maximum length of a single protocol line in bytes (excluding the newline)
pub const MAX_LINE_LENGTH: usize = 4096;
