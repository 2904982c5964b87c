//! Username validation

use std::fmt;

use crate::protocol::SERVER_SENDER;

/// Maximum length for usernames in characters
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Upper bound on a valid username's length in bytes
pub const MAX_USERNAME_BYTES: usize = MAX_USERNAME_LENGTH * 4;

/// `:` separates sender from text in chat lines
const SEPARATOR: char = ':';

/// Why a username was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    Empty,
    TooLong,
    /// Whitespace, control characters or the chat-line separator
    InvalidCharacters,
    /// The name announcements are sent under
    Reserved,
}

impl fmt::Display for UsernameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsernameError::Empty => write!(f, "username is empty"),
            UsernameError::TooLong => {
                write!(f, "username exceeds {} characters", MAX_USERNAME_LENGTH)
            }
            UsernameError::InvalidCharacters => {
                write!(f, "username contains whitespace, control characters or ':'")
            }
            UsernameError::Reserved => write!(f, "username is reserved"),
        }
    }
}

impl std::error::Error for UsernameError {}

/// Key under which a username is stored and looked up
///
/// Every account and session lookup compares usernames through this key,
/// so `Émile` and `émile` are the same identity everywhere.
pub fn username_key(username: &str) -> String {
    username.to_lowercase()
}

/// Validate a username
///
/// A username is a single token of at most 32 characters. It may not
/// contain whitespace, control characters or `:`, and may not be the
/// announcement sender name in any casing.
///
/// # Errors
///
/// Returns the first rule the username breaks.
pub fn validate_username(username: &str) -> Result<(), UsernameError> {
    if username.is_empty() {
        return Err(UsernameError::Empty);
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(UsernameError::TooLong);
    }
    let printable = |ch: char| !(ch.is_whitespace() || ch.is_control() || ch == SEPARATOR);
    if !username.chars().all(printable) {
        return Err(UsernameError::InvalidCharacters);
    }
    if username.eq_ignore_ascii_case(SERVER_SENDER) {
        return Err(UsernameError::Reserved);
    }
    Ok(())
}
