//! Chat message validation

use std::fmt;

use super::MAX_USERNAME_BYTES;
use crate::MAX_LINE_LENGTH;

/// Maximum length for a chat message body in bytes
///
/// A `<username>: <body>` line built from any valid username and a body of
/// this length still fits in `MAX_LINE_LENGTH`.
pub const MAX_MESSAGE_LENGTH: usize = MAX_LINE_LENGTH - MAX_USERNAME_BYTES - ": ".len();

/// Validation error for chat messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Message is empty or whitespace only
    Empty,
    /// Message exceeds maximum length
    TooLong,
    /// Message contains a line break
    ContainsNewlines,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Empty => write!(f, "message is empty"),
            MessageError::TooLong => write!(f, "message exceeds {} bytes", MAX_MESSAGE_LENGTH),
            MessageError::ContainsNewlines => write!(f, "message contains a line break"),
        }
    }
}

impl std::error::Error for MessageError {}

/// Validate a chat message body before it is put on the wire
///
/// # Errors
///
/// Returns a `MessageError` variant describing the validation failure.
pub fn validate_message(message: &str) -> Result<(), MessageError> {
    if message.trim().is_empty() {
        return Err(MessageError::Empty);
    }
    if message.len() > MAX_MESSAGE_LENGTH {
        return Err(MessageError::TooLong);
    }
    if message.contains(['\n', '\r']) {
        return Err(MessageError::ContainsNewlines);
    }
    Ok(())
}
