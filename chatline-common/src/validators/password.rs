//! Password validation
//!
//! Passwords travel as a single whitespace-delimited field of the handshake
//! line, so they cannot contain whitespace.

use std::fmt;

/// Maximum length for passwords in bytes
///
/// Bounds the cost of Argon2 hashing on the server.
pub const MAX_PASSWORD_LENGTH: usize = 256;

/// Validation error for passwords
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// Password is empty
    Empty,
    /// Password exceeds maximum length
    TooLong,
    /// Password contains whitespace or control characters
    InvalidCharacters,
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordError::Empty => write!(f, "password is empty"),
            PasswordError::TooLong => {
                write!(f, "password exceeds {} bytes", MAX_PASSWORD_LENGTH)
            }
            PasswordError::InvalidCharacters => {
                write!(f, "password contains whitespace or control characters")
            }
        }
    }
}

impl std::error::Error for PasswordError {}

/// Validate a password
///
/// # Errors
///
/// Returns a `PasswordError` variant describing the validation failure.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong);
    }
    if password
        .chars()
        .any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(PasswordError::InvalidCharacters);
    }
    Ok(())
}
