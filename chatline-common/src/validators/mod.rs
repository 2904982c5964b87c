//! Input validation functions
//!
//! Shared between client and server - clients can use them for pre-validation,
//! the server uses them for enforcement.

mod message;
mod password;
mod username;

pub use message::{MAX_MESSAGE_LENGTH, MessageError, validate_message};
pub use password::{MAX_PASSWORD_LENGTH, PasswordError, validate_password};
pub use username::{
    MAX_USERNAME_BYTES, MAX_USERNAME_LENGTH, UsernameError, username_key, validate_username,
};
