//! Password hashing with Argon2id
//!
//! Hashes are stored as PHC strings. A fast mode stores `$FAST$<password>`
//! instead and exists only to keep test suites quick; `verify_password`
//! recognizes both forms.

use std::fmt;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chatline_common::validators;

/// Prefix for fast (test-only) password hashes
const FAST_HASH_PREFIX: &str = "$FAST$";

/// Error type for password operations
#[derive(Debug)]
pub enum PasswordError {
    /// Password failed validation
    Validation(validators::PasswordError),
    /// Hashing or verification failed
    Hash(argon2::password_hash::Error),
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PasswordError::Validation(e) => write!(f, "invalid password: {}", e),
            PasswordError::Hash(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PasswordError {}

impl From<argon2::password_hash::Error> for PasswordError {
    fn from(err: argon2::password_hash::Error) -> Self {
        PasswordError::Hash(err)
    }
}

/// Hash a password
///
/// With `fast` set the result is `$FAST$<password>`, which is plaintext.
/// Never enable it outside tests.
pub fn hash_password(password: &str, fast: bool) -> Result<String, PasswordError> {
    validators::validate_password(password).map_err(PasswordError::Validation)?;

    if fast {
        return Ok(format!("{}{}", FAST_HASH_PREFIX, password));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored hash
///
/// Returns `Ok(false)` on mismatch and `Err` only when the stored hash is
/// malformed.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, PasswordError> {
    if let Some(stored) = password_hash.strip_prefix(FAST_HASH_PREFIX) {
        return Ok(stored == password);
    }

    let parsed = PasswordHash::new(password_hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::Hash(e)),
    }
}
