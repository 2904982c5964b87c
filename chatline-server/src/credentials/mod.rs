//! Credential storage
//!
//! The handshake only needs three operations from a store: an existence
//! check, an atomic create-if-absent, and password verification. Two
//! implementations exist: [`MemoryStore`] and the SQLite-backed
//! [`UserDb`](crate::db::UserDb).

mod memory;

pub use memory::MemoryStore;

use std::fmt;

use async_trait::async_trait;

/// Errors returned by a credential store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `create` was called for a username that already has an account
    AlreadyExists,
    /// The backing storage could not be reached or failed
    StorageUnavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::AlreadyExists => write!(f, "username already exists"),
            StoreError::StorageUnavailable(msg) => write!(f, "storage unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::StorageUnavailable(err.to_string())
    }
}

/// Account lookup and creation used during the handshake
///
/// Usernames are compared case-insensitively.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Whether an account exists for `username`
    async fn exists(&self, username: &str) -> Result<bool, StoreError>;

    /// Create an account
    ///
    /// The existence check and the insert happen as one atomic step: of two
    /// concurrent calls for the same username exactly one succeeds and the
    /// other returns `StoreError::AlreadyExists`.
    async fn create(&self, username: &str, password: &str) -> Result<(), StoreError>;

    /// Check a password, returning `false` for unknown users
    async fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError>;
}
