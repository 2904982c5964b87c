//! Account storage backed by the `users` table

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chatline_common::validators::username_key;
use sqlx::sqlite::SqlitePool;

use super::password::{hash_password, verify_password};
use super::sql;
use crate::credentials::{CredentialStore, StoreError};

/// Database access for user accounts
#[derive(Clone)]
pub struct UserDb {
    pool: SqlitePool,
    fast_hashing: bool,
}

impl UserDb {
    /// Create a new UserDb using Argon2 hashing
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            fast_hashing: false,
        }
    }

    /// Store new passwords with the fast test-only hash
    pub fn with_fast_hashing(mut self, fast: bool) -> Self {
        self.fast_hashing = fast;
        self
    }

    /// Number of registered accounts
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(sql::SQL_COUNT_USERS)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

#[async_trait]
impl CredentialStore for UserDb {
    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        let (exists,): (i64,) = sqlx::query_as(sql::SQL_USER_EXISTS)
            .bind(username_key(username))
            .fetch_one(&self.pool)
            .await?;
        Ok(exists != 0)
    }

    async fn create(&self, username: &str, password: &str) -> Result<(), StoreError> {
        let hash = hash_password(password, self.fast_hashing)
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;

        let result = sqlx::query(sql::SQL_INSERT_USER)
            .bind(username)
            .bind(username_key(username))
            .bind(&hash)
            .bind(Self::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists);
        }
        Ok(())
    }

    async fn verify(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let row: Option<(String,)> = sqlx::query_as(sql::SQL_GET_PASSWORD_HASH)
            .bind(username_key(username))
            .fetch_optional(&self.pool)
            .await?;

        let Some((hash,)) = row else {
            return Ok(false);
        };

        verify_password(password, &hash).map_err(|e| StoreError::StorageUnavailable(e.to_string()))
    }
}
