//! SQLite persistence for accounts

pub mod password;
mod sql;
mod users;

pub use password::{PasswordError, hash_password, verify_password};
pub use users::UserDb;

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::constants::{DATA_DIR_NAME, DATABASE_FILE_NAME, ERR_DATA_DIR};

/// Handles to each table's operations
#[derive(Clone)]
pub struct Database {
    pub users: UserDb,
}

impl Database {
    /// Wrap an initialized pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: UserDb::new(pool),
        }
    }
}

/// Platform default database location, creating its directory if needed
///
/// Linux: `~/.local/share/chatlined/chatline.db`
pub fn default_database_path() -> Result<PathBuf, String> {
    let data_dir = dirs::data_dir().ok_or_else(|| ERR_DATA_DIR.to_string())?;
    let app_dir = data_dir.join(DATA_DIR_NAME);
    fs::create_dir_all(&app_dir)
        .map_err(|e| format!("failed to create {}: {}", app_dir.display(), e))?;
    Ok(app_dir.join(DATABASE_FILE_NAME))
}

/// Open (creating if absent) the database at `path` and run migrations
pub async fn init_db(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

/// Open a private in-memory database with migrations applied
///
/// A single connection is used so every query sees the same database.
pub async fn init_memory_db() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}
