//! SQL query constants for database operations

// ========================================================================
// User Query Operations
// ========================================================================

/// Check whether a username exists
///
/// **Parameters:**
/// 1. `username_key: &str` - case-folded username
///
/// **Returns:** `(exists: i64)` - 1 or 0
pub const SQL_USER_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM users WHERE username_key = ?)";

/// Insert a user unless the username is taken
///
/// **Parameters:**
/// 1. `username: &str` - as typed at signup
/// 2. `username_key: &str` - case-folded username
/// 3. `password_hash: &str`
/// 4. `created_at: i64` - Unix timestamp
///
/// **Note:** Affects 0 rows when the username already exists, so the
/// existence check and insert are a single statement.
pub const SQL_INSERT_USER: &str = "INSERT INTO users (username, username_key, password_hash, created_at) \
     VALUES (?, ?, ?, ?) ON CONFLICT(username_key) DO NOTHING";

/// Get a user's stored password hash
///
/// **Parameters:**
/// 1. `username_key: &str` - case-folded username
///
/// **Returns:** `(password_hash: String)`
pub const SQL_GET_PASSWORD_HASH: &str = "SELECT password_hash FROM users WHERE username_key = ?";

/// Count all accounts
///
/// **Returns:** `(count: i64)`
pub const SQL_COUNT_USERS: &str = "SELECT COUNT(*) FROM users";
