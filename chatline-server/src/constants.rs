//! Server-wide constants

use std::time::Duration;

// =============================================================================
// Defaults
// =============================================================================

/// Default address to bind to
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Default seconds an unauthenticated connection may take to send its handshake
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 30;

/// Default cap on simultaneous connections
pub const DEFAULT_MAX_CONNECTIONS: usize = 256;

/// Default cap on simultaneous connections from one IP (0 = unlimited)
pub const DEFAULT_MAX_CONNECTIONS_PER_IP: usize = 8;

/// Default capacity of each session's outbound queue
pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;

/// Consecutive failed enqueues after which a session is forcibly removed
pub const MAX_SEND_FAILURES: u32 = 3;

/// Capacity of the server event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// How long a single socket write may take before the session is dropped
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause after a failed accept before trying again
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Directory under the platform data dir that holds server state
pub const DATA_DIR_NAME: &str = "chatlined";

/// Database file name inside the data directory
pub const DATABASE_FILE_NAME: &str = "chatline.db";

// =============================================================================
// Log Messages
// =============================================================================

pub const MSG_BANNER: &str = "chatlined v";
pub const MSG_LISTENING: &str = "listening";
pub const MSG_DATABASE: &str = "using database";
pub const MSG_MEMORY_STORE: &str = "using in-memory credential store (accounts are not persisted)";
pub const MSG_CHAT_LOG: &str = "appending chat log";
pub const MSG_SHUTDOWN_RECEIVED: &str = "shutdown requested";

pub const ERR_ACCEPT: &str = "failed to accept connection";
pub const ERR_BIND: &str = "failed to bind";
pub const ERR_CONNECTION_LIMIT: &str = "connection limit reached, dropping";
pub const ERR_DATABASE_INIT: &str = "failed to initialize database";
pub const ERR_DATA_DIR: &str = "could not determine data directory";
pub const ERR_SET_PERMISSIONS: &str = "failed to set database permissions";
pub const ERR_SIGNAL: &str = "failed to install signal handler";
