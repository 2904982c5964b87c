//! Client constants

use std::time::Duration;

/// Time allowed to establish the TCP connection
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed for each handshake reply
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffer size for the inbound line channel
pub const INBOUND_CHANNEL_SIZE: usize = 100;
