//! Runtime configuration consumed by the server library

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use chatline_common::DEFAULT_PORT;
use chatline_common::protocol::NoticeStyle;

use crate::constants::*;

/// Settings for a running [`Server`](crate::server::Server)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to
    pub bind_addr: SocketAddr,
    /// Deliver a sender's chat lines back to the sender
    pub echo: bool,
    /// Rendering of join/leave notices
    pub notice_style: NoticeStyle,
    /// Close active sessions that send nothing for this long
    pub idle_timeout: Option<Duration>,
    /// Time allowed for the handshake line after connecting
    pub handshake_timeout: Duration,
    /// Cap on simultaneous connections
    pub max_connections: usize,
    /// Cap on simultaneous connections per IP (0 = unlimited)
    pub max_connections_per_ip: usize,
    /// Capacity of each session's outbound queue
    pub outbound_queue: usize,
    /// Append chat activity to this file
    pub chat_log: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            echo: true,
            notice_style: NoticeStyle::Text,
            idle_timeout: None,
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_connections_per_ip: DEFAULT_MAX_CONNECTIONS_PER_IP,
            outbound_queue: DEFAULT_OUTBOUND_QUEUE,
            chat_log: None,
        }
    }
}

impl ServerConfig {
    /// Default configuration bound to an ephemeral loopback port
    pub fn loopback() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Self::default()
        }
    }
}
