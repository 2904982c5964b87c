//! Command-line argument parsing

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use chatline_common::DEFAULT_PORT;
use chatline_common::protocol::NoticeStyle;
use chatline_server::ServerConfig;
use chatline_server::constants::*;
use clap::Parser;
use clap::builder::RangedU64ValueParser;

/// Get default database path help text for current platform
fn default_database_help() -> String {
    #[cfg(target_os = "linux")]
    return "Database file path (default: ~/.local/share/chatlined/chatline.db)".to_string();

    #[cfg(target_os = "macos")]
    return "Database file path (default: ~/Library/Application Support/chatlined/chatline.db)"
        .to_string();

    #[cfg(target_os = "windows")]
    return "Database file path (default: %APPDATA%\\chatlined\\chatline.db)".to_string();

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    return "Database file path (overrides platform default)".to_string();
}

/// Chatline chat server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// IP address to bind to (IPv4 or IPv6)
    #[arg(short, long, default_value = DEFAULT_BIND)]
    pub bind: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Database file path (overrides platform default)
    #[arg(short, long, help = default_database_help(), conflicts_with = "memory_store")]
    pub database: Option<PathBuf>,

    /// Keep accounts in memory only (lost on exit)
    #[arg(long, default_value = "false")]
    pub memory_store: bool,

    /// Do not echo chat lines back to their sender
    #[arg(long, default_value = "false")]
    pub no_echo: bool,

    /// Send USER_JOINED/USER_LEFT instead of text join/leave notices
    #[arg(long, default_value = "false")]
    pub structured_notices: bool,

    /// Disconnect sessions idle for this many seconds (0 = never)
    #[arg(long, default_value_t = 0)]
    pub idle_timeout: u64,

    /// Seconds a new connection has to send its handshake
    #[arg(long, default_value_t = DEFAULT_HANDSHAKE_TIMEOUT_SECS)]
    pub handshake_timeout: u64,

    /// Maximum simultaneous connections
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Maximum simultaneous connections per IP (0 = unlimited)
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS_PER_IP)]
    pub max_connections_per_ip: usize,

    /// Lines buffered per session before it counts as stalled
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_QUEUE, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub outbound_queue: usize,

    /// Append chat messages and join/leave events to this file
    #[arg(long)]
    pub chat_log: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, default_value = "false")]
    pub debug: bool,
}

impl Args {
    /// Server settings described by these arguments
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::new(self.bind, self.port),
            echo: !self.no_echo,
            notice_style: if self.structured_notices {
                NoticeStyle::Structured
            } else {
                NoticeStyle::Text
            },
            idle_timeout: (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout)),
            handshake_timeout: Duration::from_secs(self.handshake_timeout),
            max_connections: self.max_connections,
            max_connections_per_ip: self.max_connections_per_ip,
            outbound_queue: self.outbound_queue,
            chat_log: self.chat_log.clone(),
        }
    }
}
