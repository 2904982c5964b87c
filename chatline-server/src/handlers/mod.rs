//! Handlers for handshake and chat lines

mod chat;
mod handshake;
mod login;
mod presence;
mod signup;

#[cfg(test)]
pub mod testing;

pub use chat::handle_chat;
pub use handshake::handle_handshake;
pub use login::handle_login;
pub use presence::handle_presence;
pub use signup::handle_signup;

use std::io;
use std::net::SocketAddr;

use chatline_common::io::LineWriter;
use chatline_common::protocol::Reply;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::constants::WRITE_TIMEOUT;
use crate::credentials::CredentialStore;
use crate::sessions::{Session, SessionRegistry};

/// Context passed to all handlers with shared resources
pub struct HandlerContext<'a, W> {
    pub writer: &'a mut LineWriter<W>,
    pub peer_addr: SocketAddr,
    pub broadcaster: &'a Broadcaster,
    pub store: &'a dyn CredentialStore,
    pub config: &'a ServerConfig,
}

/// A registered session together with the receiving end of its queue
pub struct ActiveSession {
    pub session: Session,
    pub outbound: mpsc::Receiver<String>,
}

impl<'a, W: AsyncWrite + Unpin> HandlerContext<'a, W> {
    pub fn registry(&self) -> &SessionRegistry {
        self.broadcaster.registry()
    }

    /// Write a line straight to this connection's socket
    pub async fn send_line(&mut self, line: &str) -> io::Result<()> {
        write_line_with_timeout(self.writer, line).await
    }

    /// Send a handshake reply
    pub async fn send_reply(&mut self, reply: Reply) -> io::Result<()> {
        self.send_line(reply.as_ref()).await
    }

    /// Send a handshake reply, then end the connection
    ///
    /// Always returns `Err` with kind `PermissionDenied` so callers can
    /// `return` it directly.
    pub async fn send_reply_and_disconnect<T>(&mut self, reply: Reply) -> io::Result<T> {
        self.send_reply(reply).await?;
        Err(rejected(reply))
    }
}

/// Write one line, giving up after `WRITE_TIMEOUT`
pub async fn write_line_with_timeout<W: AsyncWrite + Unpin>(
    writer: &mut LineWriter<W>,
    line: &str,
) -> io::Result<()> {
    match timeout(WRITE_TIMEOUT, writer.write_line(line)).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out")),
    }
}

/// Error used to end a connection after a handshake rejection
pub fn rejected(reply: Reply) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("handshake rejected: {}", reply),
    )
}
