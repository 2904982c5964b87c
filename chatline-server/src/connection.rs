//! Client connection handling

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use chatline_common::io::{LineError, LineReader, LineWriter};
use chatline_common::protocol::{ChatInput, KICKED_LINE, Reply};
use chatline_common::validators::MAX_MESSAGE_LENGTH;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{Instant, Sleep};
use tracing::{debug, info, trace};

use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::credentials::CredentialStore;
use crate::events::ServerEvent;
use crate::handlers::{
    self, ActiveSession, HandlerContext, rejected, write_line_with_timeout,
};
use crate::sessions::Session;

/// Parameters for handling a connection
pub struct ConnectionParams {
    pub peer_addr: SocketAddr,
    pub broadcaster: Broadcaster,
    pub store: Arc<dyn CredentialStore>,
    pub config: Arc<ServerConfig>,
}

/// Lifecycle of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket accepted, nothing exchanged
    Connecting,
    /// Waiting for or processing the handshake line
    Authenticating,
    /// Registered and exchanging chat
    Active,
    /// Tearing down the session
    Closing,
    /// Finished
    Closed,
}

impl ConnectionState {
    fn can_become(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Authenticating)
                | (Authenticating, Active)
                | (Authenticating, Closing)
                | (Active, Closing)
                | (Closing, Closed)
        )
    }
}

/// Why the read loop of an active session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    Disconnected,
    Kicked,
    IdleTimeout,
    ProtocolError,
    TransportError,
}

struct Connection {
    peer_addr: SocketAddr,
    state: ConnectionState,
}

/// Borrowed view of the server state a connection works with
struct Shared<'a> {
    peer_addr: SocketAddr,
    broadcaster: &'a Broadcaster,
    store: &'a dyn CredentialStore,
    config: &'a ServerConfig,
}

impl<'a> Shared<'a> {
    fn context<'w, W>(&self, writer: &'w mut LineWriter<W>) -> HandlerContext<'w, W>
    where
        'a: 'w,
    {
        HandlerContext {
            writer,
            peer_addr: self.peer_addr,
            broadcaster: self.broadcaster,
            store: self.store,
            config: self.config,
        }
    }
}

impl Connection {
    fn transition(&mut self, next: ConnectionState) {
        debug_assert!(
            self.state.can_become(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        trace!(peer = %self.peer_addr, from = ?self.state, to = ?next, "connection state");
        self.state = next;
    }
}

/// Handle a client connection over any byte stream
///
/// Per-connection failures end only this connection; the returned error is
/// for logging.
pub async fn handle_connection<S>(socket: S, params: ConnectionParams) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ConnectionParams {
        peer_addr,
        broadcaster,
        store,
        config,
    } = params;

    let shared = Shared {
        peer_addr,
        broadcaster: &broadcaster,
        store: store.as_ref(),
        config: &config,
    };
    let mut conn = Connection {
        peer_addr,
        state: ConnectionState::Connecting,
    };

    let (reader, writer) = tokio::io::split(socket);
    let mut reader = LineReader::new(reader);
    let mut writer = LineWriter::new(writer);

    conn.transition(ConnectionState::Authenticating);
    let active = match authenticate(&mut reader, &mut writer, &shared).await {
        Ok(Some(active)) => active,
        other => {
            conn.transition(ConnectionState::Closing);
            let _ = writer.shutdown().await;
            conn.transition(ConnectionState::Closed);
            return other.map(|_| ());
        }
    };

    conn.transition(ConnectionState::Active);
    let ActiveSession {
        session,
        mut outbound,
    } = active;

    // Longer lines could not be rebroadcast within MAX_LINE_LENGTH
    reader.set_max_length(MAX_MESSAGE_LENGTH);

    let reason = run_session(&mut reader, &mut writer, &session, &mut outbound, &shared).await;

    conn.transition(ConnectionState::Closing);
    outbound.close();
    close_session(&session, &broadcaster, &config).await;
    let _ = writer.shutdown().await;
    conn.transition(ConnectionState::Closed);

    info!(peer = %peer_addr, user = %session.username, reason = ?reason, "user left");
    Ok(())
}

/// Read and process the handshake line
///
/// `Ok(None)` means the peer went away or timed out before sending one.
async fn authenticate<R, W>(
    reader: &mut LineReader<R>,
    writer: &mut LineWriter<W>,
    shared: &Shared<'_>,
) -> io::Result<Option<ActiveSession>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let peer_addr = shared.peer_addr;
    let line = match reader
        .read_line_with_timeout(shared.config.handshake_timeout)
        .await
    {
        Ok(Some(line)) => line,
        Ok(None) => {
            debug!(peer = %peer_addr, "disconnected before handshake");
            return Ok(None);
        }
        Err(LineError::IdleTimeout) => {
            debug!(peer = %peer_addr, "handshake timed out");
            return Ok(None);
        }
        Err(LineError::Io(e)) => return Err(e),
        Err(e) => {
            debug!(peer = %peer_addr, err = %e, "unreadable handshake");
            write_line_with_timeout(writer, Reply::InvalidCommand.as_ref()).await?;
            return Err(rejected(Reply::InvalidCommand));
        }
    };

    let mut ctx = shared.context(writer);
    handlers::handle_handshake(&line, &mut ctx).await.map(Some)
}

/// Pump lines in both directions until the session ends
async fn run_session<R, W>(
    reader: &mut LineReader<R>,
    writer: &mut LineWriter<W>,
    session: &Session,
    outbound: &mut mpsc::Receiver<String>,
    shared: &Shared<'_>,
) -> CloseReason
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let peer_addr = shared.peer_addr;
    let idle_timeout = shared.config.idle_timeout;
    let mut idle = idle_timeout.map(|d| Box::pin(tokio::time::sleep(d)));

    loop {
        tokio::select! {
            _ = session.kicked() => {
                let _ = write_line_with_timeout(writer, KICKED_LINE).await;
                return CloseReason::Kicked;
            }

            line = outbound.recv() => {
                let Some(line) = line else {
                    return CloseReason::Kicked;
                };
                if let Err(e) = write_line_with_timeout(writer, &line).await {
                    debug!(peer = %peer_addr, err = %e, "write failed");
                    return CloseReason::TransportError;
                }
            }

            result = reader.read_line() => {
                let line = match result {
                    Ok(Some(line)) => line,
                    Ok(None) => return CloseReason::Disconnected,
                    Err(LineError::Io(e)) => {
                        debug!(peer = %peer_addr, err = %e, "read failed");
                        return CloseReason::TransportError;
                    }
                    Err(e) => {
                        debug!(peer = %peer_addr, err = %e, "protocol error");
                        return CloseReason::ProtocolError;
                    }
                };

                if let (Some(sleep), Some(timeout)) = (idle.as_mut(), idle_timeout) {
                    sleep.as_mut().reset(Instant::now() + timeout);
                }

                let mut ctx = shared.context(writer);
                if let Err(e) = handle_session_line(&line, session, &mut ctx).await {
                    debug!(peer = %peer_addr, err = %e, "handler failed");
                    return CloseReason::TransportError;
                }
            }

            _ = idle_expired(&mut idle) => {
                return CloseReason::IdleTimeout;
            }
        }
    }
}

/// Dispatch one line from an active session
async fn handle_session_line<W>(
    line: &str,
    session: &Session,
    ctx: &mut HandlerContext<'_, W>,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match ChatInput::classify(line) {
        ChatInput::Presence(presence) => handlers::handle_presence(presence, session, ctx).await,
        ChatInput::Text(text) => handlers::handle_chat(text, session, ctx).await,
        ChatInput::Blank => Ok(()),
    }
}

async fn idle_expired(idle: &mut Option<Pin<Box<Sleep>>>) {
    match idle {
        Some(sleep) => sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

/// Remove a session and announce its departure
///
/// Only the first call for a session does anything.
pub async fn close_session(session: &Session, broadcaster: &Broadcaster, config: &ServerConfig) {
    if !session.mark_closed() {
        return;
    }

    broadcaster.registry().remove_session(session).await;

    let notice = config.notice_style.left(&session.username);
    broadcaster.broadcast_and_evict(&notice, None).await;
    broadcaster.publish(ServerEvent::Left {
        username: session.username.clone(),
    });
}
