//! Listener, accept loop and admin control

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use chatline_common::protocol::{Presence, SERVER_SENDER};
use chatline_common::validators::{self, MessageError};
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, broadcast, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::broadcast::Broadcaster;
use crate::chat_log::spawn_chat_log;
use crate::config::ServerConfig;
use crate::connection::{ConnectionParams, handle_connection};
use crate::connection_tracker::ConnectionTracker;
use crate::constants::*;
use crate::credentials::CredentialStore;
use crate::events::{ChatMessage, EventSender, ServerEvent};
use crate::sessions::SessionRegistry;

/// A bound chat server, ready to [`run`](Server::run)
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: Arc<ServerConfig>,
    store: Arc<dyn CredentialStore>,
    broadcaster: Broadcaster,
    tracker: Arc<ConnectionTracker>,
    limiter: Arc<Semaphore>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Bind the listening socket
    pub async fn bind(config: ServerConfig, store: Arc<dyn CredentialStore>) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let broadcaster = Broadcaster::new(SessionRegistry::new(), EventSender::new());
        let tracker = Arc::new(ConnectionTracker::new(config.max_connections_per_ip));
        let limiter = Arc::new(Semaphore::new(config.max_connections));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            listener,
            local_addr,
            config: Arc::new(config),
            store,
            broadcaster,
            tracker,
            limiter,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Control handle usable while the server runs
    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            local_addr: self.local_addr,
            broadcaster: self.broadcaster.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Accept connections until shutdown is requested
    ///
    /// Each connection is handled on its own task. On shutdown the listener
    /// is closed and every in-flight connection is aborted.
    pub async fn run(self) -> io::Result<()> {
        let Server {
            listener,
            local_addr,
            config,
            store,
            broadcaster,
            tracker,
            limiter,
            shutdown_tx,
        } = self;

        let mut shutdown_rx = shutdown_tx.subscribe();
        let chat_log = config
            .chat_log
            .clone()
            .map(|path| spawn_chat_log(path, broadcaster.events().subscribe()));

        info!(addr = %local_addr, "{}", MSG_LISTENING);

        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                _ = async { let _ = shutdown_rx.wait_for(|stop| *stop).await; } => {
                    info!("{}", MSG_SHUTDOWN_RECEIVED);
                    break;
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        error!(err = %e, "connection task panicked");
                    }
                }

                accepted = listener.accept() => {
                    let (socket, peer_addr) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            error!(err = %e, "{}", ERR_ACCEPT);
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                            continue;
                        }
                    };

                    let Ok(permit) = limiter.clone().try_acquire_owned() else {
                        warn!(peer = %peer_addr, limit = config.max_connections, "{}", ERR_CONNECTION_LIMIT);
                        continue;
                    };
                    let Some(guard) = tracker.try_acquire(peer_addr.ip()) else {
                        debug!(peer = %peer_addr, "{}", ERR_CONNECTION_LIMIT);
                        continue;
                    };

                    let params = ConnectionParams {
                        peer_addr,
                        broadcaster: broadcaster.clone(),
                        store: store.clone(),
                        config: config.clone(),
                    };
                    tasks.spawn(async move {
                        let _permit = permit;
                        let _guard = guard;
                        if let Err(e) = handle_connection(socket, params).await {
                            log_connection_error(&e, peer_addr);
                        }
                    });
                }
            }
        }

        drop(listener);
        tasks.abort_all();
        while tasks.join_next().await.is_some() {}

        let dropped = broadcaster.registry().clear().await;
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "dropped sessions at shutdown");
        }
        if let Some(handle) = chat_log {
            handle.abort();
        }
        Ok(())
    }
}

fn log_connection_error(e: &io::Error, peer_addr: SocketAddr) {
    match e.kind() {
        // Handshake rejections and dropped sockets are routine
        io::ErrorKind::PermissionDenied
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::TimedOut => {
            debug!(peer = %peer_addr, err = %e, "connection closed");
        }
        _ => warn!(peer = %peer_addr, err = %e, "connection ended with error"),
    }
}

/// Admin control over a running server
#[derive(Clone)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    broadcaster: Broadcaster,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The live session registry
    pub fn registry(&self) -> &SessionRegistry {
        self.broadcaster.registry()
    }

    /// Connected users and their presence, in login order
    pub async fn connected_users(&self) -> Vec<(String, Presence)> {
        self.registry()
            .snapshot()
            .await
            .into_iter()
            .map(|s| (s.username, s.presence))
            .collect()
    }

    /// Disconnect a user
    ///
    /// The user is removed from the registry at once; their connection
    /// receives the kick line and then closes, announcing the departure.
    /// Returns `false` if the user is not connected.
    pub async fn kick(&self, username: &str) -> bool {
        let Some(session) = self.registry().lookup(username).await else {
            return false;
        };
        self.registry().remove_session(&session).await;
        session.kick();

        info!(user = %session.username, "user kicked");
        self.broadcaster.publish(ServerEvent::Kicked {
            username: session.username,
        });
        true
    }

    /// Send `SERVER: <text>` to every session
    ///
    /// # Errors
    ///
    /// Text that would not be a valid chat message (empty, too long, or
    /// containing a line break) is refused and nothing is sent.
    pub async fn announce(&self, text: &str) -> Result<(), MessageError> {
        validators::validate_message(text)?;

        let message = ChatMessage::new(SERVER_SENDER, text);
        self.broadcaster
            .broadcast_and_evict(&message.wire_line(), None)
            .await;
        self.broadcaster.publish(ServerEvent::Message(message));
        Ok(())
    }

    /// Stop accepting connections and abort in-flight ones
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Receive server events
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.broadcaster.events().subscribe()
    }
}
