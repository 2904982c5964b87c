//! A connected, authenticated client

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use chatline_common::protocol::Presence;
use chrono::{DateTime, Utc};
use tokio::sync::{Notify, mpsc};
use tokio::sync::mpsc::error::TrySendError;

/// Parameters for creating a new session
pub struct NewSessionParams {
    pub username: String,
    pub address: SocketAddr,
    pub sink: mpsc::Sender<String>,
}

/// Outcome of a failed enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendFailure {
    /// Consecutive failures including this one
    pub consecutive: u32,
}

/// One live session
///
/// Clones share the same sink, liveness flag and failure counter, so the
/// registry and the connection handler always agree on a session's state.
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique per registration, never reused
    pub id: u32,
    /// Name as typed at login
    pub username: String,
    /// Remote address of the connection
    pub address: SocketAddr,
    /// When the session was registered
    pub login_time: DateTime<Utc>,
    /// Availability; the registry's copy is authoritative
    pub presence: Presence,
    sink: mpsc::Sender<String>,
    closed: Arc<AtomicBool>,
    send_failures: Arc<AtomicU32>,
    kick: Arc<Notify>,
}

impl Session {
    /// Create a new session with the given registry ID
    pub fn new(id: u32, params: NewSessionParams) -> Self {
        Self {
            id,
            username: params.username,
            address: params.address,
            login_time: Utc::now(),
            presence: Presence::default(),
            sink: params.sink,
            closed: Arc::new(AtomicBool::new(false)),
            send_failures: Arc::new(AtomicU32::new(0)),
            kick: Arc::new(Notify::new()),
        }
    }

    /// Whether the session can still receive lines
    pub fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.sink.is_closed()
    }

    /// Enqueue a line without waiting
    ///
    /// A full or closed queue counts as a failure; a successful enqueue
    /// resets the failure count.
    pub fn try_send(&self, line: &str) -> Result<(), SendFailure> {
        match self.sink.try_send(line.to_string()) {
            Ok(()) => {
                self.send_failures.store(0, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                let consecutive = self.send_failures.fetch_add(1, Ordering::Relaxed) + 1;
                Err(SendFailure { consecutive })
            }
        }
    }

    /// Mark the session closed
    ///
    /// Returns `true` only for the first caller, which owns the teardown.
    pub fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }

    /// Ask the session's connection handler to disconnect
    pub fn kick(&self) {
        self.kick.notify_one();
    }

    /// Resolves once [`kick`](Self::kick) has been called
    pub async fn kicked(&self) {
        self.kick.notified().await;
    }
}
