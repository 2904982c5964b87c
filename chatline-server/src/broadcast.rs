//! Fan-out of lines to every live session

use chatline_common::validators::username_key;
use tracing::{debug, warn};

use crate::constants::MAX_SEND_FAILURES;
use crate::events::{EventSender, ServerEvent};
use crate::sessions::{Session, SessionRegistry};

/// Result of one broadcast
#[derive(Debug, Default)]
pub struct BroadcastReport {
    /// Sessions the line was queued for
    pub delivered: usize,
    /// Sessions whose queue rejected the line
    pub failed: usize,
    /// Sessions that have now failed too many times in a row
    pub evict: Vec<Session>,
}

/// Delivers lines to the sessions in a registry
///
/// Each session has its own bounded queue drained by its connection
/// handler, so a broadcast never waits on a socket and never holds the
/// registry lock while delivering.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    registry: SessionRegistry,
    events: EventSender,
}

impl Broadcaster {
    pub fn new(registry: SessionRegistry, events: EventSender) -> Self {
        Self { registry, events }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn events(&self) -> &EventSender {
        &self.events
    }

    /// Publish an event to observers
    pub fn publish(&self, event: ServerEvent) {
        self.events.publish(event);
    }

    /// Queue `line` for every live session except `exclude` (case-insensitive)
    ///
    /// Failures are counted in the report and never abort delivery to the
    /// remaining sessions.
    pub async fn broadcast(&self, line: &str, exclude: Option<&str>) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let exclude = exclude.map(username_key);

        for session in self.registry.snapshot().await {
            if exclude.as_deref() == Some(username_key(&session.username).as_str()) {
                continue;
            }
            match session.try_send(line) {
                Ok(()) => report.delivered += 1,
                Err(failure) => {
                    report.failed += 1;
                    debug!(
                        user = %session.username,
                        consecutive = failure.consecutive,
                        "outbound queue rejected line"
                    );
                    if failure.consecutive >= MAX_SEND_FAILURES {
                        report.evict.push(session);
                    }
                }
            }
        }

        report
    }

    /// Forcibly remove sessions that kept failing
    ///
    /// Each one is dropped from the registry and its handler is told to
    /// disconnect; the handler's own teardown sends the leave notice.
    pub async fn evict(&self, sessions: &[Session]) {
        for session in sessions {
            if self.registry.remove_session(session).await {
                warn!(
                    user = %session.username,
                    peer = %session.address,
                    "removing session that stopped draining its queue"
                );
            }
            session.kick();
        }
    }

    /// Broadcast, then evict any session that crossed the failure limit
    pub async fn broadcast_and_evict(&self, line: &str, exclude: Option<&str>) -> BroadcastReport {
        let report = self.broadcast(line, exclude).await;
        if !report.evict.is_empty() {
            self.evict(&report.evict).await;
        }
        report
    }
}
