//! Append-only chat log fed from server events

use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::events::ServerEvent;

/// Render an event as a log line, or `None` for events that are not logged
pub fn format_event(event: &ServerEvent) -> Option<String> {
    let stamp = || Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    match event {
        ServerEvent::Message(message) => Some(message.log_line()),
        ServerEvent::Joined { username } => {
            Some(format!("[{}] * {} joined", stamp(), username))
        }
        ServerEvent::Left { username } => Some(format!("[{}] * {} left", stamp(), username)),
        ServerEvent::Kicked { username } => {
            Some(format!("[{}] * {} was kicked", stamp(), username))
        }
        ServerEvent::PresenceChanged { .. } => None,
    }
}

/// Spawn a task that appends events from `events` to the file at `path`
///
/// The file is created if absent and never truncated. Write failures are
/// logged and the task keeps going; it ends when the event channel closes.
pub fn spawn_chat_log(
    path: PathBuf,
    mut events: broadcast::Receiver<ServerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), err = %e, "cannot open chat log");
                return;
            }
        };

        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "chat log fell behind, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let Some(mut line) = format_event(&event) else {
                continue;
            };
            line.push('\n');

            if let Err(e) = file.write_all(line.as_bytes()).await {
                warn!(path = %path.display(), err = %e, "chat log write failed");
                continue;
            }
            if let Err(e) = file.flush().await {
                warn!(path = %path.display(), err = %e, "chat log flush failed");
            }
        }
    })
}
