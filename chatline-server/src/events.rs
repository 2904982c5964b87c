//! Server events for observers such as the chat log or an admin console

use chatline_common::protocol::{Presence, chat_line};
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::broadcast;

use crate::constants::EVENT_CHANNEL_CAPACITY;

/// A chat line as it passed through the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Stamp a new message with the current time
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            timestamp: Utc::now(),
        }
    }

    /// `<sender>: <body>`, as delivered to clients
    pub fn wire_line(&self) -> String {
        chat_line(&self.sender, &self.body)
    }

    /// `[<RFC 3339 timestamp>] <sender>: <body>`
    pub fn log_line(&self) -> String {
        format!(
            "[{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.wire_line()
        )
    }
}

/// Something that happened in the chat room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Joined { username: String },
    Left { username: String },
    Message(ChatMessage),
    PresenceChanged { username: String, presence: Presence },
    Kicked { username: String },
}

/// Publisher side of the event channel
///
/// Publishing never blocks and succeeds with no subscribers; a subscriber
/// that falls behind loses the oldest events.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: broadcast::Sender<ServerEvent>,
}

impl EventSender {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: ServerEvent) {
        // Err only means nobody is listening
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_message_lines() {
        let message = ChatMessage {
            sender: "alice".to_string(),
            body: "hello".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        };
        assert_eq!(message.wire_line(), "alice: hello");
        assert_eq!(message.log_line(), "[2024-05-01T12:30:00Z] alice: hello");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let events = EventSender::new();
        events.publish(ServerEvent::Joined {
            username: "alice".to_string(),
        });

        let mut rx = events.subscribe();
        events.publish(ServerEvent::Left {
            username: "alice".to_string(),
        });
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerEvent::Left {
                username: "alice".to_string()
            }
        );
    }
}
