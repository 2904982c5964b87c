//! Client errors

use std::fmt;
use std::io;

use chatline_common::io::LineError;
use chatline_common::protocol::Reply;
use chatline_common::validators::MessageError;

/// Errors returned by [`ChatClient`](crate::ChatClient)
#[derive(Debug)]
pub enum ClientError {
    /// Transport failure
    Io(io::Error),
    /// The server refused the handshake
    Rejected(Reply),
    /// The server sent something other than a handshake reply
    UnexpectedReply(String),
    /// The server closed the connection
    Disconnected,
    /// The server did not answer in time
    Timeout,
    /// Outgoing chat text failed validation
    InvalidMessage(MessageError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(e) => write!(f, "I/O error: {}", e),
            ClientError::Rejected(reply) => write!(f, "server rejected handshake: {}", reply),
            ClientError::UnexpectedReply(line) => write!(f, "unexpected reply: {:?}", line),
            ClientError::Disconnected => write!(f, "server closed the connection"),
            ClientError::Timeout => write!(f, "timed out waiting for the server"),
            ClientError::InvalidMessage(e) => write!(f, "invalid message: {}", e),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ClientError {
    fn from(err: io::Error) -> Self {
        ClientError::Io(err)
    }
}

impl From<LineError> for ClientError {
    fn from(err: LineError) -> Self {
        match err {
            LineError::Io(e) => ClientError::Io(e),
            LineError::ConnectionClosed => ClientError::Disconnected,
            LineError::IdleTimeout => ClientError::Timeout,
            other => ClientError::UnexpectedReply(other.to_string()),
        }
    }
}
