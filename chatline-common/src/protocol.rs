//! Line protocol definitions
//!
//! Every message is one line of UTF-8 text terminated by `\n`.
//!
//! Handshake (client → server, first line):
//! - `LOGIN <username> <password>`
//! - `SIGNUP <username> <password>`
//!
//! Handshake replies (server → client): see [`Reply`].
//!
//! After a successful handshake the client sends either a presence token
//! (`busy` / `available`, case-insensitive) or a line of chat text, and the
//! server sends chat lines (`<username>: <text>`) and join/leave notices.

use std::fmt;

use strum::{AsRefStr, Display, EnumString};

use crate::validators::{self, PasswordError, UsernameError};

/// Sender name used for server announcements
pub const SERVER_SENDER: &str = "SERVER";

/// Line sent to a session right before it is kicked
pub const KICKED_LINE: &str = "You have been kicked from the chat room.";

// =============================================================================
// Handshake
// =============================================================================

/// The first line a client sends after connecting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handshake {
    /// Authenticate an existing account
    Login { username: String, password: String },
    /// Create an account, then authenticate with it
    Signup { username: String, password: String },
}

/// Error returned when a handshake line cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    /// The line was empty or whitespace only
    Empty,
    /// The first word is neither `LOGIN` nor `SIGNUP`
    UnknownCommand,
    /// The line did not have exactly three fields
    WrongArity,
    /// The username failed validation
    InvalidUsername(UsernameError),
    /// The password failed validation
    InvalidPassword(PasswordError),
}

impl fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeError::Empty => write!(f, "empty handshake line"),
            HandshakeError::UnknownCommand => write!(f, "unknown handshake command"),
            HandshakeError::WrongArity => write!(f, "handshake requires exactly three fields"),
            HandshakeError::InvalidUsername(e) => write!(f, "invalid username: {}", e),
            HandshakeError::InvalidPassword(e) => write!(f, "invalid password: {}", e),
        }
    }
}

impl std::error::Error for HandshakeError {}

impl Handshake {
    /// Parse a handshake line
    ///
    /// The command word is case-insensitive; fields are separated by runs of
    /// whitespace and exactly three fields are required.
    ///
    /// # Errors
    ///
    /// Returns a `HandshakeError` describing why the line was rejected.
    pub fn parse(line: &str) -> Result<Self, HandshakeError> {
        let mut fields = line.split_whitespace();
        let Some(command) = fields.next() else {
            return Err(HandshakeError::Empty);
        };

        let is_signup = if command.eq_ignore_ascii_case("LOGIN") {
            false
        } else if command.eq_ignore_ascii_case("SIGNUP") {
            true
        } else {
            return Err(HandshakeError::UnknownCommand);
        };

        let (Some(username), Some(password), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(HandshakeError::WrongArity);
        };

        validators::validate_username(username).map_err(HandshakeError::InvalidUsername)?;
        validators::validate_password(password).map_err(HandshakeError::InvalidPassword)?;

        let username = username.to_string();
        let password = password.to_string();
        Ok(if is_signup {
            Handshake::Signup { username, password }
        } else {
            Handshake::Login { username, password }
        })
    }

    /// The username this handshake is for
    pub fn username(&self) -> &str {
        match self {
            Handshake::Login { username, .. } | Handshake::Signup { username, .. } => username,
        }
    }

    /// Render the handshake as a wire line (without the trailing newline)
    pub fn to_line(&self) -> String {
        match self {
            Handshake::Login { username, password } => format!("LOGIN {} {}", username, password),
            Handshake::Signup { username, password } => {
                format!("SIGNUP {} {}", username, password)
            }
        }
    }
}

// =============================================================================
// Replies
// =============================================================================

/// Server replies sent during the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Reply {
    /// Credentials accepted, session is active
    LoginSuccess,
    /// Credentials rejected (or the store could not be consulted)
    LoginFailed,
    /// Account created
    SignupSuccess,
    /// Account could not be created
    SignupFailed,
    /// Signup for a username that is already taken
    UsernameExists,
    /// Malformed handshake line
    InvalidCommand,
    /// The username already has a live session
    AlreadyConnected,
}

impl Reply {
    /// Parse a reply token, returning `None` for any other line
    pub fn parse(line: &str) -> Option<Self> {
        line.trim().parse().ok()
    }

    /// Whether this reply ends the handshake successfully
    pub fn is_success(self) -> bool {
        matches!(self, Reply::LoginSuccess)
    }
}

// =============================================================================
// Presence and chat input
// =============================================================================

/// A session's availability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Presence {
    #[default]
    Available,
    Busy,
}

/// Classification of a line received from an active session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatInput<'a> {
    /// A presence change command (`busy` / `available`)
    Presence(Presence),
    /// Chat text to broadcast
    Text(&'a str),
    /// A blank line, ignored
    Blank,
}

impl<'a> ChatInput<'a> {
    /// Classify an inbound line
    pub fn classify(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ChatInput::Blank;
        }
        match trimmed.parse::<Presence>() {
            Ok(presence) => ChatInput::Presence(presence),
            Err(_) => ChatInput::Text(line),
        }
    }
}

/// Render a chat line as seen by recipients
pub fn chat_line(sender: &str, body: &str) -> String {
    format!("{}: {}", sender, body)
}

// =============================================================================
// Notices
// =============================================================================

/// How join/leave notices are rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoticeStyle {
    /// `<user> has joined the chat room` / `<user> has left the chat room`
    #[default]
    Text,
    /// `USER_JOINED <user>` / `USER_LEFT <user>`
    Structured,
}

impl NoticeStyle {
    /// Notice broadcast when a user joins
    pub fn joined(self, username: &str) -> String {
        match self {
            NoticeStyle::Text => format!("{} has joined the chat room", username),
            NoticeStyle::Structured => format!("USER_JOINED {}", username),
        }
    }

    /// Notice broadcast when a user leaves
    pub fn left(self, username: &str) -> String {
        match self {
            NoticeStyle::Text => format!("{} has left the chat room", username),
            NoticeStyle::Structured => format!("USER_LEFT {}", username),
        }
    }
}
