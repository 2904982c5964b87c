//! Chatline client library
//!
//! Connects to a chatline server, performs the handshake and exposes the
//! session as a line sender plus a channel of inbound lines.

mod client;
pub mod constants;
mod error;

pub use client::ChatClient;
pub use error::ClientError;
