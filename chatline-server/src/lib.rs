//! Chatline Server Library
//!
//! A line-oriented TCP chat server: clients authenticate with
//! `LOGIN`/`SIGNUP`, then exchange chat lines and presence commands that
//! are fanned out to every connected session.

pub mod broadcast;
pub mod chat_log;
pub mod config;
pub mod connection;
pub mod connection_tracker;
pub mod constants;
pub mod credentials;
pub mod db;
pub mod events;
pub mod handlers;
pub mod server;
pub mod sessions;

pub use config::ServerConfig;
pub use server::{Server, ServerHandle};
