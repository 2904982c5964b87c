//! Command-line argument parsing

use chatline_common::DEFAULT_PORT;
use chatline_common::protocol::Handshake;
use clap::Parser;

/// Chatline terminal client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Server host name or IP address
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Create the account before logging in
    #[arg(long, default_value = "false")]
    pub signup: bool,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub debug: bool,

    /// Account name
    pub username: String,

    /// Account password
    pub password: String,
}

impl Args {
    /// The handshake these arguments describe
    pub fn handshake(&self) -> Handshake {
        let username = self.username.clone();
        let password = self.password.clone();
        if self.signup {
            Handshake::Signup { username, password }
        } else {
            Handshake::Login { username, password }
        }
    }
}
