//! Chatline terminal client
//!
//! Sends each stdin line to the server and prints every line it receives.

mod args;

use std::net::SocketAddr;

use chatline_client::ChatClient;
use chatline_common::protocol::ChatInput;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::lookup_host;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

use args::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.debug);

    let addr = match resolve(&args.host, args.port).await {
        Ok(addr) => addr,
        Err(e) => {
            error!(host = %args.host, err = %e, "could not resolve server address");
            std::process::exit(1);
        }
    };

    let (mut client, mut inbound) = match ChatClient::connect(addr, args.handshake()).await {
        Ok(connected) => connected,
        Err(e) => {
            error!(server = %addr, err = %e, "connection failed");
            std::process::exit(1);
        }
    };
    debug!(server = %addr, user = %client.username(), "connected");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = inbound.recv() => match line {
                Some(line) => println!("{}", line),
                None => {
                    eprintln!("Disconnected.");
                    return;
                }
            },
            input = stdin.next_line() => match input {
                Ok(Some(input)) => {
                    let result = match ChatInput::classify(&input) {
                        ChatInput::Presence(presence) => client.set_presence(presence).await,
                        ChatInput::Text(text) => client.send_line(text).await,
                        ChatInput::Blank => Ok(()),
                    };
                    if let Err(e) = result {
                        warn!(err = %e, "send failed");
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    error!(err = %e, "failed to read stdin");
                    break;
                }
            },
        }
    }

    // Keep printing until the server hangs up so closing never stalls the reader
    let closing = tokio::spawn(client.close());
    while let Some(line) = inbound.recv().await {
        println!("{}", line);
    }
    if let Ok(Err(e)) = closing.await {
        warn!(err = %e, "close failed");
    }
}

/// Logs go to stderr so stdout carries only chat lines
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn resolve(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    lookup_host((host, port)).await?.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found")
    })
}
