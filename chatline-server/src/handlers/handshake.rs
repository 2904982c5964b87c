//! First-line handshake dispatch

use std::io;

use chatline_common::protocol::{Handshake, Reply};
use tokio::io::AsyncWrite;
use tracing::debug;

use super::{ActiveSession, HandlerContext, handle_login, handle_signup};

/// Handle the handshake line of a new connection
///
/// On success the session is registered and announced. Every rejection has
/// already been replied to when this returns `Err`.
pub async fn handle_handshake<W>(
    line: &str,
    ctx: &mut HandlerContext<'_, W>,
) -> io::Result<ActiveSession>
where
    W: AsyncWrite + Unpin,
{
    let handshake = match Handshake::parse(line) {
        Ok(handshake) => handshake,
        Err(e) => {
            debug!(peer = %ctx.peer_addr, err = %e, "malformed handshake");
            return ctx.send_reply_and_disconnect(Reply::InvalidCommand).await;
        }
    };

    match handshake {
        Handshake::Login { username, password } => handle_login(username, password, ctx).await,
        Handshake::Signup { username, password } => handle_signup(username, password, ctx).await,
    }
}
