//! Presence command handler

use std::io;

use chatline_common::protocol::Presence;
use tokio::io::AsyncWrite;
use tracing::debug;

use super::HandlerContext;
use crate::events::ServerEvent;
use crate::sessions::Session;

/// Apply a `busy` / `available` command to the sender's own session
///
/// Nothing is broadcast to other sessions.
pub async fn handle_presence<W>(
    presence: Presence,
    session: &Session,
    ctx: &mut HandlerContext<'_, W>,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if !ctx.registry().set_presence_for(session, presence).await {
        debug!(user = %session.username, "presence change for replaced session");
        return Ok(());
    }

    debug!(user = %session.username, %presence, "presence changed");
    ctx.broadcaster.publish(ServerEvent::PresenceChanged {
        username: session.username.clone(),
        presence,
    });
    Ok(())
}
