//! Chat text handler

use std::io;

use chatline_common::validators;
use tokio::io::AsyncWrite;
use tracing::{debug, trace};

use super::HandlerContext;
use crate::events::{ChatMessage, ServerEvent};
use crate::sessions::Session;

/// Broadcast a line of chat text from `session`
///
/// The sender receives its own line unless echo is disabled.
pub async fn handle_chat<W>(
    text: &str,
    session: &Session,
    ctx: &mut HandlerContext<'_, W>,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = validators::validate_message(text) {
        debug!(user = %session.username, err = %e, "dropping chat line");
        return Ok(());
    }

    let message = ChatMessage::new(session.username.clone(), text);
    let exclude = (!ctx.config.echo).then_some(session.username.as_str());
    let report = ctx
        .broadcaster
        .broadcast_and_evict(&message.wire_line(), exclude)
        .await;
    trace!(
        user = %session.username,
        delivered = report.delivered,
        failed = report.failed,
        "chat broadcast"
    );

    ctx.broadcaster.publish(ServerEvent::Message(message));
    Ok(())
}
