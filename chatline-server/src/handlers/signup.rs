//! SIGNUP handler

use std::io;

use chatline_common::protocol::Reply;
use tokio::io::AsyncWrite;
use tracing::{info, warn};

use super::login::activate_session;
use super::{ActiveSession, HandlerContext};
use crate::credentials::StoreError;

/// Handle `SIGNUP <username> <password>`
///
/// A created account is logged in straight away: `SIGNUP_SUCCESS` is
/// followed by the same steps as a successful login. Taken names are
/// refused before hashing; `create` still decides races between signups.
pub async fn handle_signup<W>(
    username: String,
    password: String,
    ctx: &mut HandlerContext<'_, W>,
) -> io::Result<ActiveSession>
where
    W: AsyncWrite + Unpin,
{
    let created = match ctx.store.exists(&username).await {
        Ok(true) => Err(StoreError::AlreadyExists),
        Ok(false) => ctx.store.create(&username, &password).await,
        Err(e) => Err(e),
    };

    match created {
        Ok(()) => {
            info!(peer = %ctx.peer_addr, user = %username, "account created");
            ctx.send_reply(Reply::SignupSuccess).await?;
            activate_session(username, ctx).await
        }
        Err(StoreError::AlreadyExists) => {
            info!(peer = %ctx.peer_addr, user = %username, "signup rejected: username taken");
            ctx.send_reply_and_disconnect(Reply::UsernameExists).await
        }
        Err(e) => {
            warn!(peer = %ctx.peer_addr, user = %username, err = %e, "signup failed: credential store error");
            ctx.send_reply_and_disconnect(Reply::SignupFailed).await
        }
    }
}
