//! LOGIN handler and session activation

use std::io;

use chatline_common::protocol::Reply;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{ActiveSession, HandlerContext};
use crate::events::ServerEvent;
use crate::sessions::{NewSessionParams, RegisterError};

/// Handle `LOGIN <username> <password>`
pub async fn handle_login<W>(
    username: String,
    password: String,
    ctx: &mut HandlerContext<'_, W>,
) -> io::Result<ActiveSession>
where
    W: AsyncWrite + Unpin,
{
    match ctx.store.verify(&username, &password).await {
        Ok(true) => activate_session(username, ctx).await,
        Ok(false) => {
            info!(peer = %ctx.peer_addr, user = %username, "login failed: invalid credentials");
            ctx.send_reply_and_disconnect(Reply::LoginFailed).await
        }
        Err(e) => {
            warn!(peer = %ctx.peer_addr, user = %username, err = %e, "login failed: credential store error");
            ctx.send_reply_and_disconnect(Reply::LoginFailed).await
        }
    }
}

/// Register an authenticated user, confirm the login and announce the join
pub(super) async fn activate_session<W>(
    username: String,
    ctx: &mut HandlerContext<'_, W>,
) -> io::Result<ActiveSession>
where
    W: AsyncWrite + Unpin,
{
    let (tx, outbound) = mpsc::channel(ctx.config.outbound_queue.max(1));
    let params = NewSessionParams {
        username,
        address: ctx.peer_addr,
        sink: tx,
    };

    let session = match ctx.registry().register(params).await {
        Ok(session) => session,
        Err(RegisterError::AlreadyConnected) => {
            info!(peer = %ctx.peer_addr, "login rejected: user already connected");
            return ctx.send_reply_and_disconnect(Reply::AlreadyConnected).await;
        }
        Err(RegisterError::InvalidUsername(e)) => {
            info!(peer = %ctx.peer_addr, err = %e, "login rejected: invalid username");
            return ctx.send_reply_and_disconnect(Reply::InvalidCommand).await;
        }
    };

    // Nobody has been told about the join yet, so a failed confirmation
    // just withdraws the registration.
    if let Err(e) = ctx.send_reply(Reply::LoginSuccess).await {
        session.mark_closed();
        ctx.registry().remove_session(&session).await;
        return Err(e);
    }

    info!(peer = %ctx.peer_addr, user = %session.username, id = session.id, "user joined");

    let notice = ctx.config.notice_style.joined(&session.username);
    ctx.broadcaster
        .broadcast_and_evict(&notice, Some(&session.username))
        .await;
    ctx.broadcaster.publish(ServerEvent::Joined {
        username: session.username.clone(),
    });

    Ok(ActiveSession { session, outbound })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chatline_common::protocol::Presence;

    use super::*;
    use crate::handlers::testing::{FailingStore, create_test_context, create_test_context_with};

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut test_ctx = create_test_context().await;
        test_ctx.add_account("alice", "pass123").await;

        let result = handle_login(
            "alice".to_string(),
            "wrongpass".to_string(),
            &mut test_ctx.handler_context(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(test_ctx.read_line().await, "LOGIN_FAILED");
        assert!(test_ctx.broadcaster.registry().lookup("alice").await.is_none());
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let mut test_ctx = create_test_context().await;

        let result = handle_login(
            "ghost".to_string(),
            "pass123".to_string(),
            &mut test_ctx.handler_context(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(test_ctx.read_line().await, "LOGIN_FAILED");
    }

    #[tokio::test]
    async fn test_login_success_registers_and_announces() {
        let mut test_ctx = create_test_context().await;
        test_ctx.add_account("alice", "pass123").await;
        let (_bob, mut bob_rx) = test_ctx.register_observer("bob").await;
        let mut events = test_ctx.broadcaster.events().subscribe();

        let mut active = handle_login(
            "alice".to_string(),
            "pass123".to_string(),
            &mut test_ctx.handler_context(),
        )
        .await
        .unwrap();

        assert_eq!(test_ctx.read_line().await, "LOGIN_SUCCESS");
        let session = test_ctx.broadcaster.registry().lookup("alice").await.unwrap();
        assert_eq!(session.id, active.session.id);
        assert_eq!(session.presence, Presence::Available);

        assert_eq!(
            bob_rx.recv().await.as_deref(),
            Some("alice has joined the chat room")
        );
        // The joiner is not told about its own arrival
        assert!(active.outbound.try_recv().is_err());
        assert_eq!(
            events.recv().await.unwrap(),
            ServerEvent::Joined {
                username: "alice".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_login_keeps_typed_spelling() {
        let mut test_ctx = create_test_context().await;
        test_ctx.add_account("alice", "pass123").await;

        let active = handle_login(
            "Alice".to_string(),
            "pass123".to_string(),
            &mut test_ctx.handler_context(),
        )
        .await
        .unwrap();
        assert_eq!(active.session.username, "Alice");
    }

    #[tokio::test]
    async fn test_login_already_connected() {
        let mut test_ctx = create_test_context().await;
        test_ctx.add_account("alice", "pass123").await;
        let (existing, _rx) = test_ctx.register_observer("alice").await;

        let result = handle_login(
            "ALICE".to_string(),
            "pass123".to_string(),
            &mut test_ctx.handler_context(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(test_ctx.read_line().await, "ALREADY_CONNECTED");
        let current = test_ctx.broadcaster.registry().lookup("alice").await.unwrap();
        assert_eq!(current.id, existing.id);
    }

    #[tokio::test]
    async fn test_login_store_failure() {
        let mut test_ctx = create_test_context_with(Arc::new(FailingStore)).await;

        let result = handle_login(
            "alice".to_string(),
            "pass123".to_string(),
            &mut test_ctx.handler_context(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(test_ctx.read_line().await, "LOGIN_FAILED");
    }
}
