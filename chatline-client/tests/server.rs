//! Client against a real server

use std::sync::Arc;
use std::time::Duration;

use chatline_client::{ChatClient, ClientError};
use chatline_common::protocol::{Handshake, Presence, Reply};
use chatline_server::credentials::MemoryStore;
use chatline_server::{Server, ServerConfig, ServerHandle};
use tokio::sync::mpsc;

async fn start_server() -> ServerHandle {
    let store = Arc::new(MemoryStore::with_accounts([("alice", "pass123")]));
    let server = Server::bind(ServerConfig::loopback(), store).await.unwrap();
    let handle = server.handle();
    tokio::spawn(server.run());
    handle
}

fn login(username: &str, password: &str) -> Handshake {
    Handshake::Login {
        username: username.to_string(),
        password: password.to_string(),
    }
}

async fn recv(rx: &mut mpsc::Receiver<String>) -> Option<String> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_signup_chat_and_presence() {
    let handle = start_server().await;
    let addr = handle.local_addr();

    let (mut alice, mut alice_rx) = ChatClient::connect(addr, login("alice", "pass123"))
        .await
        .unwrap();

    let signup = Handshake::Signup {
        username: "bob".to_string(),
        password: "hunter2".to_string(),
    };
    let (mut bob, mut bob_rx) = ChatClient::connect(addr, signup).await.unwrap();
    assert_eq!(
        recv(&mut alice_rx).await.as_deref(),
        Some("bob has joined the chat room")
    );

    bob.set_presence(Presence::Busy).await.unwrap();
    bob.send_line("hi alice").await.unwrap();
    assert_eq!(recv(&mut alice_rx).await.as_deref(), Some("bob: hi alice"));
    assert_eq!(recv(&mut bob_rx).await.as_deref(), Some("bob: hi alice"));

    let users = handle.connected_users().await;
    assert!(users.contains(&("bob".to_string(), Presence::Busy)));

    bob.close().await.unwrap();
    assert_eq!(
        recv(&mut alice_rx).await.as_deref(),
        Some("bob has left the chat room")
    );

    alice.send_line("bye").await.unwrap();
    assert_eq!(recv(&mut alice_rx).await.as_deref(), Some("alice: bye"));

    handle.shutdown();
    assert_eq!(recv(&mut alice_rx).await, None);
}

#[tokio::test]
async fn test_rejections() {
    let handle = start_server().await;
    let addr = handle.local_addr();

    let result = ChatClient::connect(addr, login("alice", "wrong")).await;
    assert!(matches!(
        result,
        Err(ClientError::Rejected(Reply::LoginFailed))
    ));

    let _alice = ChatClient::connect(addr, login("alice", "pass123"))
        .await
        .unwrap();
    let result = ChatClient::connect(addr, login("alice", "pass123")).await;
    assert!(matches!(
        result,
        Err(ClientError::Rejected(Reply::AlreadyConnected))
    ));

    let signup = Handshake::Signup {
        username: "ALICE".to_string(),
        password: "other".to_string(),
    };
    let result = ChatClient::connect(addr, signup).await;
    assert!(matches!(
        result,
        Err(ClientError::Rejected(Reply::UsernameExists))
    ));

    handle.shutdown();
}
