//! Shared test utilities for handler tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatline_common::io::{LineReader, LineWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use super::HandlerContext;
use crate::broadcast::Broadcaster;
use crate::config::ServerConfig;
use crate::credentials::{CredentialStore, StoreError};
use crate::db::{UserDb, init_memory_db};
use crate::events::EventSender;
use crate::sessions::{NewSessionParams, Session, SessionRegistry};

/// How long tests wait for a line before failing
const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A store whose backing storage is always down
pub struct FailingStore;

#[async_trait]
impl CredentialStore for FailingStore {
    async fn exists(&self, _username: &str) -> Result<bool, StoreError> {
        Err(StoreError::StorageUnavailable("disk on fire".to_string()))
    }

    async fn create(&self, _username: &str, _password: &str) -> Result<(), StoreError> {
        Err(StoreError::StorageUnavailable("disk on fire".to_string()))
    }

    async fn verify(&self, _username: &str, _password: &str) -> Result<bool, StoreError> {
        Err(StoreError::StorageUnavailable("disk on fire".to_string()))
    }
}

/// Test context that owns all resources needed for handler testing
///
/// The handler writes to the server half of a real loopback socket; the
/// test reads what the client would see through `client_reader`.
pub struct TestContext {
    pub writer: LineWriter<OwnedWriteHalf>,
    pub client_reader: LineReader<OwnedReadHalf>,
    pub peer_addr: SocketAddr,
    pub broadcaster: Broadcaster,
    pub store: Arc<dyn CredentialStore>,
    pub config: ServerConfig,
    _client_writer: OwnedWriteHalf,
    _server_reader: OwnedReadHalf,
}

impl TestContext {
    /// Create a HandlerContext from this TestContext
    pub fn handler_context(&mut self) -> HandlerContext<'_, OwnedWriteHalf> {
        HandlerContext {
            writer: &mut self.writer,
            peer_addr: self.peer_addr,
            broadcaster: &self.broadcaster,
            store: self.store.as_ref(),
            config: &self.config,
        }
    }

    /// Read the next line the client received
    pub async fn read_line(&mut self) -> String {
        self.client_reader
            .read_line_with_timeout(READ_TIMEOUT)
            .await
            .expect("failed to read line")
            .expect("connection closed")
    }

    /// Create an account in the store
    pub async fn add_account(&self, username: &str, password: &str) {
        self.store
            .create(username, password)
            .await
            .expect("failed to create account");
    }

    /// Register a session that is not backed by a connection
    ///
    /// The receiver yields everything broadcast to that session.
    pub async fn register_observer(&self, username: &str) -> (Session, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.outbound_queue);
        let session = self
            .broadcaster
            .registry()
            .register(NewSessionParams {
                username: username.to_string(),
                address: "127.0.0.1:40000".parse().unwrap(),
                sink: tx,
            })
            .await
            .expect("failed to register observer");
        (session, rx)
    }
}

/// Create an in-memory account database with fast password hashing
pub async fn create_test_store() -> Arc<dyn CredentialStore> {
    let pool = init_memory_db()
        .await
        .expect("Failed to create test database");
    Arc::new(UserDb::new(pool).with_fast_hashing(true))
}

/// Test context backed by an in-memory database and default settings
pub async fn create_test_context() -> TestContext {
    let store = create_test_store().await;
    build_test_context(store, ServerConfig::loopback()).await
}

/// Test context using the given store
pub async fn create_test_context_with(store: Arc<dyn CredentialStore>) -> TestContext {
    build_test_context(store, ServerConfig::loopback()).await
}

/// Test context using the given settings
pub async fn create_test_context_with_config(config: ServerConfig) -> TestContext {
    let store = create_test_store().await;
    build_test_context(store, config).await
}

async fn build_test_context(store: Arc<dyn CredentialStore>, config: ServerConfig) -> TestContext {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let client_handle = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
    let (server_stream, peer_addr) = listener.accept().await.unwrap();
    let (server_reader, server_writer) = server_stream.into_split();

    let client = client_handle.await.unwrap();
    let (client_read_half, client_write_half) = client.into_split();

    let broadcaster = Broadcaster::new(SessionRegistry::new(), EventSender::new());

    TestContext {
        writer: LineWriter::new(server_writer),
        client_reader: LineReader::new(client_read_half),
        peer_addr,
        broadcaster,
        store,
        config,
        _client_writer: client_write_half,
        _server_reader: server_reader,
    }
}
