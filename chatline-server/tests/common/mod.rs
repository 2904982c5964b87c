//! Shared helpers for integration tests

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chatline_common::io::{LineError, LineReader, LineWriter};
use chatline_server::credentials::{CredentialStore, MemoryStore};
use chatline_server::{Server, ServerConfig, ServerHandle};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;

/// How long a test waits for an expected line
pub const LINE_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a test waits to be sure nothing arrives
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// A running server on a loopback port
pub struct TestServer {
    pub handle: ServerHandle,
    pub addr: SocketAddr,
    pub task: JoinHandle<io::Result<()>>,
}

impl TestServer {
    /// Stop the server and wait for the accept loop to finish
    pub async fn stop(self) {
        self.handle.shutdown();
        tokio::time::timeout(LINE_TIMEOUT, self.task)
            .await
            .expect("server did not stop")
            .expect("server task panicked")
            .expect("server returned an error");
    }
}

/// Store with `alice`, `bob` and `carol`, all using password `pass123`
pub fn test_store() -> Arc<dyn CredentialStore> {
    Arc::new(MemoryStore::with_accounts([
        ("alice", "pass123"),
        ("bob", "pass123"),
        ("carol", "pass123"),
    ]))
}

/// Start a server with default settings and the test accounts
pub async fn start_server() -> TestServer {
    start_server_with(ServerConfig::loopback(), test_store()).await
}

/// Start a server with custom settings and store
pub async fn start_server_with(config: ServerConfig, store: Arc<dyn CredentialStore>) -> TestServer {
    let server = Server::bind(config, store)
        .await
        .expect("failed to bind test server");
    let handle = server.handle();
    let addr = server.local_addr();
    let task = tokio::spawn(server.run());
    TestServer { handle, addr, task }
}

/// One client connection speaking the line protocol
pub struct TestClient {
    reader: LineReader<OwnedReadHalf>,
    writer: LineWriter<OwnedWriteHalf>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("failed to connect");
        let (reader, writer) = stream.into_split();
        Self {
            reader: LineReader::new(reader),
            writer: LineWriter::new(writer),
        }
    }

    /// Connect and log in, consuming the `LOGIN_SUCCESS` reply
    pub async fn login(addr: SocketAddr, username: &str, password: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client
            .send(&format!("LOGIN {} {}", username, password))
            .await;
        assert_eq!(client.recv().await, "LOGIN_SUCCESS");
        client
    }

    pub async fn send(&mut self, line: &str) {
        self.writer.write_line(line).await.expect("failed to send");
    }

    /// Send raw bytes, bypassing line checks
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        use tokio::io::AsyncWriteExt;
        let stream = self.writer.get_mut();
        stream.write_all(bytes).await.expect("failed to send");
        stream.flush().await.expect("failed to flush");
    }

    /// Next line, failing the test if none arrives in time
    pub async fn recv(&mut self) -> String {
        match self.reader.read_line_with_timeout(LINE_TIMEOUT).await {
            Ok(Some(line)) => line,
            Ok(None) => panic!("connection closed while waiting for a line"),
            Err(e) => panic!("failed to read line: {}", e),
        }
    }

    /// Assert nothing arrives for a short while
    pub async fn expect_silence(&mut self) {
        match self.reader.read_line_with_timeout(QUIET_PERIOD).await {
            Err(LineError::IdleTimeout) => {}
            other => panic!("expected no line, got {:?}", other),
        }
    }

    /// Assert the server closes the connection, skipping any lines before it
    pub async fn expect_closed(&mut self) {
        loop {
            match self.reader.read_line_with_timeout(LINE_TIMEOUT).await {
                Ok(None) | Err(LineError::Io(_)) => return,
                Ok(Some(_)) => continue,
                Err(e) => panic!("expected connection to close, got {}", e),
            }
        }
    }
}

/// Poll `check` until it returns true or the line timeout elapses
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + LINE_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}
