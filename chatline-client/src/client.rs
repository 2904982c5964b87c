//! Connection and handshake

use std::net::SocketAddr;

use chatline_common::io::{LineReader, LineWriter};
use chatline_common::protocol::{Handshake, Presence, Reply};
use chatline_common::validators;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

use crate::constants::{CONNECTION_TIMEOUT, HANDSHAKE_TIMEOUT, INBOUND_CHANNEL_SIZE};
use crate::error::ClientError;

/// An authenticated chat session
///
/// Inbound lines arrive on the receiver returned by [`ChatClient::connect`];
/// the receiver closes when the server ends the connection.
pub struct ChatClient {
    username: String,
    writer: LineWriter<OwnedWriteHalf>,
    reader_task: JoinHandle<()>,
}

impl ChatClient {
    /// Connect to `addr` and perform the handshake
    ///
    /// A `SIGNUP` handshake succeeds once the server has both created the
    /// account and logged it in.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` with the server's reply when the handshake is
    /// refused, or a transport error if the server cannot be reached.
    pub async fn connect(
        addr: SocketAddr,
        handshake: Handshake,
    ) -> Result<(Self, mpsc::Receiver<String>), ClientError> {
        let stream = timeout(CONNECTION_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::Timeout)??;
        let (reader, writer) = stream.into_split();
        let mut reader = LineReader::new(reader);
        let mut writer = LineWriter::new(writer);

        writer.write_line(&handshake.to_line()).await?;

        if matches!(handshake, Handshake::Signup { .. }) {
            expect_reply(&mut reader, Reply::SignupSuccess).await?;
        }
        expect_reply(&mut reader, Reply::LoginSuccess).await?;
        debug!(server = %addr, user = %handshake.username(), "logged in");

        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_SIZE);
        let reader_task = tokio::spawn(forward_lines(reader, tx));

        let client = Self {
            username: handshake.username().to_string(),
            writer,
            reader_task,
        };
        Ok((client, rx))
    }

    /// The name this session logged in as
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Send a line of chat text
    pub async fn send_line(&mut self, text: &str) -> Result<(), ClientError> {
        validators::validate_message(text).map_err(ClientError::InvalidMessage)?;
        self.writer.write_line(text).await?;
        Ok(())
    }

    /// Change this session's presence
    pub async fn set_presence(&mut self, presence: Presence) -> Result<(), ClientError> {
        self.writer.write_line(presence.as_ref()).await?;
        Ok(())
    }

    /// Close the sending side and wait for the server to hang up
    ///
    /// Lines already in flight are still delivered to the inbound receiver.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.writer.shutdown().await?;
        let _ = self.reader_task.await;
        Ok(())
    }
}

/// Read one handshake reply and require it to be `expected`
async fn expect_reply(
    reader: &mut LineReader<OwnedReadHalf>,
    expected: Reply,
) -> Result<(), ClientError> {
    let line = reader
        .read_line_with_timeout(HANDSHAKE_TIMEOUT)
        .await?
        .ok_or(ClientError::Disconnected)?;
    match Reply::parse(&line) {
        Some(reply) if reply == expected => Ok(()),
        Some(reply) => Err(ClientError::Rejected(reply)),
        None => Err(ClientError::UnexpectedReply(line)),
    }
}

/// Forward every inbound line until the server closes or the receiver is dropped
async fn forward_lines(mut reader: LineReader<OwnedReadHalf>, tx: mpsc::Sender<String>) {
    loop {
        match reader.read_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("server closed the connection");
                break;
            }
            Err(e) => {
                debug!(err = %e, "read failed");
                break;
            }
        }
    }
}
