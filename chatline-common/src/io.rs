//! Line-oriented I/O over async streams
//!
//! Lines are UTF-8 text terminated by `\n`; a `\r` before the terminator is
//! dropped so clients that send `\r\n` work unchanged.

use std::fmt;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::MAX_LINE_LENGTH;

/// Size of each chunk read from the underlying stream
const READ_CHUNK_SIZE: usize = 4096;

// =============================================================================
// Errors
// =============================================================================

/// Errors produced while reading lines
#[derive(Debug)]
pub enum LineError {
    /// Underlying I/O failure
    Io(io::Error),
    /// The peer closed the stream in the middle of a read that required data
    ConnectionClosed,
    /// A line exceeded the maximum length before its terminator arrived
    LineTooLong,
    /// A complete line was not valid UTF-8
    InvalidUtf8,
    /// No complete line arrived within the allowed time
    IdleTimeout,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Io(e) => write!(f, "I/O error: {}", e),
            LineError::ConnectionClosed => write!(f, "connection closed"),
            LineError::LineTooLong => write!(f, "line exceeds the maximum length"),
            LineError::InvalidUtf8 => write!(f, "line is not valid UTF-8"),
            LineError::IdleTimeout => write!(f, "timed out waiting for a line"),
        }
    }
}

impl std::error::Error for LineError {}

impl From<io::Error> for LineError {
    fn from(err: io::Error) -> Self {
        LineError::Io(err)
    }
}

impl From<LineError> for io::Error {
    fn from(err: LineError) -> Self {
        match err {
            LineError::Io(e) => e,
            LineError::ConnectionClosed => {
                io::Error::new(io::ErrorKind::ConnectionReset, "connection closed")
            }
            LineError::IdleTimeout => {
                io::Error::new(io::ErrorKind::TimedOut, "timed out waiting for a line")
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}

// =============================================================================
// Reader
// =============================================================================

/// Reads newline-terminated lines from an async reader
///
/// Buffered bytes live in the reader itself, so dropping a pending
/// `read_line` future (for example when it loses a `tokio::select!`) never
/// loses data.
pub struct LineReader<R> {
    reader: R,
    pending: Vec<u8>,
    eof: bool,
    max_length: usize,
}

impl<R> LineReader<R> {
    /// Create a new line reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            eof: false,
            max_length: MAX_LINE_LENGTH,
        }
    }

    /// Longest line accepted, in bytes (default `MAX_LINE_LENGTH`)
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Change the longest accepted line; applies to lines not yet returned
    pub fn set_max_length(&mut self, max_length: usize) {
        self.max_length = max_length;
    }

    /// Get a mutable reference to the underlying reader
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consume the line reader and return the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Read the next line, without its terminator
    ///
    /// Returns `Ok(None)` once the peer has closed the stream and every
    /// buffered line has been returned. Bytes after the last `\n` are
    /// returned as a final line.
    ///
    /// # Errors
    ///
    /// Returns `LineTooLong` if more than the maximum length arrives
    /// without a terminator, `InvalidUtf8` for undecodable lines, or `Io` on
    /// transport failure.
    pub async fn read_line(&mut self) -> Result<Option<String>, LineError> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if line.len() > self.max_length {
                    return Err(LineError::LineTooLong);
                }
                return decode(line).map(Some);
            }

            if self.pending.len() > self.max_length {
                return Err(LineError::LineTooLong);
            }

            if self.eof {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.pending);
                return decode(line).map(Some);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.pending.extend_from_slice(&chunk[..n]);
            }
        }
    }

    /// Read the next line, failing with `IdleTimeout` if none arrives in time
    pub async fn read_line_with_timeout(
        &mut self,
        line_timeout: Duration,
    ) -> Result<Option<String>, LineError> {
        match timeout(line_timeout, self.read_line()).await {
            Ok(result) => result,
            Err(_) => Err(LineError::IdleTimeout),
        }
    }
}

fn decode(line: Vec<u8>) -> Result<String, LineError> {
    String::from_utf8(line).map_err(|_| LineError::InvalidUtf8)
}

// =============================================================================
// Writer
// =============================================================================

/// Writes newline-terminated lines to an async writer
pub struct LineWriter<W> {
    writer: W,
}

impl<W> LineWriter<W> {
    /// Create a new line writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Get a mutable reference to the underlying writer
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the line writer and return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    /// Write one line followed by `\n` and flush
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the line itself contains a line break.
    pub async fn write_line(&mut self, line: &str) -> io::Result<()> {
        if line.contains(['\n', '\r']) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "line contains a line break",
            ));
        }
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.writer.write_all(&buf).await?;
        self.writer.flush().await
    }

    /// Shut down the write half of the stream
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.writer.shutdown().await
    }
}
