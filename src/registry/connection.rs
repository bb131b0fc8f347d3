//! Registered consumer connection

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::{Error, Result};

/// Unique identifier for a registered connection
///
/// Assigned by the registry; two sockets from the same peer address still
/// get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type-erased socket write half
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One consumer socket with its write buffer
pub struct Connection {
    id: ConnectionId,
    peer_addr: Option<SocketAddr>,
    writer: BufWriter<BoxedWriter>,
    connected_at: Instant,
    bytes_sent: u64,
}

impl Connection {
    pub(super) fn new(
        id: ConnectionId,
        peer_addr: Option<SocketAddr>,
        writer: BoxedWriter,
        buffer_size: usize,
    ) -> Self {
        Self {
            id,
            peer_addr,
            writer: BufWriter::with_capacity(buffer_size, writer),
            connected_at: Instant::now(),
            bytes_sent: 0,
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// How long the connection has been registered
    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Write `data` and flush it to the socket
    ///
    /// Any failure, including a short write, leaves the connection unusable.
    pub(super) async fn send(&mut self, data: &[u8], timeout: Option<Duration>) -> Result<()> {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.write_and_flush(data)).await {
                Ok(result) => result?,
                Err(_) => return Err(Error::WriteTimeout),
            },
            None => self.write_and_flush(data).await?,
        }

        self.bytes_sent += data.len() as u64;
        Ok(())
    }

    async fn write_and_flush(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data).await?;
        self.writer.flush().await
    }

    /// Close the socket
    ///
    /// Buffered bytes are discarded; a dead peer would never drain them.
    pub(super) fn close(self) {
        tracing::debug!(
            connection_id = %self.id,
            peer = ?self.peer_addr,
            bytes_sent = self.bytes_sent,
            uptime_ms = self.uptime().as_millis() as u64,
            "Connection closed"
        );
    }
}
