//! Source (publisher) connection
//!
//! A source reads chunks from its socket and fans each one out to the
//! clients registered under its mountpoint at that instant. Enqueueing
//! never blocks on a client, and closed clients are evicted as they are
//! encountered.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::protocol::constants::DEFAULT_BUFFER_SIZE;
use crate::registry::ClientRegistry;

/// Counters for one source session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Chunks read from the source
    pub chunks: u64,
    /// Bytes read from the source
    pub bytes: u64,
    /// Client enqueues across all chunks
    pub deliveries: u64,
    /// Clients evicted by this source's fan-out passes
    pub evictions: u64,
}

/// One registered source
pub struct SourceConnection {
    id: u64,
    peer_addr: SocketAddr,
    mountpoint: String,
    registry: Arc<ClientRegistry>,
    read_timeout: Duration,
    buffer_size: usize,
    cancel: CancellationToken,
}

impl SourceConnection {
    /// Create a source connection feeding `mountpoint`
    pub fn new(
        id: u64,
        peer_addr: SocketAddr,
        mountpoint: impl Into<String>,
        registry: Arc<ClientRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            peer_addr,
            mountpoint: mountpoint.into(),
            registry,
            read_timeout: Duration::from_secs(10),
            buffer_size: DEFAULT_BUFFER_SIZE,
            cancel,
        }
    }

    /// Set how long a read may wait before the source is considered dead
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the maximum chunk size
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mountpoint(&self) -> &str {
        &self.mountpoint
    }

    /// Read and fan out chunks until the source disconnects, goes silent
    /// for longer than the read timeout, or the session is cancelled.
    ///
    /// A clean close by the peer or cancellation returns the session
    /// counters; transport errors and timeouts are returned as errors.
    pub async fn run<S>(&self, stream: &mut S) -> Result<SourceStats>
    where
        S: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; self.buffer_size];
        let mut stats = SourceStats::default();

        loop {
            let read = tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!(source = %self, "Source cancelled");
                    return Ok(stats);
                }
                read = tokio::time::timeout(self.read_timeout, stream.read(&mut buf)) => read,
            };

            let n = match read {
                Err(_) => return Err(Error::Timeout("source read")),
                Ok(Err(e)) => return Err(Error::Io(e)),
                Ok(Ok(0)) => return Ok(stats),
                Ok(Ok(n)) => n,
            };

            let (delivered, evicted) = self.relay(Bytes::copy_from_slice(&buf[..n])).await;
            stats.chunks += 1;
            stats.bytes += n as u64;
            stats.deliveries += delivered as u64;
            stats.evictions += evicted as u64;
        }
    }

    /// Fan one chunk out to the current membership of this mountpoint.
    ///
    /// Returns the number of clients the chunk was queued for and the
    /// number of clients evicted.
    pub async fn relay(&self, chunk: Bytes) -> (usize, usize) {
        let clients = self.registry.snapshot(&self.mountpoint).await;
        let mut delivered = 0;
        let mut evicted = 0;

        for client in clients.iter() {
            if !client.is_closed() && client.enqueue(chunk.clone()) {
                delivered += 1;
            } else if self
                .registry
                .remove_client(&self.mountpoint, client.id())
                .await
            {
                evicted += 1;
            }
        }

        (delivered, evicted)
    }
}

impl fmt::Display for SourceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Server_{}/{}#{}", self.peer_addr, self.mountpoint, self.id)
    }
}
