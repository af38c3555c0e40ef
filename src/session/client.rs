//! Client (subscriber) connection
//!
//! Each subscriber owns a FIFO queue of chunks and a drain task that
//! writes them to its socket. The fan-out loop only ever enqueues, so a
//! slow or dead subscriber can never stall delivery to its siblings.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

use super::queue::{self, ChunkReceiver, ChunkSender, EnqueueError, QueuePolicy};

/// One subscribed client
#[derive(Debug)]
pub struct ClientConnection {
    id: u64,
    peer_addr: SocketAddr,
    mountpoint: String,
    username: Option<String>,
    queue: ChunkSender,
    closed: AtomicBool,
    closing: CancellationToken,
    chunks_enqueued: AtomicU64,
    bytes_enqueued: AtomicU64,
    connected_at: Instant,
}

impl ClientConnection {
    /// Create a client and the receiving end of its queue.
    ///
    /// The receiver is handed to [`ClientConnection::drain`].
    pub fn new(
        id: u64,
        peer_addr: SocketAddr,
        mountpoint: impl Into<String>,
        username: Option<String>,
        policy: QueuePolicy,
    ) -> (Arc<Self>, ChunkReceiver) {
        let (tx, rx) = queue::channel(policy);
        let client = Self {
            id,
            peer_addr,
            mountpoint: mountpoint.into(),
            username,
            queue: tx,
            closed: AtomicBool::new(false),
            closing: CancellationToken::new(),
            chunks_enqueued: AtomicU64::new(0),
            bytes_enqueued: AtomicU64::new(0),
            connected_at: Instant::now(),
        };
        (Arc::new(client), rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn mountpoint(&self) -> &str {
        &self.mountpoint
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Chunks accepted into the queue so far
    pub fn chunks_enqueued(&self) -> u64 {
        self.chunks_enqueued.load(Ordering::Relaxed)
    }

    /// Bytes accepted into the queue so far
    pub fn bytes_enqueued(&self) -> u64 {
        self.bytes_enqueued.load(Ordering::Relaxed)
    }

    /// Time since the subscription was accepted
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark the client closed and stop its drain task.
    ///
    /// The next fan-out pass evicts it from the registry.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.closing.cancel();
    }

    /// Queue a chunk for delivery without waiting.
    ///
    /// Returns `false` if the client is closed or the chunk was refused, in
    /// which case the client is now marked closed.
    pub fn enqueue(&self, chunk: Bytes) -> bool {
        if self.is_closed() {
            return false;
        }

        let len = chunk.len() as u64;
        match self.queue.try_send(chunk) {
            Ok(()) => {
                self.chunks_enqueued.fetch_add(1, Ordering::Relaxed);
                self.bytes_enqueued.fetch_add(len, Ordering::Relaxed);
                true
            }
            Err(EnqueueError::Overflow) => {
                tracing::warn!(
                    client = %self,
                    mountpoint = %self.mountpoint,
                    "Client backlog limit reached, disconnecting"
                );
                self.close();
                false
            }
            Err(EnqueueError::Closed) => {
                self.close();
                false
            }
        }
    }

    /// Write queued chunks to `stream` until a write fails, the client is
    /// closed, or `cancel` fires.
    ///
    /// Bytes the client sends upstream (e.g. NMEA positions) are read and
    /// discarded. A half-closed read side is not a disconnect: subscribers
    /// may shut down their write half after the request and keep
    /// receiving. The client is marked closed on exit.
    pub async fn drain<S>(
        self: Arc<Self>,
        stream: S,
        mut rx: ChunkReceiver,
        send_timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut upstream = [0u8; 512];
        let mut reading = true;

        let result = loop {
            tokio::select! {
                _ = cancel.cancelled() => break Ok(()),
                _ = self.closing.cancelled() => break Ok(()),
                chunk = rx.recv() => {
                    let Some(chunk) = chunk else { break Ok(()) };
                    // A slow write must still give way to close or cancel
                    tokio::select! {
                        _ = cancel.cancelled() => break Ok(()),
                        _ = self.closing.cancelled() => break Ok(()),
                        written = tokio::time::timeout(send_timeout, writer.write_all(&chunk)) => {
                            match written {
                                Ok(Ok(())) => {}
                                Ok(Err(e)) => break Err(Error::Io(e)),
                                Err(_) => break Err(Error::Timeout("client send")),
                            }
                        }
                    }
                }
                read = reader.read(&mut upstream), if reading => match read {
                    Ok(0) => {
                        tracing::debug!(client = %self, "Client half-closed, still sending");
                        reading = false;
                    }
                    Ok(n) => {
                        tracing::trace!(client = %self, bytes = n, "Discarding upstream data");
                    }
                    Err(e) => break Err(Error::Io(e)),
                },
            }
        };

        self.close();
        rx.close();
        let _ = tokio::time::timeout(send_timeout, writer.shutdown()).await;

        result
    }
}

impl fmt::Display for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Client_{}#{}", self.peer_addr, self.id)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::{IpAddr, Ipv4Addr};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_test::io::Builder;

    use super::*;

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000)
    }

    #[tokio::test]
    async fn test_drain_writes_in_order() {
        let mock = Builder::new()
            .write(b"abc")
            .write(b"def")
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let (client, rx) = ClientConnection::new(1, addr(), "test1", None, QueuePolicy::Unbounded);

        assert!(client.enqueue(Bytes::from_static(b"abc")));
        assert!(client.enqueue(Bytes::from_static(b"def")));
        assert!(client.enqueue(Bytes::from_static(b"ghi")));
        assert_eq!(client.chunks_enqueued(), 3);
        assert_eq!(client.bytes_enqueued(), 9);

        // Read EOF from the mock does not end the drain; the failed third
        // write does
        let result = Arc::clone(&client)
            .drain(mock, rx, Duration::from_secs(1), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_write_error_closes_client() {
        let mock = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let (client, rx) = ClientConnection::new(2, addr(), "test1", None, QueuePolicy::Unbounded);
        client.enqueue(Bytes::from_static(b"abc"));

        let result = Arc::clone(&client)
            .drain(mock, rx, Duration::from_secs(1), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(Error::Io(_))));
        assert!(client.is_closed());
        assert!(!client.enqueue(Bytes::from_static(b"more")));
    }

    #[tokio::test]
    async fn test_send_timeout() {
        // The peer never reads, so the 8-byte pipe fills up
        let (local, _peer) = tokio::io::duplex(8);
        let (client, rx) = ClientConnection::new(3, addr(), "test1", None, QueuePolicy::Unbounded);
        client.enqueue(Bytes::from(vec![0xD3; 64]));

        let result = Arc::clone(&client)
            .drain(local, rx, Duration::from_millis(50), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_cancel_stops_drain() {
        let (local, mut peer) = tokio::io::duplex(1024);
        let (client, rx) = ClientConnection::new(4, addr(), "test1", None, QueuePolicy::Unbounded);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(Arc::clone(&client).drain(
            local,
            rx,
            Duration::from_secs(1),
            cancel.clone(),
        ));

        client.enqueue(Bytes::from_static(b"\xD3\x00\x13"));
        let mut buf = [0u8; 3];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"\xD3\x00\x13");

        cancel.cancel();
        task.await.unwrap().unwrap();
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_peer_close_ends_drain_on_next_write() {
        let (local, peer) = tokio::io::duplex(1024);
        let (client, rx) = ClientConnection::new(5, addr(), "test1", None, QueuePolicy::Unbounded);
        drop(peer);

        let task = tokio::spawn(Arc::clone(&client).drain(
            local,
            rx,
            Duration::from_secs(1),
            CancellationToken::new(),
        ));
        client.enqueue(Bytes::from_static(b"\xD3\x00\x13"));

        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_half_closed_client_keeps_receiving() {
        let (local, mut peer) = tokio::io::duplex(1024);
        let (client, rx) = ClientConnection::new(8, addr(), "test1", None, QueuePolicy::Unbounded);
        let task = tokio::spawn(Arc::clone(&client).drain(
            local,
            rx,
            Duration::from_secs(1),
            CancellationToken::new(),
        ));

        peer.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!client.is_closed());

        assert!(client.enqueue(Bytes::from_static(b"\xD3\x00\x13")));
        let mut buf = [0u8; 3];
        tokio::time::timeout(Duration::from_secs(2), peer.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf, b"\xD3\x00\x13");

        client.close();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_overflow_closes_socket() {
        let (local, mut peer) = tokio::io::duplex(1024);
        let (client, rx) = ClientConnection::new(
            9,
            addr(),
            "test1",
            None,
            QueuePolicy::DisconnectOnOverflow { max_chunks: 1 },
        );

        assert!(client.enqueue(Bytes::from_static(b"a")));
        assert!(!client.enqueue(Bytes::from_static(b"b")));

        let task = tokio::spawn(Arc::clone(&client).drain(
            local,
            rx,
            Duration::from_secs(1),
            CancellationToken::new(),
        ));

        // The peer sees EOF; the backlog may or may not have been flushed
        let mut rest = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), peer.read_to_end(&mut rest))
            .await
            .unwrap()
            .unwrap();
        assert!(rest.is_empty() || rest == b"a");

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_close_interrupts_blocked_write() {
        // The peer never reads, so the 8-byte pipe fills up
        let (local, _peer) = tokio::io::duplex(8);
        let (client, rx) = ClientConnection::new(10, addr(), "test1", None, QueuePolicy::Unbounded);
        client.enqueue(Bytes::from(vec![0xD3; 64]));

        let task = tokio::spawn(Arc::clone(&client).drain(
            local,
            rx,
            Duration::from_secs(30),
            CancellationToken::new(),
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.close();

        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn test_overflow_marks_closed() {
        let (client, _rx) = ClientConnection::new(
            6,
            addr(),
            "test1",
            Some("alice".into()),
            QueuePolicy::DisconnectOnOverflow { max_chunks: 1 },
        );

        assert!(client.enqueue(Bytes::from_static(b"a")));
        assert!(!client.enqueue(Bytes::from_static(b"b")));
        assert!(client.is_closed());
        assert_eq!(client.username(), Some("alice"));
    }

    #[test]
    fn test_display() {
        let (client, _rx) = ClientConnection::new(7, addr(), "test1", None, QueuePolicy::Unbounded);
        assert_eq!(client.to_string(), "Client_127.0.0.1:40000#7");
    }
}
