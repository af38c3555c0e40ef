//! Per-client outbound chunk queue
//!
//! The source side only ever calls [`ChunkSender::try_send`], which never
//! waits. What happens when a client falls behind is decided by
//! [`QueuePolicy`].

use bytes::Bytes;
use tokio::sync::mpsc;

/// Backlog policy for a client's outbound queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    /// Queue grows without limit while the client is slow
    Unbounded,
    /// Once `max_chunks` chunks are waiting, the client is disconnected
    DisconnectOnOverflow {
        /// Maximum number of queued chunks
        max_chunks: usize,
    },
}

impl Default for QueuePolicy {
    fn default() -> Self {
        QueuePolicy::DisconnectOnOverflow { max_chunks: 4096 }
    }
}

/// Why a chunk could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// The drain task has gone away
    Closed,
    /// The backlog limit was reached
    Overflow,
}

/// Producer half of a client queue
#[derive(Debug)]
pub enum ChunkSender {
    Unbounded(mpsc::UnboundedSender<Bytes>),
    Bounded(mpsc::Sender<Bytes>),
}

/// Consumer half of a client queue, owned by the drain task
#[derive(Debug)]
pub enum ChunkReceiver {
    Unbounded(mpsc::UnboundedReceiver<Bytes>),
    Bounded(mpsc::Receiver<Bytes>),
}

/// Create a queue according to `policy`
pub fn channel(policy: QueuePolicy) -> (ChunkSender, ChunkReceiver) {
    match policy {
        QueuePolicy::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (ChunkSender::Unbounded(tx), ChunkReceiver::Unbounded(rx))
        }
        QueuePolicy::DisconnectOnOverflow { max_chunks } => {
            let (tx, rx) = mpsc::channel(max_chunks.max(1));
            (ChunkSender::Bounded(tx), ChunkReceiver::Bounded(rx))
        }
    }
}

impl ChunkSender {
    /// Queue a chunk without waiting
    pub fn try_send(&self, chunk: Bytes) -> Result<(), EnqueueError> {
        match self {
            ChunkSender::Unbounded(tx) => tx.send(chunk).map_err(|_| EnqueueError::Closed),
            ChunkSender::Bounded(tx) => tx.try_send(chunk).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => EnqueueError::Overflow,
                mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
            }),
        }
    }
}

impl ChunkReceiver {
    /// Wait for the next chunk; `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Bytes> {
        match self {
            ChunkReceiver::Unbounded(rx) => rx.recv().await,
            ChunkReceiver::Bounded(rx) => rx.recv().await,
        }
    }

    /// Stop accepting chunks; queued ones can still be received
    pub fn close(&mut self) {
        match self {
            ChunkReceiver::Unbounded(rx) => rx.close(),
            ChunkReceiver::Bounded(rx) => rx.close(),
        }
    }
}
