//! Relay sessions
//!
//! ```text
//!   [SourceConnection]                 [ClientConnection] --drain--> TCP
//!     read chunk ──► registry.snapshot ──► enqueue ─┤
//!                                      [ClientConnection] --drain--> TCP
//! ```
//!
//! Chunks are `Bytes`, so every client queue shares one allocation per
//! chunk rather than a copy.

pub mod client;
pub mod queue;
pub mod source;

pub use client::ClientConnection;
pub use queue::{ChunkReceiver, ChunkSender, EnqueueError, QueuePolicy};
pub use source::{SourceConnection, SourceStats};
