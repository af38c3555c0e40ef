//! Per-connection dispatch
//!
//! Reads the initial request, classifies it and routes the socket:
//!
//! ```text
//!   not NTRIP agent ───────────────► probe reply, close
//!   empty mountpoint ──────────────► sourcetable, close
//!   unknown mountpoint ────────────► sourcetable, close
//!   SOURCE + good password ────────► ICY 200 OK, source read loop
//!   GET + authorized ──────────────► ICY 200 OK, register client, spawn drain
//!   otherwise ─────────────────────► ERROR - Bad Password, close
//! ```
//!
//! The connection is generic over the byte stream so that a TLS or other
//! wrapped transport can be dispatched the same way as a `TcpStream`.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::catalog::{Catalog, SourceEntry};
use crate::error::{Error, Result};
use crate::protocol::constants::{BAD_PASSWORD, ICY_OK, MOUNTPOINT_IN_USE};
use crate::protocol::{probe_response, sourcetable, ParsedRequest};
use crate::registry::ClientRegistry;
use crate::server::config::ServerConfig;
use crate::session::{ClientConnection, SourceConnection, SourceStats};

/// How a connection was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Peer closed before sending a request
    Empty,
    /// Non-NTRIP peer received the plain greeting
    Probe,
    /// Peer received the sourcetable
    Sourcetable,
    /// Credentials were rejected
    BadPassword,
    /// Source policy refused a second source
    MountpointInUse,
    /// Source session ran to completion
    Source(SourceStats),
    /// Client was registered and its drain task spawned
    Client,
}

/// One accepted connection awaiting classification
pub struct Connection<S> {
    session_id: u64,
    stream: S,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    catalog: Arc<Catalog>,
    registry: Arc<ClientRegistry>,
    cancel: CancellationToken,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        session_id: u64,
        stream: S,
        peer_addr: SocketAddr,
        config: Arc<ServerConfig>,
        catalog: Arc<Catalog>,
        registry: Arc<ClientRegistry>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            stream,
            peer_addr,
            config,
            catalog,
            registry,
            cancel,
        }
    }

    /// Handle the connection.
    ///
    /// For sources this returns when the source disconnects; for clients it
    /// returns as soon as the drain task is spawned.
    pub async fn run(mut self) -> Result<Route> {
        // A header block larger than the buffer, or split across reads, is
        // parsed from whatever the first read returned.
        let mut buf = vec![0u8; self.config.buffer_size];
        let n = match tokio::time::timeout(self.config.request_timeout, self.stream.read(&mut buf))
            .await
        {
            Ok(read) => read?,
            Err(_) => return Err(Error::Timeout("request read")),
        };
        if n == 0 {
            return Ok(Route::Empty);
        }

        let request = ParsedRequest::parse(&buf[..n]);
        tracing::debug!(
            session_id = self.session_id,
            peer = %self.peer_addr,
            mountpoint = %request.mountpoint,
            is_source = request.is_source,
            agent = ?request.agent,
            "Request parsed"
        );

        if !request.is_ntrip() {
            let reply = probe_response(&self.config.greeting);
            self.reply_and_close(reply.as_bytes()).await?;
            return Ok(Route::Probe);
        }

        if request.is_sourcetable_request() {
            self.send_sourcetable().await?;
            return Ok(Route::Sourcetable);
        }

        let catalog = Arc::clone(&self.catalog);
        let Some(entry) = catalog.source(&request.mountpoint) else {
            tracing::debug!(
                peer = %self.peer_addr,
                mountpoint = %request.mountpoint,
                "Unknown mountpoint, sending sourcetable"
            );
            self.send_sourcetable().await?;
            return Ok(Route::Sourcetable);
        };

        if request.is_source {
            self.handle_source(&catalog, entry, &request).await
        } else {
            self.handle_client(&catalog, entry, request).await
        }
    }

    async fn handle_source(
        mut self,
        catalog: &Catalog,
        entry: &SourceEntry,
        request: &ParsedRequest,
    ) -> Result<Route> {
        let mountpoint = entry.mountpoint.as_str();

        if !catalog.authorize_source(entry, request.password.as_deref()) {
            tracing::warn!(peer = %self.peer_addr, mountpoint, "Source rejected: bad password");
            self.reply_and_close(BAD_PASSWORD).await?;
            return Ok(Route::BadPassword);
        }

        let token = self.cancel.child_token();
        let registered = self
            .registry
            .register_source(
                mountpoint,
                self.session_id,
                token.clone(),
                self.config.source_policy,
            )
            .await;
        if let Err(e) = registered {
            tracing::warn!(peer = %self.peer_addr, mountpoint, error = %e, "Source rejected");
            self.reply_and_close(MOUNTPOINT_IN_USE).await?;
            return Ok(Route::MountpointInUse);
        }

        let source = SourceConnection::new(
            self.session_id,
            self.peer_addr,
            mountpoint,
            Arc::clone(&self.registry),
            token,
        )
        .read_timeout(self.config.source_read_timeout)
        .buffer_size(self.config.buffer_size);

        tracing::info!(source = %source, "New source");

        let greeted = self.stream.write_all(ICY_OK).await;
        let result = match greeted {
            Ok(()) => source.run(&mut self.stream).await,
            Err(e) => Err(e.into()),
        };

        self.registry
            .unregister_source(mountpoint, self.session_id)
            .await;
        let _ = self.stream.shutdown().await;

        match result {
            Ok(stats) => {
                tracing::info!(
                    source = %source,
                    chunks = stats.chunks,
                    bytes = stats.bytes,
                    "Source disconnected"
                );
                Ok(Route::Source(stats))
            }
            Err(e) => {
                tracing::info!(source = %source, error = %e, "Source disconnected");
                Err(e)
            }
        }
    }

    async fn handle_client(
        mut self,
        catalog: &Catalog,
        entry: &SourceEntry,
        request: ParsedRequest,
    ) -> Result<Route> {
        let authorized = catalog.authorize_client(
            entry,
            request.username.as_deref(),
            request.password.as_deref(),
        );
        if !authorized {
            tracing::warn!(
                peer = %self.peer_addr,
                mountpoint = %entry.mountpoint,
                username = ?request.username,
                "Client rejected: bad credentials"
            );
            self.reply_and_close(BAD_PASSWORD).await?;
            return Ok(Route::BadPassword);
        }

        self.stream.write_all(ICY_OK).await?;

        let (client, rx) = ClientConnection::new(
            self.session_id,
            self.peer_addr,
            entry.mountpoint.as_str(),
            request.username,
            self.config.queue_policy,
        );
        self.registry.add_client(Arc::clone(&client)).await?;

        let registry = Arc::clone(&self.registry);
        let send_timeout = self.config.client_send_timeout;
        let cancel = self.cancel.child_token();
        let stream = self.stream;

        tokio::spawn(async move {
            let result = Arc::clone(&client)
                .drain(stream, rx, send_timeout, cancel)
                .await;
            registry.remove_client(client.mountpoint(), client.id()).await;

            let error = result.err().map(|e| e.to_string());
            tracing::info!(
                client = %client,
                peer = %client.peer_addr(),
                mountpoint = client.mountpoint(),
                chunks = client.chunks_enqueued(),
                bytes = client.bytes_enqueued(),
                duration_ms = client.duration().as_millis() as u64,
                error = ?error,
                "Client disconnected"
            );
        });

        Ok(Route::Client)
    }

    async fn send_sourcetable(&mut self) -> Result<()> {
        let table = sourcetable::render(self.catalog.sources());
        self.reply_and_close(table.as_bytes()).await
    }

    async fn reply_and_close(&mut self, reply: &[u8]) -> Result<()> {
        self.stream.write_all(reply).await?;
        let _ = self.stream.shutdown().await;
        Ok(())
    }
}
