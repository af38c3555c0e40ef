//! NTRIP caster listener
//!
//! Handles the TCP accept loop and spawns one task per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::catalog::Catalog;
use crate::config::CasterConfig;
use crate::error::Result;
use crate::registry::ClientRegistry;
use crate::server::config::ServerConfig;
use crate::server::connection::{Connection, Route};

/// Pause after a failed `accept` before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// NTRIP caster
pub struct CasterServer {
    config: Arc<ServerConfig>,
    catalog: Arc<Catalog>,
    registry: Arc<ClientRegistry>,
    next_session_id: AtomicU64,
    shutdown: CancellationToken,
}

impl CasterServer {
    /// Create a caster serving `catalog`
    pub fn new(config: ServerConfig, catalog: Catalog) -> Self {
        let registry = ClientRegistry::from_catalog(&catalog);

        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            registry: Arc::new(registry),
            next_session_id: AtomicU64::new(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a caster from a complete configuration
    pub fn from_config(config: CasterConfig) -> Result<Self> {
        let (server_config, catalog) = config.into_parts()?;
        Ok(Self::new(server_config, catalog))
    }

    /// Get a reference to the client registry
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Get the catalog
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Stop accepting and cancel every running session
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Run the server until [`CasterServer::shutdown`] is called
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener until `shutdown`
    /// completes.
    ///
    /// On exit the listener is closed and every source and client session
    /// is cancelled; sessions close their own sockets.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "NTRIP caster listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = self.shutdown.cancelled() => {
                tracing::info!("Shutdown requested");
            }
            _ = self.accept_loop(&listener) => {}
        }

        drop(listener);
        self.shutdown.cancel();
        tracing::info!(addr = %local_addr, "NTRIP caster stopped");

        Ok(())
    }

    async fn accept_loop(&self, listener: &TcpListener) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    // Errors such as EMFILE persist until sockets are released
                    tracing::error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
            }
        }

        let connection = Connection::new(
            session_id,
            socket,
            peer_addr,
            Arc::clone(&self.config),
            Arc::clone(&self.catalog),
            Arc::clone(&self.registry),
            self.shutdown.child_token(),
        );

        // Errors stay inside this task; other connections are unaffected
        tokio::spawn(async move {
            match connection.run().await {
                Ok(Route::Client) => {}
                Ok(route) => {
                    tracing::debug!(session_id = session_id, route = ?route, "Connection closed");
                }
                Err(e) if e.is_disconnect() => {
                    tracing::debug!(session_id = session_id, error = %e, "Connection closed");
                }
                Err(e) => {
                    tracing::warn!(session_id = session_id, peer = %peer_addr, error = %e, "Connection error");
                }
            }
        });
    }
}
