//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::*;
use crate::registry::SourcePolicy;
use crate::session::QueuePolicy;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum clients (carried from configuration, not enforced)
    pub max_clients: usize,

    /// Size of the initial request read and of each source chunk
    pub buffer_size: usize,

    /// Time allowed for the initial request to arrive
    pub request_timeout: Duration,

    /// A source silent for this long is disconnected
    pub source_read_timeout: Duration,

    /// Bound on a single write to a client
    pub client_send_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Body of the reply to non-NTRIP probes
    pub greeting: String,

    /// Backlog policy for client queues
    pub queue_policy: QueuePolicy,

    /// Policy for a second source on an occupied mountpoint
    pub source_policy: SourcePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_clients: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            request_timeout: Duration::from_secs(10),
            source_read_timeout: Duration::from_secs(10),
            client_send_timeout: Duration::from_secs(1),
            tcp_nodelay: true, // RTCM corrections are latency sensitive
            greeting: DEFAULT_GREETING.to_string(),
            queue_policy: QueuePolicy::default(),
            source_policy: SourcePolicy::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum clients
    pub fn max_clients(mut self, max: usize) -> Self {
        self.max_clients = max;
        self
    }

    /// Set the read buffer size
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Set the initial request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the source read timeout
    pub fn source_read_timeout(mut self, timeout: Duration) -> Self {
        self.source_read_timeout = timeout;
        self
    }

    /// Set the client send timeout
    pub fn client_send_timeout(mut self, timeout: Duration) -> Self {
        self.client_send_timeout = timeout;
        self
    }

    /// Set the probe greeting
    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Set the client queue policy
    pub fn queue_policy(mut self, policy: QueuePolicy) -> Self {
        self.queue_policy = policy;
        self
    }

    /// Set the source policy
    pub fn source_policy(mut self, policy: SourcePolicy) -> Self {
        self.source_policy = policy;
        self
    }
}
