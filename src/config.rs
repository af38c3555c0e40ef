//! Caster configuration file format
//!
//! The on-disk format is JSON with PascalCase keys:
//!
//! ```json
//! {
//!   "ServerAddress": "0.0.0.0",
//!   "ServerPort": 2101,
//!   "MaxClients": 100,
//!   "Sources": [
//!     { "Mountpoint": "TEST1", "Identifier": "Test Station", "Format": "RTCM 3",
//!       "Carrier": "L1L2", "NavSystem": "GPS", "Network": "NET", "Country": "NLD",
//!       "Latitude": 52.0, "Longitude": 4.0, "AuthRequired": false, "Password": "secret" }
//!   ],
//!   "Users": [ { "Name": "alice", "Password": "pw", "Mountpoints": ["TEST1"] } ]
//! }
//! ```
//!
//! Reading the file is left to the caller.

use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;

use crate::catalog::{Catalog, SourceEntry, User};
use crate::error::{Error, Result};
use crate::protocol::constants::DEFAULT_PORT;
use crate::server::ServerConfig;

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Complete caster configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CasterConfig {
    /// IP address to bind to
    #[serde(default = "default_address")]
    pub server_address: String,
    /// Port to bind to
    #[serde(default = "default_port")]
    pub server_port: u16,
    /// Maximum clients (not enforced)
    #[serde(default)]
    pub max_clients: usize,
    /// Configured mountpoints
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    /// Configured client accounts
    #[serde(default)]
    pub users: Vec<User>,
}

impl CasterConfig {
    /// Parse a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Socket address built from `ServerAddress` and `ServerPort`
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.server_address.trim().parse().map_err(|_| {
            Error::Config(format!("invalid server address '{}'", self.server_address))
        })?;
        Ok(SocketAddr::new(ip, self.server_port))
    }

    /// Split into the server settings and the mountpoint catalog
    pub fn into_parts(self) -> Result<(ServerConfig, Catalog)> {
        let server = ServerConfig::with_addr(self.bind_addr()?).max_clients(self.max_clients);
        let catalog = Catalog::new(self.sources, self.users)?;
        Ok((server, catalog))
    }
}
