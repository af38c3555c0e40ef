//! NTRIP caster
//!
//! A relay for GNSS correction streams. Reference stations ("sources") push
//! a byte stream into a named mountpoint; any number of subscribers
//! ("clients") pull it. The caster authenticates both sides against a
//! static catalog and answers discovery requests with the sourcetable.
//!
//! # Example
//! ```no_run
//! use ntrip_caster::{CasterConfig, CasterServer};
//!
//! # async fn example() -> ntrip_caster::Result<()> {
//! let json = std::fs::read_to_string("config.json")?;
//! let server = CasterServer::from_config(CasterConfig::from_json(&json)?)?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use catalog::{Carrier, Catalog, SourceEntry, User};
pub use config::CasterConfig;
pub use error::{Error, Result};
pub use registry::{ClientRegistry, SourcePolicy};
pub use server::{CasterServer, ServerConfig};
pub use session::QueuePolicy;
