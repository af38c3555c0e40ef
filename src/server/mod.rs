//! NTRIP caster server
//!
//! [`CasterServer`] owns the listener, the catalog and the client registry;
//! each accepted socket is handed to a [`Connection`] on its own task.

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::{Connection, Route};
pub use listener::CasterServer;
