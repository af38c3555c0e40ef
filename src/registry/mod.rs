//! Client registry
//!
//! Tracks which clients are subscribed to each mountpoint and which
//! sources are feeding it.
//!
//! ```text
//!                     Arc<ClientRegistry>
//!              ┌──────────────────────────────┐
//!              │ "mp1" → RwLock<Arc<Vec<..>>> │◄── add_client / remove_client
//!              │ "mp2" → RwLock<Arc<Vec<..>>> │    (swap under write lock)
//!              └──────────────┬───────────────┘
//!                             │ snapshot(): clone the Arc
//!                             ▼
//!                      [SourceConnection]
//!                   for client in snapshot { enqueue }
//! ```

pub mod error;
pub mod policy;
pub mod store;

pub use error::RegistryError;
pub use policy::SourcePolicy;
pub use store::{ClientRegistry, Membership};
