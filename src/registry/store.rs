//! Client registry implementation
//!
//! Membership for each mountpoint is an immutable `Arc<Vec<_>>`. Writers
//! take the lock, build a new vector and swap it in; readers clone the
//! `Arc` and iterate without holding any lock, so a fan-out pass never
//! waits on a concurrent subscribe or eviction and never sees a
//! half-updated list.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::catalog::Catalog;
use crate::session::ClientConnection;

use super::error::RegistryError;
use super::policy::SourcePolicy;

/// Point-in-time membership of one mountpoint
pub type Membership = Arc<Vec<Arc<ClientConnection>>>;

struct SourceSlot {
    id: u64,
    cancel: CancellationToken,
}

struct MountpointEntry {
    clients: RwLock<Membership>,
    sources: Mutex<Vec<SourceSlot>>,
}

impl MountpointEntry {
    fn new() -> Self {
        Self {
            clients: RwLock::new(Arc::new(Vec::new())),
            sources: Mutex::new(Vec::new()),
        }
    }
}

/// Registry of live clients and sources, keyed by mountpoint
///
/// The set of mountpoints is fixed at construction; every catalog
/// mountpoint has an entry (possibly empty) before any connection is
/// processed.
pub struct ClientRegistry {
    mountpoints: HashMap<String, MountpointEntry>,
}

impl ClientRegistry {
    /// Create a registry with an empty entry for each mountpoint
    pub fn new<I, S>(mountpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mountpoints: mountpoints
                .into_iter()
                .map(|mp| (mp.into(), MountpointEntry::new()))
                .collect(),
        }
    }

    /// Create a registry covering every mountpoint in the catalog
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self::new(catalog.mountpoints())
    }

    /// Whether the registry tracks `mountpoint`
    pub fn contains(&self, mountpoint: &str) -> bool {
        self.mountpoints.contains_key(mountpoint)
    }

    fn entry(&self, mountpoint: &str) -> Result<&MountpointEntry, RegistryError> {
        self.mountpoints
            .get(mountpoint)
            .ok_or_else(|| RegistryError::UnknownMountpoint(mountpoint.to_string()))
    }

    /// Current clients of `mountpoint`; empty for unknown mountpoints
    pub async fn snapshot(&self, mountpoint: &str) -> Membership {
        match self.mountpoints.get(mountpoint) {
            Some(entry) => Arc::clone(&*entry.clients.read().await),
            None => Arc::new(Vec::new()),
        }
    }

    /// Add a client under its mountpoint
    pub async fn add_client(&self, client: Arc<ClientConnection>) -> Result<(), RegistryError> {
        let entry = self.entry(client.mountpoint())?;
        let mut clients = entry.clients.write().await;

        let mut next = Vec::with_capacity(clients.len() + 1);
        next.extend(clients.iter().cloned());
        next.push(Arc::clone(&client));
        *clients = Arc::new(next);

        tracing::info!(
            mountpoint = client.mountpoint(),
            client = %client,
            clients = clients.len(),
            "Client added"
        );

        Ok(())
    }

    /// Remove a client; returns `false` if it was not registered
    pub async fn remove_client(&self, mountpoint: &str, client_id: u64) -> bool {
        let Some(entry) = self.mountpoints.get(mountpoint) else {
            return false;
        };
        let mut clients = entry.clients.write().await;

        if !clients.iter().any(|c| c.id() == client_id) {
            return false;
        }

        let next: Vec<_> = clients
            .iter()
            .filter(|c| c.id() != client_id)
            .cloned()
            .collect();
        *clients = Arc::new(next);

        tracing::info!(
            mountpoint = mountpoint,
            client_id = client_id,
            clients = clients.len(),
            "Client removed"
        );

        true
    }

    /// Number of clients currently registered under `mountpoint`
    pub async fn client_count(&self, mountpoint: &str) -> usize {
        self.snapshot(mountpoint).await.len()
    }

    /// Number of clients across all mountpoints
    pub async fn total_clients(&self) -> usize {
        let mut total = 0;
        for entry in self.mountpoints.values() {
            total += entry.clients.read().await.len();
        }
        total
    }

    /// Record a live source on `mountpoint`, applying `policy`.
    ///
    /// `cancel` is the source session's token; [`SourcePolicy::ReplaceExisting`]
    /// cancels the tokens of the sources it displaces.
    pub async fn register_source(
        &self,
        mountpoint: &str,
        source_id: u64,
        cancel: CancellationToken,
        policy: SourcePolicy,
    ) -> Result<(), RegistryError> {
        let entry = self.entry(mountpoint)?;
        let mut sources = entry.sources.lock().await;

        match policy {
            SourcePolicy::AllowConcurrent => {}
            SourcePolicy::RejectSecond => {
                if !sources.is_empty() {
                    return Err(RegistryError::MountpointInUse(mountpoint.to_string()));
                }
            }
            SourcePolicy::ReplaceExisting => {
                for displaced in sources.drain(..) {
                    tracing::info!(
                        mountpoint = mountpoint,
                        source_id = displaced.id,
                        replaced_by = source_id,
                        "Source replaced"
                    );
                    displaced.cancel.cancel();
                }
            }
        }

        sources.push(SourceSlot {
            id: source_id,
            cancel,
        });

        tracing::info!(
            mountpoint = mountpoint,
            source_id = source_id,
            sources = sources.len(),
            "Source registered"
        );

        Ok(())
    }

    /// Release a source's slot; returns `false` if it was not registered
    pub async fn unregister_source(&self, mountpoint: &str, source_id: u64) -> bool {
        let Some(entry) = self.mountpoints.get(mountpoint) else {
            return false;
        };
        let mut sources = entry.sources.lock().await;
        let before = sources.len();
        sources.retain(|s| s.id != source_id);
        before != sources.len()
    }

    /// Number of live sources on `mountpoint`
    pub async fn source_count(&self, mountpoint: &str) -> usize {
        match self.mountpoints.get(mountpoint) {
            Some(entry) => entry.sources.lock().await.len(),
            None => 0,
        }
    }
}
