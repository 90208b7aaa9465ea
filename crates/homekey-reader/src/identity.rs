//! Reader identity upkeep: the pairing callback and maintenance commands.

use crate::error::Result;
use homekey_hardware::AccessoryStore;
use homekey_storage::{ReaderData, ReaderDataRepository, ReaderInfo, SharedReaderData, upper_hex};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// What a pairing change did to the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingSync {
    /// No admin controller left; the identity was erased.
    Wiped,
    /// Issuers were reconciled with the paired controllers.
    Synced { added: usize },
}

/// Owner of the persisted reader identity.
#[derive(Debug, Clone)]
pub struct IdentityService {
    identity: SharedReaderData,
    repository: ReaderDataRepository,
    accessory: Arc<dyn AccessoryStore>,
}

impl IdentityService {
    pub fn new(
        identity: SharedReaderData,
        repository: ReaderDataRepository,
        accessory: Arc<dyn AccessoryStore>,
    ) -> Self {
        Self {
            identity,
            repository,
            accessory,
        }
    }

    /// Load the identity from the store (defaults if missing or corrupt).
    pub async fn load(
        repository: ReaderDataRepository,
        accessory: Arc<dyn AccessoryStore>,
    ) -> Self {
        let data = repository.load().await;
        if data.is_provisioned() {
            info!(
                "Reader group {} with {} issuer(s)",
                upper_hex(&data.reader_gid),
                data.issuers.len()
            );
        }
        Self::new(Arc::new(RwLock::new(data)), repository, accessory)
    }

    /// Handle shared with the card loop.
    pub fn shared(&self) -> SharedReaderData {
        Arc::clone(&self.identity)
    }

    pub async fn snapshot(&self) -> ReaderData {
        self.identity.read().await.clone()
    }

    /// Called by the accessory stack after a pairing was added or removed.
    pub async fn on_pairings_changed(&self) -> Result<PairingSync> {
        let controllers = self.accessory.controllers();
        if !controllers.iter().any(|c| c.admin) {
            info!("No admin controllers left, deleting reader data");
            self.erase().await?;
            return Ok(PairingSync::Wiped);
        }

        let mut identity = self.identity.write().await;
        for controller in &controllers {
            debug!("Found allocated controller {}", controller.id);
        }
        let added = identity.sync_issuers(controllers.iter().map(|c| c.ltpk.as_slice()));
        if added > 0 {
            info!("Registered {} new issuer(s)", added);
        }
        self.repository.save(&*identity).await?;
        Ok(PairingSync::Synced { added })
    }

    /// Forget every endpoint, keeping the issuers.
    pub async fn remove_endpoints(&self) -> Result<usize> {
        let mut identity = self.identity.write().await;
        let removed = identity.remove_endpoints();
        self.repository.save(&*identity).await?;
        info!("Removed {} endpoint(s)", removed);
        Ok(removed)
    }

    /// Erase the persisted identity and reset the in-memory one.
    pub async fn erase(&self) -> Result<()> {
        let mut identity = self.identity.write().await;
        identity.clear();
        self.repository.clear().await?;
        Ok(())
    }

    pub async fn info(&self) -> ReaderInfo {
        self.identity.read().await.info()
    }
}
