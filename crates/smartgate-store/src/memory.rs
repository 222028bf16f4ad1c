//! In-memory store implementation.
//!
//! Backs the gateway when no relational collaborator is wired in, and
//! doubles as the test store: everything persisted can be inspected, and
//! persistence failures can be injected to exercise the failure-isolation
//! paths of the event multiplexer.

use crate::GatewayStore;
use chrono::{DateTime, Utc};
use smartgate_core::{AccessType, DeviceProfile, Error, InventorySnapshot, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// One recorded authentication.
#[derive(Debug, Clone)]
pub struct AuthenticationRecord {
    pub user: String,
    pub access: AccessType,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    profile: DeviceProfile,
    registered_devices: HashSet<String>,
    users: HashSet<String>,
    inventories: Vec<InventorySnapshot>,
    authentications: Vec<AuthenticationRecord>,
}

/// In-memory reference store.
///
/// Cloning shares the underlying state, so a clone handed to the gateway
/// can still be inspected by the test that created it.
///
/// # Examples
///
/// ```
/// use smartgate_store::{GatewayStore, MemoryStore};
///
/// # #[tokio::main]
/// # async fn main() -> smartgate_core::Result<()> {
/// let store = MemoryStore::new();
///
/// assert!(store.upsert_user("alice").await?);
/// assert!(!store.upsert_user("alice").await?);
/// assert!(store.remove_user("alice").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    fail_persistence: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store with a default device profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a preset device profile.
    #[must_use]
    pub fn with_profile(profile: DeviceProfile) -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState {
                profile,
                ..MemoryState::default()
            })),
            fail_persistence: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the device profile.
    pub async fn set_profile(&self, profile: DeviceProfile) {
        self.state.write().await.profile = profile;
    }

    /// Make subsequent persist calls fail (failure injection for tests).
    pub fn set_fail_persistence(&self, fail: bool) {
        self.fail_persistence.store(fail, Ordering::SeqCst);
    }

    /// Number of inventories persisted so far.
    pub async fn inventory_count(&self) -> usize {
        self.state.read().await.inventories.len()
    }

    /// Snapshot of recorded authentications.
    pub async fn authentications(&self) -> Vec<AuthenticationRecord> {
        self.state.read().await.authentications.clone()
    }

    /// Whether a user currently exists.
    pub async fn has_user(&self, user: &str) -> bool {
        self.state.read().await.users.contains(user)
    }

    fn check_failure(&self) -> Result<()> {
        if self.fail_persistence.load(Ordering::SeqCst) {
            return Err(Error::Store("injected persistence failure".to_string()));
        }
        Ok(())
    }
}

impl GatewayStore for MemoryStore {
    async fn persist_inventory(&self, snapshot: &InventorySnapshot) -> Result<()> {
        self.check_failure()?;
        self.state.write().await.inventories.push(snapshot.clone());
        Ok(())
    }

    async fn persist_authentication(&self, user: &str, access: AccessType) -> Result<()> {
        self.check_failure()?;
        self.state
            .write()
            .await
            .authentications
            .push(AuthenticationRecord {
                user: user.to_string(),
                access,
                at: Utc::now(),
            });
        Ok(())
    }

    async fn device_profile(&self) -> Result<DeviceProfile> {
        Ok(self.state.read().await.profile.clone())
    }

    async fn is_device_registered(&self, serial: &str) -> Result<bool> {
        Ok(self.state.read().await.registered_devices.contains(serial))
    }

    async fn register_device(&self, serial: &str) -> Result<()> {
        self.state
            .write()
            .await
            .registered_devices
            .insert(serial.to_string());
        Ok(())
    }

    async fn upsert_user(&self, user: &str) -> Result<bool> {
        Ok(self.state.write().await.users.insert(user.to_string()))
    }

    async fn remove_user(&self, user: &str) -> Result<bool> {
        Ok(self.state.write().await.users.remove(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartgate_core::TagUid;

    #[tokio::test]
    async fn test_persist_inventory() {
        let store = MemoryStore::new();
        let snapshot =
            InventorySnapshot::new(vec![TagUid::new("04ABCDEF").unwrap()]);

        store.persist_inventory(&snapshot).await.unwrap();
        assert_eq!(store.inventory_count().await, 1);
    }

    #[tokio::test]
    async fn test_persist_authentication() {
        let store = MemoryStore::new();
        store
            .persist_authentication("alice", AccessType::Badge)
            .await
            .unwrap();

        let records = store.authentications().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user, "alice");
        assert_eq!(records[0].access, AccessType::Badge);
    }

    #[tokio::test]
    async fn test_persistence_failure_injection() {
        let store = MemoryStore::new();
        store.set_fail_persistence(true);

        let snapshot = InventorySnapshot::new(vec![]);
        assert!(store.persist_inventory(&snapshot).await.is_err());
        assert_eq!(store.inventory_count().await, 0);

        store.set_fail_persistence(false);
        assert!(store.persist_inventory(&snapshot).await.is_ok());
    }

    #[tokio::test]
    async fn test_device_registration() {
        let store = MemoryStore::new();
        assert!(!store.is_device_registered("AA770201").await.unwrap());

        store.register_device("AA770201").await.unwrap();
        assert!(store.is_device_registered("AA770201").await.unwrap());
    }

    #[tokio::test]
    async fn test_user_management() {
        let store = MemoryStore::new();
        assert!(store.upsert_user("bob").await.unwrap());
        assert!(!store.upsert_user("bob").await.unwrap());
        assert!(store.has_user("bob").await);

        assert!(store.remove_user("bob").await.unwrap());
        assert!(!store.remove_user("bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_profile() {
        let store = MemoryStore::new();
        let profile = DeviceProfile {
            master_reader_id: Some("FPR-01".to_string()),
            slave_reader_ids: vec!["FPR-02".to_string()],
            badge_readers: 2,
            temperature_probe: true,
        };
        store.set_profile(profile.clone()).await;

        assert_eq!(store.device_profile().await.unwrap(), profile);
    }
}
