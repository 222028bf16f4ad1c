//! Collaborator ports consumed by the gateway core.
//!
//! Persistence of users, inventories, and authentications to a relational
//! store is an external concern; this crate defines the interface the
//! gateway dispatches against plus an in-memory reference implementation
//! used by the binary default and the test-suite.
//!
//! Traits use native `async fn` methods (Edition 2024 RPITIT) and are
//! therefore not object-safe; the [`AnyStore`] enum provides concrete
//! type dispatch, mirroring the hardware driver wrappers in
//! `smartgate-device`.

#![allow(async_fn_in_trait)]

pub mod memory;

pub use memory::MemoryStore;

use smartgate_core::{AccessType, DeviceProfile, InventorySnapshot, Result};

/// Persistence and configuration port backing the gateway.
///
/// Every method is failure-isolated at the call site: a store error is
/// logged by the caller and never escalates past the dispatch or event
/// path.
pub trait GatewayStore: Send + Sync {
    /// Record one completed inventory scan.
    async fn persist_inventory(&self, snapshot: &InventorySnapshot) -> Result<()>;

    /// Record one successful authentication.
    async fn persist_authentication(&self, user: &str, access: AccessType) -> Result<()>;

    /// Peripheral configuration for module bring-up.
    async fn device_profile(&self) -> Result<DeviceProfile>;

    /// Whether a device serial number has been seen before.
    async fn is_device_registered(&self, serial: &str) -> Result<bool>;

    /// Register a device serial number.
    async fn register_device(&self, serial: &str) -> Result<()>;

    /// Add or update a user. Returns `true` if the user was newly added.
    async fn upsert_user(&self, user: &str) -> Result<bool>;

    /// Remove a user. Returns `true` if the user existed.
    async fn remove_user(&self, user: &str) -> Result<bool>;
}

/// Enum wrapper for store dispatch.
///
/// A relational implementation lives outside this workspace; in-tree the
/// memory store backs both the default binary and the tests.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyStore {
    /// In-memory reference store.
    Memory(MemoryStore),
}

impl GatewayStore for AnyStore {
    async fn persist_inventory(&self, snapshot: &InventorySnapshot) -> Result<()> {
        match self {
            Self::Memory(store) => store.persist_inventory(snapshot).await,
        }
    }

    async fn persist_authentication(&self, user: &str, access: AccessType) -> Result<()> {
        match self {
            Self::Memory(store) => store.persist_authentication(user, access).await,
        }
    }

    async fn device_profile(&self) -> Result<DeviceProfile> {
        match self {
            Self::Memory(store) => store.device_profile().await,
        }
    }

    async fn is_device_registered(&self, serial: &str) -> Result<bool> {
        match self {
            Self::Memory(store) => store.is_device_registered(serial).await,
        }
    }

    async fn register_device(&self, serial: &str) -> Result<()> {
        match self {
            Self::Memory(store) => store.register_device(serial).await,
        }
    }

    async fn upsert_user(&self, user: &str) -> Result<bool> {
        match self {
            Self::Memory(store) => store.upsert_user(user).await,
        }
    }

    async fn remove_user(&self, user: &str) -> Result<bool> {
        match self {
            Self::Memory(store) => store.remove_user(user).await,
        }
    }
}
