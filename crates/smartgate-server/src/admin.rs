//! Administrator session tracking.
//!
//! The admin set holds the remote addresses currently authenticated as
//! administrators. Entries are added on successful `ADMIN_SIGN_IN`,
//! removed on `ADMIN_SIGN_OUT`, and purged when the connection closes.
//! Shared across every connection's dispatch path under one mutex.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Mutex;
use tracing::info;

/// Mutex-guarded set of administrator addresses.
#[derive(Debug, Default)]
pub struct AdminSet {
    inner: Mutex<HashSet<SocketAddr>>,
}

impl AdminSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant admin privilege to an address.
    pub fn sign_in(&self, addr: SocketAddr) {
        if self.inner.lock().expect("admin lock poisoned").insert(addr) {
            info!(%addr, "Administrator signed in");
        }
    }

    /// Drop admin privilege. Returns whether the address was signed in.
    pub fn sign_out(&self, addr: SocketAddr) -> bool {
        let removed = self.inner.lock().expect("admin lock poisoned").remove(&addr);
        if removed {
            info!(%addr, "Administrator signed out");
        }
        removed
    }

    /// Whether an address holds admin privilege.
    pub fn contains(&self, addr: SocketAddr) -> bool {
        self.inner.lock().expect("admin lock poisoned").contains(&addr)
    }

    /// Purge an address on connection close. Idempotent.
    pub fn purge(&self, addr: SocketAddr) {
        self.inner.lock().expect("admin lock poisoned").remove(&addr);
    }

    /// Number of signed-in administrators.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("admin lock poisoned").len()
    }

    /// Whether no administrator is signed in.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
