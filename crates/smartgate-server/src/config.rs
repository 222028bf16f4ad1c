//! Gateway configuration.
//!
//! Loaded from a TOML file by the binary; every field has a default so a
//! missing file or partial file still yields a runnable gateway.
//!
//! ```toml
//! raw_addr = "0.0.0.0:5740"
//! ws_addr = "0.0.0.0:5741"
//! admin_secret = "change-me"
//! dedup_scope = "global"
//! dedup_window_ms = 500
//!
//! [bridge]
//! start_program = "smartgate-forwarder"
//! stop_program = "pkill"
//! stop_args = ["-f", "smartgate-forwarder"]
//! ```

use serde::{Deserialize, Serialize};
use smartgate_core::{
    AdminSecret, Error, Result,
    constants::{DEDUP_WINDOW_MS, DEFAULT_RAW_PORT, DEFAULT_WS_PORT},
};
use smartgate_device::BridgeConfig;
use std::net::SocketAddr;
use std::path::Path;

/// Whether the anti-flood record is shared across both transports or
/// kept separate per transport.
///
/// This is a deliberate configuration choice, not an implementation
/// accident: with `Global` (the default) a retransmission arriving on
/// the other transport is still suppressed; with `PerTransport` each
/// transport keeps its own window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    /// One dedup record for the whole process.
    #[default]
    Global,
    /// One dedup record per transport.
    PerTransport,
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener address for the raw stream transport.
    pub raw_addr: SocketAddr,
    /// Listener address for the WebSocket transport.
    pub ws_addr: SocketAddr,
    /// Secret required by `ADMIN_SIGN_IN`.
    pub admin_secret: AdminSecret,
    /// Anti-flood record sharing.
    pub dedup_scope: DedupScope,
    /// Anti-flood window in milliseconds.
    pub dedup_window_ms: u64,
    /// External serial-bridge forwarder command lines.
    pub bridge: BridgeConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            raw_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_RAW_PORT)),
            ws_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_WS_PORT)),
            admin_secret: AdminSecret::new("change-me"),
            dedup_scope: DedupScope::Global,
            dedup_window_ms: DEDUP_WINDOW_MS,
            bridge: BridgeConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `Error::Config` when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }
}
