//! Gateway binary.
//!
//! Usage: `smartgate [config.toml]`; with no argument the built-in
//! defaults apply. Log filtering follows `RUST_LOG` (default `info`).

use anyhow::Context;
use smartgate_device::{AnyDriver, MockDriver};
use smartgate_server::{Gateway, GatewayConfig};
use smartgate_store::{AnyStore, MemoryStore};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => GatewayConfig::load(&path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => GatewayConfig::default(),
    };

    info!(version = smartgate_core::VERSION, "Starting smartgate");

    // Deployment builds wire in the vendor SDK driver and a relational
    // store here; the defaults emulate the controller and keep state in
    // memory.
    let driver = AnyDriver::Mock(MockDriver::new());
    let store = AnyStore::Memory(MemoryStore::new());

    Gateway::bind(config, store, driver)
        .await
        .context("binding gateway listeners")?
        .run()
        .await
        .context("running gateway")?;

    Ok(())
}
