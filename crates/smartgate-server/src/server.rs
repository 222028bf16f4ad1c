//! Gateway assembly.
//!
//! Startup sequence: load the device profile, attempt one best-effort
//! connect (clients simply see "device unavailable" until hardware
//! appears), then bind both listeners. Bind failure is the only
//! process-fatal condition. Shutdown releases the device handle first
//! and stops the forwarding process second.

use crate::admin::AdminSet;
use crate::config::{DedupScope, GatewayConfig};
use crate::dedup::DedupWindow;
use crate::dispatch::{Dispatcher, GatewayContext};
use crate::events::EventMultiplexer;
use crate::registry::Broadcaster;
use crate::{raw, ws};
use smartgate_core::Result;
use smartgate_device::{AnyDriver, DeviceEvent, DeviceLifecycle, SerialBridge};
use smartgate_store::{AnyStore, GatewayStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Capacity of the single device event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A bound but not yet running gateway.
pub struct Gateway {
    config: GatewayConfig,
    ctx: Arc<GatewayContext>,
    raw_listener: TcpListener,
    ws_listener: TcpListener,
    raw_addr: SocketAddr,
    ws_addr: SocketAddr,
    events_rx: mpsc::Receiver<DeviceEvent>,
}

impl Gateway {
    /// Build the shared context, try an initial device connect, and
    /// bind both listeners.
    ///
    /// # Errors
    /// Returns an error only when a listener cannot be bound; device
    /// absence is not an error at startup.
    pub async fn bind(config: GatewayConfig, store: AnyStore, driver: AnyDriver) -> Result<Self> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let lifecycle = Arc::new(DeviceLifecycle::new(driver, events_tx));

        match store.device_profile().await {
            Ok(profile) => lifecycle.set_profile(profile),
            Err(e) => warn!(error = %e, "Device profile unavailable, using defaults"),
        }

        let ctx = Arc::new(GatewayContext {
            lifecycle,
            store,
            bridge: Arc::new(SerialBridge::new(config.bridge.clone())),
            broadcaster: Arc::new(Broadcaster::new()),
            admins: AdminSet::new(),
            admin_secret: config.admin_secret.clone(),
        });

        // Best-effort: commands report "device unavailable" until a
        // device appears.
        match ctx.lifecycle.connect().await {
            Ok(()) => {
                if let Err(e) = ctx.lifecycle.attach_modules().await {
                    warn!(error = %e, "Initial module bring-up failed");
                }
            }
            Err(e) => info!(error = %e, "Device not available at startup"),
        }

        let raw_listener = TcpListener::bind(config.raw_addr).await?;
        let ws_listener = TcpListener::bind(config.ws_addr).await?;
        let raw_addr = raw_listener.local_addr()?;
        let ws_addr = ws_listener.local_addr()?;
        info!(raw = %raw_addr, ws = %ws_addr, "Gateway listening");

        Ok(Self {
            config,
            ctx,
            raw_listener,
            ws_listener,
            raw_addr,
            ws_addr,
            events_rx,
        })
    }

    /// Shared context (tests and embedding).
    pub fn context(&self) -> Arc<GatewayContext> {
        self.ctx.clone()
    }

    /// Bound raw-transport address (useful with port 0).
    pub fn raw_addr(&self) -> SocketAddr {
        self.raw_addr
    }

    /// Bound WebSocket-transport address.
    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    /// Spawn the event multiplexer and both transport accept loops.
    pub fn spawn(self) -> GatewayHandle {
        let window = Duration::from_millis(self.config.dedup_window_ms);
        let (raw_dedup, ws_dedup) = match self.config.dedup_scope {
            DedupScope::Global => {
                let shared = Arc::new(DedupWindow::new(window));
                (shared.clone(), shared)
            }
            DedupScope::PerTransport => (
                Arc::new(DedupWindow::new(window)),
                Arc::new(DedupWindow::new(window)),
            ),
        };

        let raw_dispatcher = Arc::new(Dispatcher::new(self.ctx.clone(), raw_dedup));
        let ws_dispatcher = Arc::new(Dispatcher::new(self.ctx.clone(), ws_dedup));

        let multiplexer = EventMultiplexer::new(self.ctx.clone());
        let tasks = vec![
            tokio::spawn(multiplexer.run(self.events_rx)),
            tokio::spawn(raw::run(self.raw_listener, raw_dispatcher)),
            tokio::spawn(ws::run(self.ws_listener, ws_dispatcher)),
        ];

        GatewayHandle {
            ctx: self.ctx,
            raw_addr: self.raw_addr,
            ws_addr: self.ws_addr,
            tasks,
        }
    }

    /// Run until SIGINT, then shut down in order.
    ///
    /// # Errors
    /// Returns an error when the signal handler cannot be installed.
    pub async fn run(self) -> Result<()> {
        let handle = self.spawn();
        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");
        handle.shutdown().await;
        Ok(())
    }
}

/// Running gateway tasks plus ordered shutdown.
pub struct GatewayHandle {
    ctx: Arc<GatewayContext>,
    raw_addr: SocketAddr,
    ws_addr: SocketAddr,
    tasks: Vec<JoinHandle<()>>,
}

impl GatewayHandle {
    pub fn context(&self) -> Arc<GatewayContext> {
        self.ctx.clone()
    }

    pub fn raw_addr(&self) -> SocketAddr {
        self.raw_addr
    }

    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    /// Stop accepting, release the device handle, then stop the
    /// forwarding process if active, in that order.
    pub async fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        self.ctx.lifecycle.disconnect().await;
        self.ctx.bridge.stop_if_active().await;
        info!("Gateway stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartgate_device::MockDriver;
    use smartgate_store::MemoryStore;

    fn test_config() -> GatewayConfig {
        GatewayConfig {
            raw_addr: "127.0.0.1:0".parse().unwrap(),
            ws_addr: "127.0.0.1:0".parse().unwrap(),
            ..GatewayConfig::default()
        }
    }

    #[tokio::test]
    async fn test_bind_with_device_present() {
        let driver = MockDriver::new();
        let gateway = Gateway::bind(
            test_config(),
            AnyStore::Memory(MemoryStore::new()),
            AnyDriver::Mock(driver.clone()),
        )
        .await
        .unwrap();

        assert!(gateway.context().lifecycle.is_connected().await);
        assert_ne!(gateway.raw_addr().port(), 0);
        assert_ne!(gateway.ws_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_without_device_still_listens() {
        let driver = MockDriver::new();
        driver.set_candidates(vec![]);

        let gateway = Gateway::bind(
            test_config(),
            AnyStore::Memory(MemoryStore::new()),
            AnyDriver::Mock(driver),
        )
        .await
        .unwrap();

        assert!(!gateway.context().lifecycle.is_connected().await);
        assert_ne!(gateway.raw_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal() {
        let first = Gateway::bind(
            test_config(),
            AnyStore::Memory(MemoryStore::new()),
            AnyDriver::Mock(MockDriver::new()),
        )
        .await
        .unwrap();

        let conflicting = GatewayConfig {
            raw_addr: first.raw_addr(),
            ws_addr: "127.0.0.1:0".parse().unwrap(),
            ..GatewayConfig::default()
        };

        let result = Gateway::bind(
            conflicting,
            AnyStore::Memory(MemoryStore::new()),
            AnyDriver::Mock(MockDriver::new()),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_releases_device() {
        let driver = MockDriver::new();
        let gateway = Gateway::bind(
            test_config(),
            AnyStore::Memory(MemoryStore::new()),
            AnyDriver::Mock(driver.clone()),
        )
        .await
        .unwrap();
        let ctx = gateway.context();

        let handle = gateway.spawn();
        handle.shutdown().await;

        assert!(!ctx.lifecycle.is_connected().await);
        assert_eq!(driver.release_calls(), 1);
    }
}
