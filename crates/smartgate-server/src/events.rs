//! Event multiplexer.
//!
//! One task consumes the device's single event channel and translates
//! each hardware callback 1:1 into a broadcast protocol message for
//! every connection on both transports. Non-trivial cases:
//!
//! - `Disconnected` clears the handle and spawns a reconnect cycle on a
//!   worker task, unless the lifecycle is suspended for the serial
//!   bridge (the disconnect is expected there).
//! - `ScanCompleted` and `AuthenticationSuccess` also invoke the
//!   persistence collaborator; the broadcast always goes out first, and
//!   a persistence failure is logged without affecting it.
//! - Module attach/detach callbacks are logged only; they are
//!   operationally informative, not client-relevant.

use crate::dispatch::GatewayContext;
use smartgate_device::DeviceEvent;
use smartgate_protocol::{EventCode, Response};
use smartgate_store::GatewayStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The device's sole event sink.
pub struct EventMultiplexer {
    ctx: Arc<GatewayContext>,
}

impl EventMultiplexer {
    pub fn new(ctx: Arc<GatewayContext>) -> Self {
        Self { ctx }
    }

    /// Consume events until the channel closes (all senders dropped).
    pub async fn run(self, mut events: tokio::sync::mpsc::Receiver<DeviceEvent>) {
        while let Some(event) = events.recv().await {
            debug!(event = event.name(), "Device event");
            self.handle(event).await;
        }
        debug!("Device event channel closed");
    }

    async fn handle(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Disconnected => {
                self.ctx
                    .broadcaster
                    .broadcast_all(&Response::event(EventCode::DeviceDisconnected));

                let should_reconnect = self.ctx.lifecycle.on_unexpected_disconnect().await;
                if should_reconnect {
                    warn!("Device disconnected unexpectedly, starting reconnect cycle");
                    let lifecycle = self.ctx.lifecycle.clone();
                    // Reconnect sleeps for seconds; never block the
                    // event loop or a connection task with it.
                    tokio::spawn(async move {
                        lifecycle.reconnect().await;
                    });
                }
            }

            DeviceEvent::ScanCompleted(snapshot) => {
                let response = Response::event(EventCode::ScanCompleted)
                    .field(snapshot.tag_count().to_string())
                    .fields_from(snapshot.tags.iter().map(|t| t.as_str().to_string()));
                self.ctx.broadcaster.broadcast_all(&response);

                if let Err(e) = self.ctx.store.persist_inventory(&snapshot).await {
                    warn!(error = %e, "Inventory persistence failed");
                }
            }

            DeviceEvent::AuthenticationSuccess { user, access } => {
                self.ctx.broadcaster.broadcast_all(
                    &Response::event(EventCode::AuthenticationSuccess)
                        .field(&user)
                        .field(access.as_str()),
                );

                if let Err(e) = self.ctx.store.persist_authentication(&user, access).await {
                    warn!(%user, error = %e, "Authentication persistence failed");
                }
            }

            DeviceEvent::AuthenticationFailure { reason } => {
                self.ctx.broadcaster.broadcast_all(
                    &Response::event(EventCode::AuthenticationFailure).field(reason),
                );
            }

            DeviceEvent::TemperatureReading(celsius) => {
                self.ctx.broadcaster.broadcast_all(
                    &Response::event(EventCode::Temperature).field(format!("{celsius:.1}")),
                );
            }

            DeviceEvent::DoorStateChanged { open } => {
                self.ctx.broadcaster.broadcast_all(
                    &Response::event(EventCode::DoorState)
                        .field(if open { "open" } else { "closed" }),
                );
            }

            DeviceEvent::ModuleAttached(kind) => {
                info!(module = %kind, "Module attached");
            }
            DeviceEvent::ModuleDetached(kind) => {
                warn!(module = %kind, "Module detached");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::AdminSet;
    use crate::registry::{Broadcaster, ClientConnection};
    use smartgate_core::{
        AccessType, AdminSecret, InventorySnapshot, ModuleKind, TagUid, TransportKind,
    };
    use smartgate_device::{AnyDriver, BridgeConfig, DeviceLifecycle, MockDriver, SerialBridge};
    use smartgate_store::{AnyStore, MemoryStore};
    use std::net::SocketAddr;
    use tokio::sync::mpsc;

    struct Fixture {
        mux: EventMultiplexer,
        ctx: Arc<GatewayContext>,
        driver: MockDriver,
        store: MemoryStore,
    }

    async fn fixture(device_connected: bool) -> Fixture {
        let driver = MockDriver::new();
        let (events_tx, _events_rx) = mpsc::channel(16);
        let lifecycle = Arc::new(DeviceLifecycle::new(
            AnyDriver::Mock(driver.clone()),
            events_tx,
        ));
        if device_connected {
            lifecycle.connect().await.unwrap();
        }

        let store = MemoryStore::new();
        let ctx = Arc::new(GatewayContext {
            lifecycle,
            store: AnyStore::Memory(store.clone()),
            bridge: Arc::new(SerialBridge::new(BridgeConfig::default())),
            broadcaster: Arc::new(Broadcaster::new()),
            admins: AdminSet::new(),
            admin_secret: AdminSecret::new("sesame"),
        });

        Fixture {
            mux: EventMultiplexer::new(ctx.clone()),
            ctx,
            driver,
            store,
        }
    }

    fn client(
        ctx: &GatewayContext,
        port: u16,
        transport: TransportKind,
    ) -> mpsc::UnboundedReceiver<Response> {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        ctx.broadcaster
            .registry(transport)
            .register(ClientConnection::new(addr, transport, tx));
        rx
    }

    #[tokio::test]
    async fn test_scan_completed_broadcasts_then_persists() {
        let fx = fixture(true).await;
        let mut raw_rx = client(&fx.ctx, 4000, TransportKind::Raw);
        let mut ws_rx = client(&fx.ctx, 4001, TransportKind::WebSocket);

        let snapshot = InventorySnapshot::new(vec![
            TagUid::new("04ABCDEF").unwrap(),
            TagUid::new("AA770201").unwrap(),
        ]);
        fx.mux.handle(DeviceEvent::ScanCompleted(snapshot)).await;

        let expected = ["SCAN_COMPLETED", "2", "04ABCDEF", "AA770201"];
        assert_eq!(raw_rx.try_recv().unwrap().fields(), &expected);
        assert_eq!(ws_rx.try_recv().unwrap().fields(), &expected);
        assert_eq!(fx.store.inventory_count().await, 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_never_blocks_broadcast() {
        let fx = fixture(true).await;
        let mut rx = client(&fx.ctx, 4000, TransportKind::Raw);
        fx.store.set_fail_persistence(true);

        fx.mux
            .handle(DeviceEvent::ScanCompleted(InventorySnapshot::new(vec![])))
            .await;

        // The broadcast went out even though persistence failed.
        assert_eq!(rx.try_recv().unwrap().fields(), &["SCAN_COMPLETED", "0"]);
        assert_eq!(fx.store.inventory_count().await, 0);
    }

    #[tokio::test]
    async fn test_authentication_success_persists() {
        let fx = fixture(true).await;
        let mut rx = client(&fx.ctx, 4000, TransportKind::Raw);

        fx.mux
            .handle(DeviceEvent::AuthenticationSuccess {
                user: "alice".to_string(),
                access: AccessType::Fingerprint,
            })
            .await;

        assert_eq!(
            rx.try_recv().unwrap().fields(),
            &["AUTHENTICATION_SUCCESS", "alice", "FINGERPRINT"]
        );
        let records = fx.store.authentications().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user, "alice");
    }

    #[tokio::test]
    async fn test_disconnect_broadcasts_and_clears_handle() {
        let fx = fixture(true).await;
        let mut rx = client(&fx.ctx, 4000, TransportKind::Raw);

        fx.mux.handle(DeviceEvent::Disconnected).await;

        assert_eq!(rx.try_recv().unwrap().fields(), &["DEVICE_DISCONNECTED"]);
        assert!(!fx.ctx.lifecycle.is_connected().await);
    }

    #[tokio::test]
    async fn test_disconnect_while_suspended_does_not_reconnect() {
        let fx = fixture(true).await;
        fx.ctx.lifecycle.suspend().await;
        let opens_before = fx.driver.open_calls();

        fx.mux.handle(DeviceEvent::Disconnected).await;
        // Give any (incorrectly) spawned reconnect a chance to run.
        tokio::task::yield_now().await;

        assert_eq!(fx.driver.open_calls(), opens_before);
    }

    #[tokio::test]
    async fn test_module_events_are_not_broadcast() {
        let fx = fixture(true).await;
        let mut rx = client(&fx.ctx, 4000, TransportKind::Raw);

        fx.mux
            .handle(DeviceEvent::ModuleAttached(ModuleKind::BadgeReader))
            .await;
        fx.mux
            .handle(DeviceEvent::ModuleDetached(ModuleKind::TemperatureProbe))
            .await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_door_and_temperature_events() {
        let fx = fixture(true).await;
        let mut rx = client(&fx.ctx, 4000, TransportKind::Raw);

        fx.mux
            .handle(DeviceEvent::DoorStateChanged { open: true })
            .await;
        assert_eq!(rx.try_recv().unwrap().fields(), &["DOOR_STATE", "open"]);

        fx.mux.handle(DeviceEvent::TemperatureReading(18.04)).await;
        assert_eq!(rx.try_recv().unwrap().fields(), &["TEMPERATURE", "18.0"]);
    }
}
