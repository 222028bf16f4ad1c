//! Device connection lifecycle.
//!
//! `DeviceLifecycle` owns the single controller handle behind one mutex:
//! connect, disconnect, and reconnect are mutually exclusive, so
//! concurrent callers can never construct two handles or race a
//! disconnect against a connect.
//!
//! # States
//!
//! ```text
//! Absent ──connect──> Connecting ──ok──> Ready
//!   ^                     │                │ unexpected disconnect
//!   │                     └──fail──> Absent┘ (reconnect cycle)
//!   │
//!   └──resume── Suspended <──suspend── (serial bridge engaged)
//! ```
//!
//! `Suspended` is the explicit serial-bridge state: the port is ceded to
//! the external forwarder, a hardware disconnect is expected there, and
//! no reconnect cycle may start until the bridge is released.
//!
//! # Blocking Contract
//!
//! Discovery, construction, and module bring-up are blocking hardware
//! calls; the reconnect pauses are genuine delays. Reconnect cycles are
//! therefore always spawned onto a dedicated worker task by the event
//! multiplexer, never run on a connection's I/O task.

use crate::events::DeviceEvent;
use crate::traits::{AnyController, AnyDriver, Controller, ControllerDriver};
use smartgate_core::{
    DeviceDescriptor, DeviceProfile, Error, LinkState, ReaderRole, Result,
    constants::{RECONNECT_ATTEMPTS, RECONNECT_PAUSE_MS},
};
use std::sync::RwLock;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Slot {
    controller: Option<AnyController>,
    state: LinkState,
}

/// Owner of the single device handle.
///
/// All other components borrow the controller through
/// [`with_controller`](DeviceLifecycle::with_controller), which reports
/// `DeviceUnavailable` instead of exposing an optional handle.
pub struct DeviceLifecycle {
    driver: AnyDriver,
    slot: Mutex<Slot>,
    profile: RwLock<DeviceProfile>,
    events_tx: mpsc::Sender<DeviceEvent>,
}

impl DeviceLifecycle {
    /// Create a lifecycle bound to a driver and the event listener
    /// channel handed to every opened controller.
    pub fn new(driver: AnyDriver, events_tx: mpsc::Sender<DeviceEvent>) -> Self {
        Self {
            driver,
            slot: Mutex::new(Slot {
                controller: None,
                state: LinkState::Absent,
            }),
            profile: RwLock::new(DeviceProfile::default()),
            events_tx,
        }
    }

    /// Replace the peripheral profile used by module bring-up.
    pub fn set_profile(&self, profile: DeviceProfile) {
        *self.profile.write().expect("profile lock poisoned") = profile;
    }

    /// Current link state.
    pub async fn state(&self) -> LinkState {
        self.slot.lock().await.state
    }

    /// Whether a controller handle is live.
    pub async fn is_connected(&self) -> bool {
        self.slot.lock().await.controller.is_some()
    }

    /// Identity of the connected device, if any.
    pub async fn descriptor(&self) -> Option<DeviceDescriptor> {
        self.slot
            .lock()
            .await
            .controller
            .as_ref()
            .map(|c| c.descriptor().clone())
    }

    /// Run an operation against the connected controller.
    ///
    /// # Errors
    /// Returns `Error::DeviceUnavailable` when no controller is
    /// connected; otherwise propagates the operation's result.
    pub async fn with_controller<R>(
        &self,
        op: impl AsyncFnOnce(&mut AnyController) -> Result<R>,
    ) -> Result<R> {
        let mut slot = self.slot.lock().await;
        match slot.controller.as_mut() {
            Some(controller) => op(controller).await,
            None => Err(Error::DeviceUnavailable),
        }
    }

    /// Discover and construct the device.
    ///
    /// No-op success when already connected (the existing listener stays
    /// the only one). Requires exactly one discovered candidate;
    /// ambiguous or absent hardware leaves the handle empty.
    ///
    /// # Errors
    /// - `Error::ConnectionFailed` while the port is ceded to the bridge
    /// - `Error::DiscoveryAmbiguous` when candidates != 1
    /// - construction errors from the driver
    pub async fn connect(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;

        if slot.controller.is_some() {
            return Ok(());
        }
        if slot.state == LinkState::Suspended {
            return Err(Error::ConnectionFailed(
                "serial port ceded to bridge forwarder".to_string(),
            ));
        }

        slot.state = LinkState::Connecting;

        let candidates = match self.driver.discover().await {
            Ok(candidates) => candidates,
            Err(e) => {
                slot.state = LinkState::Absent;
                warn!(error = %e, "Device discovery failed");
                return Err(e);
            }
        };

        if candidates.len() != 1 {
            slot.state = LinkState::Absent;
            warn!(
                found = candidates.len(),
                "Device discovery did not find exactly one candidate"
            );
            return Err(Error::DiscoveryAmbiguous {
                found: candidates.len(),
            });
        }

        match self.driver.open(&candidates[0], self.events_tx.clone()).await {
            Ok(controller) => {
                info!(
                    port = %candidates[0].path,
                    serial = %controller.descriptor().serial_number,
                    "Device connected"
                );
                slot.controller = Some(controller);
                slot.state = LinkState::Ready;
                Ok(())
            }
            Err(e) => {
                slot.state = LinkState::Absent;
                warn!(port = %candidates[0].path, error = %e, "Device construction failed");
                Err(e)
            }
        }
    }

    /// Release the controller and clear the handle. Idempotent.
    pub async fn disconnect(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(mut controller) = slot.controller.take() {
            if let Err(e) = controller.release().await {
                warn!(error = %e, "Device release failed");
            }
            info!("Device disconnected");
        }
        if slot.state != LinkState::Suspended {
            slot.state = LinkState::Absent;
        }
    }

    /// Attach every peripheral named by the current profile.
    ///
    /// Each attach failure is logged as a warning and does not abort the
    /// others; partial peripheral availability is an accepted degraded
    /// state.
    ///
    /// # Errors
    /// Returns `Error::DeviceUnavailable` when no controller is
    /// connected.
    pub async fn attach_modules(&self) -> Result<()> {
        let profile = self.profile.read().expect("profile lock poisoned").clone();

        let mut slot = self.slot.lock().await;
        let Some(controller) = slot.controller.as_mut() else {
            return Err(Error::DeviceUnavailable);
        };

        for index in 0..profile.badge_readers {
            if let Err(e) = controller.attach_badge_reader(index).await {
                warn!(index, error = %e, "Badge reader attach failed");
            }
        }

        if let Some(reader_id) = &profile.master_reader_id {
            if let Err(e) = controller
                .attach_fingerprint_reader(reader_id, ReaderRole::Master)
                .await
            {
                warn!(reader_id, error = %e, "Master fingerprint reader attach failed");
            }
        }
        for reader_id in &profile.slave_reader_ids {
            if let Err(e) = controller
                .attach_fingerprint_reader(reader_id, ReaderRole::Slave)
                .await
            {
                warn!(reader_id, error = %e, "Slave fingerprint reader attach failed");
            }
        }

        if profile.temperature_probe {
            if let Err(e) = controller.attach_temperature_probe().await {
                warn!(error = %e, "Temperature probe attach failed");
            }
        }

        Ok(())
    }

    /// Retry `connect()` with a fixed pause between attempts, re-running
    /// module bring-up after each success.
    ///
    /// Returns `true` on the first successful connect, `false` when all
    /// attempts are exhausted. Must run on a worker task.
    pub async fn reconnect(&self) -> bool {
        for attempt in 1..=RECONNECT_ATTEMPTS {
            match self.connect().await {
                Ok(()) => {
                    if let Err(e) = self.attach_modules().await {
                        warn!(error = %e, "Module bring-up after reconnect failed");
                    }
                    info!(attempt, "Reconnect succeeded");
                    return true;
                }
                Err(e) => {
                    debug!(attempt, error = %e, "Reconnect attempt failed");
                }
            }

            if attempt < RECONNECT_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(RECONNECT_PAUSE_MS)).await;
            }
        }

        warn!(
            attempts = RECONNECT_ATTEMPTS,
            "Reconnect exhausted all attempts"
        );
        false
    }

    /// React to an unexpected hardware disconnect callback.
    ///
    /// Clears the handle (the link is already dead, so no release is
    /// attempted) and reports whether a reconnect cycle should start:
    /// `false` while the lifecycle is suspended for the serial bridge.
    pub async fn on_unexpected_disconnect(&self) -> bool {
        let mut slot = self.slot.lock().await;
        slot.controller = None;

        if slot.state == LinkState::Suspended {
            debug!("Disconnect during bridge forwarding, expected");
            false
        } else {
            slot.state = LinkState::Absent;
            true
        }
    }

    /// Cede the serial port: release the controller and enter
    /// `Suspended`.
    pub async fn suspend(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(mut controller) = slot.controller.take() {
            if let Err(e) = controller.release().await {
                warn!(error = %e, "Device release failed during suspension");
            }
        }
        slot.state = LinkState::Suspended;
        info!("Device lifecycle suspended for serial bridge");
    }

    /// Leave `Suspended`; the caller reconnects afterwards.
    pub async fn resume(&self) {
        let mut slot = self.slot.lock().await;
        if slot.state == LinkState::Suspended {
            slot.state = LinkState::Absent;
            info!("Device lifecycle resumed from serial bridge");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use smartgate_core::ModuleKind;

    fn lifecycle_with(driver: &MockDriver) -> (DeviceLifecycle, mpsc::Receiver<DeviceEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (DeviceLifecycle::new(AnyDriver::Mock(driver.clone()), tx), rx)
    }

    #[tokio::test]
    async fn test_connect_happy_path() {
        let driver = MockDriver::new();
        let (lifecycle, _rx) = lifecycle_with(&driver);

        lifecycle.connect().await.unwrap();
        assert!(lifecycle.is_connected().await);
        assert_eq!(lifecycle.state().await, LinkState::Ready);

        let descriptor = lifecycle.descriptor().await.unwrap();
        assert_eq!(descriptor.serial_number, "AA770201");
    }

    #[tokio::test]
    async fn test_connect_is_noop_when_connected() {
        let driver = MockDriver::new();
        let (lifecycle, _rx) = lifecycle_with(&driver);

        lifecycle.connect().await.unwrap();
        lifecycle.connect().await.unwrap();

        // A second listener must not be attached.
        assert_eq!(driver.open_calls(), 1);
    }

    #[tokio::test]
    async fn test_connect_no_candidates() {
        let driver = MockDriver::new();
        driver.set_candidates(vec![]);
        let (lifecycle, _rx) = lifecycle_with(&driver);

        let result = lifecycle.connect().await;
        assert!(matches!(result, Err(Error::DiscoveryAmbiguous { found: 0 })));
        assert!(!lifecycle.is_connected().await);
        assert_eq!(lifecycle.state().await, LinkState::Absent);
    }

    #[tokio::test]
    async fn test_connect_ambiguous_candidates() {
        let driver = MockDriver::new();
        driver.set_candidates(vec![
            crate::traits::PortCandidate::new("/dev/ttyUSB0", "a"),
            crate::traits::PortCandidate::new("/dev/ttyUSB1", "b"),
        ]);
        let (lifecycle, _rx) = lifecycle_with(&driver);

        let result = lifecycle.connect().await;
        assert!(matches!(result, Err(Error::DiscoveryAmbiguous { found: 2 })));
        assert!(!lifecycle.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_construction_failure() {
        let driver = MockDriver::new();
        driver.fail_next_opens(1);
        let (lifecycle, _rx) = lifecycle_with(&driver);

        assert!(lifecycle.connect().await.is_err());
        assert!(!lifecycle.is_connected().await);
        assert_eq!(lifecycle.state().await, LinkState::Absent);
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let driver = MockDriver::new();
        let (lifecycle, _rx) = lifecycle_with(&driver);

        lifecycle.connect().await.unwrap();
        lifecycle.disconnect().await;
        lifecycle.disconnect().await;

        assert_eq!(driver.release_calls(), 1);
        assert_eq!(lifecycle.state().await, LinkState::Absent);
    }

    #[tokio::test]
    async fn test_with_controller_unavailable() {
        let driver = MockDriver::new();
        let (lifecycle, _rx) = lifecycle_with(&driver);

        let result = lifecycle
            .with_controller(async |c| c.start_scan().await)
            .await;
        assert!(matches!(result, Err(Error::DeviceUnavailable)));
    }

    #[tokio::test]
    async fn test_attach_modules_partial_failure() {
        let driver = MockDriver::new();
        driver.fail_module(ModuleKind::TemperatureProbe);
        let (lifecycle, _rx) = lifecycle_with(&driver);
        lifecycle.set_profile(DeviceProfile {
            master_reader_id: Some("FPR-01".to_string()),
            slave_reader_ids: vec![],
            badge_readers: 2,
            temperature_probe: true,
        });

        lifecycle.connect().await.unwrap();
        lifecycle.attach_modules().await.unwrap();

        let ops = driver.operations();
        assert!(ops.contains(&"attach_badge_reader:0".to_string()));
        assert!(ops.contains(&"attach_badge_reader:1".to_string()));
        assert!(ops.contains(&"attach_fingerprint_reader:FPR-01:master".to_string()));
        assert!(!ops.contains(&"attach_temperature_probe".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_exhausts_attempts() {
        let driver = MockDriver::new();
        driver.set_candidates(vec![]);
        let (lifecycle, _rx) = lifecycle_with(&driver);

        let started = tokio::time::Instant::now();
        let recovered = lifecycle.reconnect().await;

        assert!(!recovered);
        assert_eq!(driver.discover_calls(), 5);
        // Four pauses of 3 s between five attempts.
        assert_eq!(started.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_succeeds_and_attaches_modules() {
        let driver = MockDriver::new();
        driver.fail_next_opens(2);
        let (lifecycle, _rx) = lifecycle_with(&driver);
        lifecycle.set_profile(DeviceProfile {
            badge_readers: 1,
            ..DeviceProfile::default()
        });

        assert!(lifecycle.reconnect().await);
        assert_eq!(driver.open_calls(), 1);
        assert_eq!(driver.discover_calls(), 3);
        assert!(
            driver
                .operations()
                .contains(&"attach_badge_reader:0".to_string())
        );
    }

    #[tokio::test]
    async fn test_suspend_blocks_connect_and_reconnect_decision() {
        let driver = MockDriver::new();
        let (lifecycle, _rx) = lifecycle_with(&driver);

        lifecycle.connect().await.unwrap();
        lifecycle.suspend().await;

        assert_eq!(lifecycle.state().await, LinkState::Suspended);
        assert_eq!(driver.release_calls(), 1);
        assert!(lifecycle.connect().await.is_err());

        // A disconnect callback during forwarding is expected and must
        // not trigger a reconnect cycle.
        assert!(!lifecycle.on_unexpected_disconnect().await);

        lifecycle.resume().await;
        assert_eq!(lifecycle.state().await, LinkState::Absent);
        lifecycle.connect().await.unwrap();
        assert!(lifecycle.is_connected().await);
    }

    #[tokio::test]
    async fn test_unexpected_disconnect_requests_reconnect() {
        let driver = MockDriver::new();
        let (lifecycle, _rx) = lifecycle_with(&driver);

        lifecycle.connect().await.unwrap();
        assert!(lifecycle.on_unexpected_disconnect().await);
        assert!(!lifecycle.is_connected().await);
        assert_eq!(lifecycle.state().await, LinkState::Absent);
    }
}
