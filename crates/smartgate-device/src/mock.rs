//! Mock hardware driver for testing and development.
//!
//! The mock driver is scriptable: tests choose the discovery result,
//! inject open and module-attach failures, emit hardware events as if
//! the device raised them, and inspect the operations the gateway
//! performed. Clones share state, so the clone handed to the lifecycle
//! can still be scripted by the test that created it.
//!
//! # Examples
//!
//! ```
//! use smartgate_device::{ControllerDriver, MockDriver};
//! use tokio::sync::mpsc;
//!
//! # #[tokio::main]
//! # async fn main() -> smartgate_core::Result<()> {
//! let driver = MockDriver::new();
//! let (tx, _rx) = mpsc::channel(8);
//!
//! let candidates = driver.discover().await?;
//! assert_eq!(candidates.len(), 1);
//!
//! let controller = driver.open(&candidates[0], tx).await?;
//! # let _ = controller;
//! # Ok(())
//! # }
//! ```

use crate::events::DeviceEvent;
use crate::traits::{AnyController, Controller, ControllerDriver, PortCandidate};
use smartgate_core::{
    DeviceDescriptor, DeviceModel, Error, ModuleKind, ReaderRole, Result, TagUid,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug)]
struct MockState {
    candidates: Vec<PortCandidate>,
    descriptor: DeviceDescriptor,
    open_failures_remaining: u32,
    failing_modules: HashSet<ModuleKind>,
    temperature: f32,
    discover_calls: u32,
    open_calls: u32,
    release_calls: u32,
    operations: Vec<String>,
    events_tx: Option<mpsc::Sender<DeviceEvent>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            candidates: vec![PortCandidate::new("/dev/ttyUSB0", "Smartboard controller")],
            descriptor: DeviceDescriptor {
                port: "/dev/ttyUSB0".to_string(),
                serial_number: "AA770201".to_string(),
                model: DeviceModel::Smartboard,
                hardware_version: "1".to_string(),
                software_version: "3.58".to_string(),
            },
            open_failures_remaining: 0,
            failing_modules: HashSet::new(),
            temperature: 21.5,
            discover_calls: 0,
            open_calls: 0,
            release_calls: 0,
            operations: Vec::new(),
            events_tx: None,
        }
    }
}

/// Scriptable mock driver.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Create a driver with one discoverable candidate and the default
    /// Smartboard identity (serial "AA770201", hw "1", sw "3.58").
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the discovery result.
    pub fn set_candidates(&self, candidates: Vec<PortCandidate>) {
        self.state.lock().unwrap().candidates = candidates;
    }

    /// Replace the identity reported by opened controllers.
    pub fn set_descriptor(&self, descriptor: DeviceDescriptor) {
        self.state.lock().unwrap().descriptor = descriptor;
    }

    /// Make the next `n` open calls fail.
    pub fn fail_next_opens(&self, n: u32) {
        self.state.lock().unwrap().open_failures_remaining = n;
    }

    /// Make attach calls for the given module kind fail.
    pub fn fail_module(&self, kind: ModuleKind) {
        self.state.lock().unwrap().failing_modules.insert(kind);
    }

    /// Set the temperature reported by `read_temperature`.
    pub fn set_temperature(&self, celsius: f32) {
        self.state.lock().unwrap().temperature = celsius;
    }

    /// Number of discovery calls observed.
    pub fn discover_calls(&self) -> u32 {
        self.state.lock().unwrap().discover_calls
    }

    /// Number of successful open calls observed.
    pub fn open_calls(&self) -> u32 {
        self.state.lock().unwrap().open_calls
    }

    /// Number of release calls observed.
    pub fn release_calls(&self) -> u32 {
        self.state.lock().unwrap().release_calls
    }

    /// Operations performed against opened controllers, in order.
    pub fn operations(&self) -> Vec<String> {
        self.state.lock().unwrap().operations.clone()
    }

    /// Emit a hardware event through the most recently opened
    /// controller's listener channel.
    ///
    /// # Errors
    /// Returns `Error::Hardware` when no controller was opened yet or
    /// the listener is gone.
    pub async fn emit(&self, event: DeviceEvent) -> Result<()> {
        let tx = self
            .state
            .lock()
            .unwrap()
            .events_tx
            .clone()
            .ok_or_else(|| Error::Hardware("no controller open".to_string()))?;

        tx.send(event)
            .await
            .map_err(|_| Error::Hardware("event listener dropped".to_string()))
    }

    fn record(&self, op: impl Into<String>) {
        self.state.lock().unwrap().operations.push(op.into());
    }

    fn module_fails(&self, kind: ModuleKind) -> bool {
        self.state.lock().unwrap().failing_modules.contains(&kind)
    }
}

impl ControllerDriver for MockDriver {
    async fn discover(&self) -> Result<Vec<PortCandidate>> {
        let mut state = self.state.lock().unwrap();
        state.discover_calls += 1;
        Ok(state.candidates.clone())
    }

    async fn open(
        &self,
        candidate: &PortCandidate,
        events: mpsc::Sender<DeviceEvent>,
    ) -> Result<AnyController> {
        let descriptor = {
            let mut state = self.state.lock().unwrap();
            if state.open_failures_remaining > 0 {
                state.open_failures_remaining -= 1;
                return Err(Error::ConnectionFailed(format!(
                    "mock open failure on {}",
                    candidate.path
                )));
            }
            state.open_calls += 1;
            state.events_tx = Some(events);
            let mut descriptor = state.descriptor.clone();
            descriptor.port = candidate.path.clone();
            descriptor
        };

        Ok(AnyController::Mock(MockController {
            descriptor,
            driver: self.clone(),
            released: false,
        }))
    }
}

/// Mock controller handle produced by [`MockDriver::open`].
#[derive(Debug)]
pub struct MockController {
    descriptor: DeviceDescriptor,
    driver: MockDriver,
    released: bool,
}

impl MockController {
    fn ensure_live(&self) -> Result<()> {
        if self.released {
            return Err(Error::Hardware("controller released".to_string()));
        }
        Ok(())
    }
}

impl Controller for MockController {
    fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    async fn attach_badge_reader(&mut self, index: u8) -> Result<()> {
        self.ensure_live()?;
        if self.driver.module_fails(ModuleKind::BadgeReader) {
            return Err(Error::ModuleAttach {
                module: ModuleKind::BadgeReader.to_string(),
                reason: "mock attach failure".to_string(),
            });
        }
        self.driver.record(format!("attach_badge_reader:{index}"));
        Ok(())
    }

    async fn attach_fingerprint_reader(
        &mut self,
        reader_id: &str,
        role: ReaderRole,
    ) -> Result<()> {
        self.ensure_live()?;
        if self.driver.module_fails(ModuleKind::FingerprintReader) {
            return Err(Error::ModuleAttach {
                module: ModuleKind::FingerprintReader.to_string(),
                reason: "mock attach failure".to_string(),
            });
        }
        self.driver
            .record(format!("attach_fingerprint_reader:{reader_id}:{role}"));
        Ok(())
    }

    async fn attach_temperature_probe(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.driver.module_fails(ModuleKind::TemperatureProbe) {
            return Err(Error::ModuleAttach {
                module: ModuleKind::TemperatureProbe.to_string(),
                reason: "mock attach failure".to_string(),
            });
        }
        self.driver.record("attach_temperature_probe");
        Ok(())
    }

    async fn start_scan(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.driver.record("start_scan");
        Ok(())
    }

    async fn stop_scan(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.driver.record("stop_scan");
        Ok(())
    }

    async fn open_door(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.driver.record("open_door");
        Ok(())
    }

    async fn read_temperature(&mut self) -> Result<f32> {
        self.ensure_live()?;
        self.driver.record("read_temperature");
        Ok(self.driver.state.lock().unwrap().temperature)
    }

    async fn rewrite_tag(&mut self, current: &TagUid, replacement: &TagUid) -> Result<()> {
        self.ensure_live()?;
        self.driver
            .record(format!("rewrite_tag:{current}:{replacement}"));
        Ok(())
    }

    async fn enroll_fingerprint(&mut self, user: &str) -> Result<()> {
        self.ensure_live()?;
        self.driver.record(format!("enroll_fingerprint:{user}"));
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            self.driver.state.lock().unwrap().release_calls += 1;
        }
        Ok(())
    }
}
