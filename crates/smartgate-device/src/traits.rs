//! Hardware driver trait definitions.
//!
//! These traits are the seam between the gateway and the vendor SDK. A
//! [`ControllerDriver`] enumerates candidate hardware and constructs a
//! [`Controller`] bound to one port; the controller exposes the
//! operations commands dispatch against and raises [`DeviceEvent`]s on
//! the channel it was opened with.
//!
//! All traits use native `async fn` methods (Edition 2024 RPITIT), so
//! they are not object-safe; the [`AnyDriver`]/[`AnyController`] enum
//! wrappers provide concrete type dispatch, following the same pattern
//! as the store port.

use crate::events::DeviceEvent;
use crate::mock::{MockController, MockDriver};
use smartgate_core::{DeviceDescriptor, ReaderRole, Result, TagUid};
use tokio::sync::mpsc;

/// One discoverable hardware attachment point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// OS path of the serial port, e.g. `/dev/ttyUSB0`.
    pub path: String,
    /// Human-readable description from enumeration.
    pub description: String,
}

impl PortCandidate {
    pub fn new(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
        }
    }
}

/// Discovery and construction of hardware controllers.
pub trait ControllerDriver: Send + Sync {
    /// Enumerate currently plugged candidate devices.
    ///
    /// # Errors
    /// Returns an error when enumeration itself fails; an empty list is
    /// not an error at this layer (the lifecycle enforces the
    /// exactly-one rule).
    async fn discover(&self) -> Result<Vec<PortCandidate>>;

    /// Construct a controller bound to the given port.
    ///
    /// The supplied sender becomes the controller's sole event listener
    /// for its whole lifetime.
    ///
    /// # Errors
    /// Returns an error when the port cannot be opened or the device
    /// does not identify itself.
    async fn open(
        &self,
        candidate: &PortCandidate,
        events: mpsc::Sender<DeviceEvent>,
    ) -> Result<AnyController>;
}

/// A live hardware controller handle.
///
/// At most one instance exists process-wide; it is exclusively owned by
/// the device lifecycle and borrowed by command handlers through the
/// lifecycle's accessor.
pub trait Controller: Send + Sync {
    /// Identity captured at construction time.
    fn descriptor(&self) -> &DeviceDescriptor;

    /// Attach a badge reader by index.
    ///
    /// # Errors
    /// Returns an error when the reader does not respond; module attach
    /// failures are non-fatal for bring-up.
    async fn attach_badge_reader(&mut self, index: u8) -> Result<()>;

    /// Attach a fingerprint reader by identifier and role.
    ///
    /// # Errors
    /// Returns an error when the reader does not respond.
    async fn attach_fingerprint_reader(&mut self, reader_id: &str, role: ReaderRole)
    -> Result<()>;

    /// Attach the temperature probe.
    ///
    /// # Errors
    /// Returns an error when the probe does not respond.
    async fn attach_temperature_probe(&mut self) -> Result<()>;

    /// Start an inventory scan.
    ///
    /// Completion is reported asynchronously via
    /// [`DeviceEvent::ScanCompleted`].
    async fn start_scan(&mut self) -> Result<()>;

    /// Stop a running inventory scan.
    async fn stop_scan(&mut self) -> Result<()>;

    /// Unlock the cabinet door.
    async fn open_door(&mut self) -> Result<()>;

    /// Read the temperature probe once, in degrees Celsius.
    async fn read_temperature(&mut self) -> Result<f32>;

    /// Rewrite an RFID tag UID.
    async fn rewrite_tag(&mut self, current: &TagUid, replacement: &TagUid) -> Result<()>;

    /// Capture and store a fingerprint template for a user.
    async fn enroll_fingerprint(&mut self, user: &str) -> Result<()>;

    /// Release hardware resources. Idempotent.
    async fn release(&mut self) -> Result<()>;
}

/// Enum wrapper for driver dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyDriver {
    /// Mock driver for development and testing.
    Mock(MockDriver),
    // Planned variants behind feature flags:
    // - Serial(SerialDriver) - vendor SDK over a serial port
}

impl ControllerDriver for AnyDriver {
    async fn discover(&self) -> Result<Vec<PortCandidate>> {
        match self {
            Self::Mock(driver) => driver.discover().await,
        }
    }

    async fn open(
        &self,
        candidate: &PortCandidate,
        events: mpsc::Sender<DeviceEvent>,
    ) -> Result<AnyController> {
        match self {
            Self::Mock(driver) => driver.open(candidate, events).await,
        }
    }
}

/// Enum wrapper for controller dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyController {
    /// Mock controller for development and testing.
    Mock(MockController),
}

impl Controller for AnyController {
    fn descriptor(&self) -> &DeviceDescriptor {
        match self {
            Self::Mock(controller) => controller.descriptor(),
        }
    }

    async fn attach_badge_reader(&mut self, index: u8) -> Result<()> {
        match self {
            Self::Mock(controller) => controller.attach_badge_reader(index).await,
        }
    }

    async fn attach_fingerprint_reader(
        &mut self,
        reader_id: &str,
        role: ReaderRole,
    ) -> Result<()> {
        match self {
            Self::Mock(controller) => controller.attach_fingerprint_reader(reader_id, role).await,
        }
    }

    async fn attach_temperature_probe(&mut self) -> Result<()> {
        match self {
            Self::Mock(controller) => controller.attach_temperature_probe().await,
        }
    }

    async fn start_scan(&mut self) -> Result<()> {
        match self {
            Self::Mock(controller) => controller.start_scan().await,
        }
    }

    async fn stop_scan(&mut self) -> Result<()> {
        match self {
            Self::Mock(controller) => controller.stop_scan().await,
        }
    }

    async fn open_door(&mut self) -> Result<()> {
        match self {
            Self::Mock(controller) => controller.open_door().await,
        }
    }

    async fn read_temperature(&mut self) -> Result<f32> {
        match self {
            Self::Mock(controller) => controller.read_temperature().await,
        }
    }

    async fn rewrite_tag(&mut self, current: &TagUid, replacement: &TagUid) -> Result<()> {
        match self {
            Self::Mock(controller) => controller.rewrite_tag(current, replacement).await,
        }
    }

    async fn enroll_fingerprint(&mut self, user: &str) -> Result<()> {
        match self {
            Self::Mock(controller) => controller.enroll_fingerprint(user).await,
        }
    }

    async fn release(&mut self) -> Result<()> {
        match self {
            Self::Mock(controller) => controller.release().await,
        }
    }
}
