//! Hardware event definitions.
//!
//! Every callback the controller can raise is one variant of the closed
//! [`DeviceEvent`] enum, delivered through a single mpsc channel whose
//! sender is handed to the driver at `open()` time. The event multiplexer
//! in the server crate is one `match` over this set; there is no wide
//! listener interface with unused methods.

use smartgate_core::{AccessType, InventorySnapshot, ModuleKind};

/// One hardware-originated event.
///
/// Variants map 1:1 onto broadcast protocol messages, except the module
/// attach/detach pair which is operationally informative only and is
/// logged without a broadcast.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// The hardware link dropped unexpectedly.
    ///
    /// Clears the controller handle; triggers a reconnect cycle unless
    /// the lifecycle is suspended for the serial bridge.
    Disconnected,

    /// An inventory scan finished.
    ScanCompleted(InventorySnapshot),

    /// A user authenticated successfully at the device.
    AuthenticationSuccess {
        /// User identifier reported by the device.
        user: String,
        /// Credential kind used.
        access: AccessType,
    },

    /// An authentication attempt was rejected.
    AuthenticationFailure {
        /// Device-reported rejection reason.
        reason: String,
    },

    /// Temperature probe reading in degrees Celsius.
    TemperatureReading(f32),

    /// The cabinet door opened or closed.
    DoorStateChanged {
        /// `true` when the door is open.
        open: bool,
    },

    /// A peripheral module came up. Logged only, not broadcast.
    ModuleAttached(ModuleKind),

    /// A peripheral module went away. Logged only, not broadcast.
    ModuleDetached(ModuleKind),
}

impl DeviceEvent {
    /// Short variant name for log lines.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DeviceEvent::Disconnected => "disconnected",
            DeviceEvent::ScanCompleted(_) => "scan_completed",
            DeviceEvent::AuthenticationSuccess { .. } => "authentication_success",
            DeviceEvent::AuthenticationFailure { .. } => "authentication_failure",
            DeviceEvent::TemperatureReading(_) => "temperature_reading",
            DeviceEvent::DoorStateChanged { .. } => "door_state_changed",
            DeviceEvent::ModuleAttached(_) => "module_attached",
            DeviceEvent::ModuleDetached(_) => "module_detached",
        }
    }
}
