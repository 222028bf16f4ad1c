//! Device lifecycle, driver abstraction, and serial-bridge control.
//!
//! This crate owns the single hardware controller handle: discovery,
//! connect/disconnect/reconnect, peripheral bring-up, and the handoff of
//! the serial port to an external forwarding process. The hardware SDK
//! itself is out of scope; the [`traits`] module is the seam, and the
//! [`mock`] driver is the in-tree implementation used by the default
//! binary and the test-suite.

#![allow(async_fn_in_trait)]

pub mod bridge;
pub mod events;
pub mod lifecycle;
pub mod mock;
pub mod traits;

pub use bridge::{BridgeConfig, SerialBridge};
pub use events::DeviceEvent;
pub use lifecycle::DeviceLifecycle;
pub use mock::MockDriver;
pub use traits::{AnyController, AnyDriver, Controller, ControllerDriver, PortCandidate};
