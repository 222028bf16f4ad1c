//! Request and event code definitions for the gateway protocol.
//!
//! Clients issue commands (field 0 = command code); the gateway pushes
//! hardware-originated events (field 0 = event code) to every connected
//! client. Both directions share the same wire framing.
//!
//! # Command Categories
//!
//! ## Session
//! - `ADMIN_SIGN_IN` / `ADMIN_SIGN_OUT`: administrator privilege for the
//!   calling connection
//!
//! ## Device Operations
//! - `INITIALIZATION`: report device identity (serial, model, versions)
//! - `START_SCAN` / `STOP_SCAN`: inventory scan control
//! - `OPEN_DOOR`: unlock the cabinet door
//! - `READ_TEMPERATURE`: one-shot probe reading
//! - `REWRITE_TAG`: rewrite an RFID tag UID
//! - `ENROLL_FINGERPRINT`: capture a fingerprint template for a user
//!
//! ## Administration
//! - `ADD_USER` / `REMOVE_USER`: user management leaves
//! - `SERIAL_BRIDGE`: cede/reclaim the serial port to the external
//!   forwarding process
//!
//! # Wire Format Example
//!
//! ```text
//! ADMIN_SIGN_IN;secret<LF>
//! ^^^^^^^^^^^^^ command code
//! ```

use serde::{Deserialize, Serialize};
use smartgate_core::{Error, Result};

/// Client-issued command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandCode {
    /// Report device identity: `[INITIALIZATION, serial, model, hw, sw]`.
    Initialization,
    /// Authenticate the calling connection as administrator.
    AdminSignIn,
    /// Drop administrator privilege for the calling connection.
    AdminSignOut,
    /// Start an inventory scan.
    StartScan,
    /// Stop a running inventory scan.
    StopScan,
    /// Unlock the cabinet door.
    OpenDoor,
    /// Read the temperature probe.
    ReadTemperature,
    /// Register a user.
    AddUser,
    /// Remove a user.
    RemoveUser,
    /// Rewrite an RFID tag UID.
    RewriteTag,
    /// Enroll a fingerprint for a user.
    EnrollFingerprint,
    /// Toggle the serial-bridge forwarder.
    SerialBridge,
}

impl CommandCode {
    /// All command codes, in registration order.
    pub const ALL: [CommandCode; 12] = [
        CommandCode::Initialization,
        CommandCode::AdminSignIn,
        CommandCode::AdminSignOut,
        CommandCode::StartScan,
        CommandCode::StopScan,
        CommandCode::OpenDoor,
        CommandCode::ReadTemperature,
        CommandCode::AddUser,
        CommandCode::RemoveUser,
        CommandCode::RewriteTag,
        CommandCode::EnrollFingerprint,
        CommandCode::SerialBridge,
    ];

    /// Wire representation of the command code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandCode::Initialization => "INITIALIZATION",
            CommandCode::AdminSignIn => "ADMIN_SIGN_IN",
            CommandCode::AdminSignOut => "ADMIN_SIGN_OUT",
            CommandCode::StartScan => "START_SCAN",
            CommandCode::StopScan => "STOP_SCAN",
            CommandCode::OpenDoor => "OPEN_DOOR",
            CommandCode::ReadTemperature => "READ_TEMPERATURE",
            CommandCode::AddUser => "ADD_USER",
            CommandCode::RemoveUser => "REMOVE_USER",
            CommandCode::RewriteTag => "REWRITE_TAG",
            CommandCode::EnrollFingerprint => "ENROLL_FINGERPRINT",
            CommandCode::SerialBridge => "SERIAL_BRIDGE",
        }
    }

    /// Parse a wire string into a command code.
    ///
    /// # Errors
    /// Returns `Error::UnknownRequestCode` for unrecognized strings; the
    /// dispatch engine logs these and drops the request without a
    /// response.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "INITIALIZATION" => Ok(CommandCode::Initialization),
            "ADMIN_SIGN_IN" => Ok(CommandCode::AdminSignIn),
            "ADMIN_SIGN_OUT" => Ok(CommandCode::AdminSignOut),
            "START_SCAN" => Ok(CommandCode::StartScan),
            "STOP_SCAN" => Ok(CommandCode::StopScan),
            "OPEN_DOOR" => Ok(CommandCode::OpenDoor),
            "READ_TEMPERATURE" => Ok(CommandCode::ReadTemperature),
            "ADD_USER" => Ok(CommandCode::AddUser),
            "REMOVE_USER" => Ok(CommandCode::RemoveUser),
            "REWRITE_TAG" => Ok(CommandCode::RewriteTag),
            "ENROLL_FINGERPRINT" => Ok(CommandCode::EnrollFingerprint),
            "SERIAL_BRIDGE" => Ok(CommandCode::SerialBridge),
            other => Err(Error::UnknownRequestCode(other.to_string())),
        }
    }
}

impl std::fmt::Display for CommandCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Gateway-originated event codes, broadcast to every connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventCode {
    /// The hardware link dropped unexpectedly.
    DeviceDisconnected,
    /// An inventory scan finished: `[SCAN_COMPLETED, count, uid...]`.
    ScanCompleted,
    /// A user authenticated: `[AUTHENTICATION_SUCCESS, user, access]`.
    AuthenticationSuccess,
    /// An authentication attempt failed: `[AUTHENTICATION_FAILURE, reason]`.
    AuthenticationFailure,
    /// Temperature probe reading: `[TEMPERATURE, celsius]`.
    Temperature,
    /// Door opened or closed: `[DOOR_STATE, open|closed]`.
    DoorState,
}

impl EventCode {
    /// Wire representation of the event code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCode::DeviceDisconnected => "DEVICE_DISCONNECTED",
            EventCode::ScanCompleted => "SCAN_COMPLETED",
            EventCode::AuthenticationSuccess => "AUTHENTICATION_SUCCESS",
            EventCode::AuthenticationFailure => "AUTHENTICATION_FAILURE",
            EventCode::Temperature => "TEMPERATURE",
            EventCode::DoorState => "DOOR_STATE",
        }
    }
}

impl std::fmt::Display for EventCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
