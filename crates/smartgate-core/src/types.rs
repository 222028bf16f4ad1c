use crate::{Result, error::Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Transport a client connection arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Raw line-oriented TCP stream.
    Raw,
    /// WebSocket text messages.
    WebSocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Raw => write!(f, "raw"),
            TransportKind::WebSocket => write!(f, "websocket"),
        }
    }
}

/// Device link states.
///
/// `Suspended` is the explicit serial-bridge state: the gateway has
/// released the serial port in favor of the external forwarding process,
/// so a hardware disconnect is expected and must not trigger a reconnect
/// loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// No device handle exists.
    Absent,
    /// Discovery/construction in progress.
    Connecting,
    /// Device handle is live; modules may be partially attached.
    Ready,
    /// Serial port ceded to the bridge forwarder.
    Suspended,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkState::Absent => "Absent",
            LinkState::Connecting => "Connecting",
            LinkState::Ready => "Ready",
            LinkState::Suspended => "Suspended",
        };
        write!(f, "{s}")
    }
}

/// Attachable peripheral kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    BadgeReader,
    FingerprintReader,
    TemperatureProbe,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleKind::BadgeReader => write!(f, "badge reader"),
            ModuleKind::FingerprintReader => write!(f, "fingerprint reader"),
            ModuleKind::TemperatureProbe => write!(f, "temperature probe"),
        }
    }
}

/// Role of a fingerprint reader in a master/slave pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderRole {
    Master,
    Slave,
}

impl fmt::Display for ReaderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReaderRole::Master => write!(f, "master"),
            ReaderRole::Slave => write!(f, "slave"),
        }
    }
}

/// How a user authenticated against the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Badge,
    Fingerprint,
    Remote,
}

impl AccessType {
    /// Wire representation used in event payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Badge => "BADGE",
            AccessType::Fingerprint => "FINGERPRINT",
            AccessType::Remote => "REMOTE",
        }
    }

    /// Parse from the wire representation.
    ///
    /// # Errors
    /// Returns `Error::InvalidMessageFormat` for unrecognized values.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "BADGE" => Ok(AccessType::Badge),
            "FINGERPRINT" => Ok(AccessType::Fingerprint),
            "REMOTE" => Ok(AccessType::Remote),
            other => Err(Error::InvalidMessageFormat(format!(
                "unknown access type: {other}"
            ))),
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hardware controller model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceModel {
    Smartboard,
    Unknown(String),
}

impl DeviceModel {
    /// Wire representation used in the INITIALIZATION response.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            DeviceModel::Smartboard => "SMARTBOARD",
            DeviceModel::Unknown(s) => s,
        }
    }

    /// Parse from the identification string reported by the hardware.
    #[must_use]
    pub fn from_reported(s: &str) -> Self {
        match s {
            "SMARTBOARD" => DeviceModel::Smartboard,
            other => DeviceModel::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of a connected hardware controller.
///
/// Captured once at construction time and borrowed by the dispatch
/// engine for availability checks and the INITIALIZATION response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Serial port the device was discovered on.
    pub port: String,
    /// Factory serial number, e.g. "AA770201".
    pub serial_number: String,
    /// Controller model.
    pub model: DeviceModel,
    /// Hardware revision string.
    pub hardware_version: String,
    /// Firmware revision string.
    pub software_version: String,
}

/// RFID tag unique identifier (4-20 hex characters).
///
/// Normalized to uppercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagUid(String);

impl TagUid {
    /// Minimum UID length in hex characters.
    pub const MIN_LENGTH: usize = 4;

    /// Maximum UID length in hex characters.
    pub const MAX_LENGTH: usize = 20;

    /// Create a tag UID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidTagUid` if the UID is not 4-20 hexadecimal
    /// characters.
    pub fn new(uid: &str) -> Result<Self> {
        let uid = uid.trim().to_uppercase();

        let len = uid.len();
        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&len) {
            return Err(Error::InvalidTagUid(format!(
                "UID must be {}-{} chars, got {len}",
                Self::MIN_LENGTH,
                Self::MAX_LENGTH
            )));
        }

        if !uid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidTagUid(format!(
                "UID must be hexadecimal: {uid}"
            )));
        }

        Ok(TagUid(uid))
    }

    /// Get the UID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagUid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TagUid::new(s)
    }
}

/// One complete inventory scan reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    /// Tags present in the cabinet at scan time.
    pub tags: Vec<TagUid>,
    /// When the scan completed.
    pub taken_at: DateTime<Utc>,
}

impl InventorySnapshot {
    /// Create a snapshot stamped with the current time.
    #[must_use]
    pub fn new(tags: Vec<TagUid>) -> Self {
        Self {
            tags,
            taken_at: Utc::now(),
        }
    }

    /// Number of tags in the snapshot.
    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }
}

/// Administrator sign-in secret.
///
/// # Security
/// This type implements constant-time comparison to prevent timing
/// attacks when checking the secret presented by `ADMIN_SIGN_IN`.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct AdminSecret(String);

impl AdminSecret {
    /// Wrap a configured secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        AdminSecret(secret.into())
    }

    /// Check a candidate secret in constant time.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }
}

/// Constant-time comparison implementation for AdminSecret
impl PartialEq for AdminSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

/// Peripheral configuration supplied by the store collaborator.
///
/// Drives module bring-up after each successful device connect. A field
/// left at its default simply skips that module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Master fingerprint reader identifier, if configured.
    pub master_reader_id: Option<String>,
    /// Slave fingerprint reader identifiers.
    #[serde(default)]
    pub slave_reader_ids: Vec<String>,
    /// Number of badge readers to attach.
    #[serde(default)]
    pub badge_readers: u8,
    /// Whether the temperature probe is enabled.
    #[serde(default)]
    pub temperature_probe: bool,
}
