//! Core constants for the smartgate wire protocol and gateway behavior.
//!
//! This module centralizes the protocol-level constants shared by both
//! transports and the timing knobs of the device lifecycle, so that the
//! framing layer, the dispatch engine, and the tests all agree on the
//! same values.
//!
//! # Wire Format
//!
//! A message is a sequence of UTF-8 string fields separated by a reserved
//! delimiter byte and terminated by a reserved end-of-message byte:
//!
//! ```text
//! CODE;field1;field2<LF>
//! ^^^^ ^^^^^^^^^^^^^ ^^^^
//! |    parameters    terminator (0x0A)
//! request/event code
//! ```
//!
//! The raw TCP transport carries the terminated string directly on the
//! stream; the WebSocket transport carries the identical string as one
//! text message. Field 0 is always the request/event code; all values are
//! transmitted as strings.

// ============================================================================
// Wire Delimiters
// ============================================================================

/// Field separator within a message.
///
/// Separates the request/event code from its parameters and the
/// parameters from each other. Empty fields (consecutive `;;`) are
/// preserved and have semantic meaning.
///
/// # Examples
///
/// ```
/// use smartgate_core::constants::FIELD_DELIMITER;
///
/// let payload = "ADMIN_SIGN_IN;secret";
/// let fields: Vec<&str> = payload.split(FIELD_DELIMITER as char).collect();
/// assert_eq!(fields, vec!["ADMIN_SIGN_IN", "secret"]);
/// ```
pub const FIELD_DELIMITER: u8 = b';';

/// End-of-message marker.
///
/// Terminates each message on the raw transport. The WebSocket transport
/// keeps the marker so both transports produce byte-identical payloads.
pub const MESSAGE_TERMINATOR: u8 = b'\n';

// ============================================================================
// Dispatch Engine
// ============================================================================

/// Anti-flood deduplication window in milliseconds.
///
/// An identical request (same code, same parameters, same sender address)
/// arriving within this window of the previous one is treated as a
/// duplicate retransmission and suppressed. This is a double-click /
/// single-flooder mitigation keyed on the sender, not a rate limiter.
///
/// # Value: 500 ms
pub const DEDUP_WINDOW_MS: u64 = 500;

// ============================================================================
// Device Lifecycle
// ============================================================================

/// Number of connect attempts performed by one reconnect cycle.
///
/// # Value: 5 attempts
pub const RECONNECT_ATTEMPTS: u32 = 5;

/// Pause between reconnect attempts in milliseconds.
///
/// The pause is a genuine blocking delay and must only ever run on a
/// dedicated worker task, never on a connection's I/O task.
///
/// # Value: 3000 ms (3 seconds)
pub const RECONNECT_PAUSE_MS: u64 = 3000;

// ============================================================================
// Canned Responses
// ============================================================================

/// Boolean-as-string success value.
pub const REPLY_TRUE: &str = "true";

/// Boolean-as-string failure value.
///
/// This is the common canned response for contract violations.
pub const REPLY_FALSE: &str = "false";

/// Empty canned value used by the device-unavailable response family.
///
/// Commands requiring a device answer `[code, ""]` uniformly when no
/// device is connected, so callers can treat unavailability without
/// per-command special-casing.
pub const REPLY_EMPTY: &str = "";

// ============================================================================
// Listener Defaults
// ============================================================================

/// Default port for the raw stream transport.
pub const DEFAULT_RAW_PORT: u16 = 5740;

/// Default port for the WebSocket transport.
pub const DEFAULT_WS_PORT: u16 = 5741;
