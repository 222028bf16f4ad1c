//! Per-command contracts.
//!
//! Every command registers a static [`CommandContract`] at table
//! construction time; the dispatch engine reads the struct directly.
//! Checks run in a fixed order (parameter count, device availability,
//! admin privilege) and the first failing check short-circuits the
//! rest.

use smartgate_core::constants::{REPLY_EMPTY, REPLY_FALSE};
use smartgate_protocol::CommandCode;
use std::collections::HashMap;

/// What to answer when a contract check fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReply {
    /// No response at all.
    Silent,
    /// `[code, value]` unicast to the caller.
    ToCaller(&'static str),
    /// `[code, value]` broadcast to all connections on both transports.
    ToAll(&'static str),
}

/// Static validation rule set for one command.
#[derive(Debug, Clone, Copy)]
pub struct CommandContract {
    /// Minimum parameter count.
    pub min_params: usize,
    /// Whether the count must equal `min_params` exactly.
    pub exact_params: bool,
    /// Whether a connected device is required.
    pub needs_device: bool,
    /// Whether the caller must hold admin privilege.
    pub needs_admin: bool,
    /// Canned response on violation.
    pub on_violation: InvalidReply,
}

impl CommandContract {
    /// Run the ordered checks; `None` means the contract passed.
    pub fn check(
        &self,
        param_count: usize,
        device_available: bool,
        is_admin: bool,
    ) -> Option<ContractViolation> {
        if param_count < self.min_params || (self.exact_params && param_count != self.min_params) {
            return Some(ContractViolation::Arity {
                expected: self.min_params,
                exact: self.exact_params,
                actual: param_count,
            });
        }
        if self.needs_device && !device_available {
            return Some(ContractViolation::DeviceUnavailable);
        }
        if self.needs_admin && !is_admin {
            return Some(ContractViolation::NotAdmin);
        }
        None
    }
}

/// One failed contract check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolation {
    /// Wrong parameter count: a client bug.
    Arity {
        expected: usize,
        exact: bool,
        actual: usize,
    },
    /// No device connected: a normal operational state.
    DeviceUnavailable,
    /// Caller lacks admin privilege: a normal operational state.
    NotAdmin,
}

impl ContractViolation {
    /// Expected violations log at INFO, unexpected ones at WARN, so
    /// client bugs stand out from normal operation.
    pub fn is_expected(&self) -> bool {
        !matches!(self, ContractViolation::Arity { .. })
    }
}

impl std::fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractViolation::Arity {
                expected,
                exact,
                actual,
            } => {
                let relation = if *exact { "exactly" } else { "at least" };
                write!(f, "expected {relation} {expected} parameters, got {actual}")
            }
            ContractViolation::DeviceUnavailable => write!(f, "device unavailable"),
            ContractViolation::NotAdmin => write!(f, "caller is not an administrator"),
        }
    }
}

/// Build the command table.
///
/// Commands requiring a device all answer the uniform `[code, ""]`
/// family on unavailability, so callers need no per-command handling.
/// Scan control violations broadcast, because scan state is global to
/// every client watching the cabinet.
pub fn command_table() -> HashMap<CommandCode, CommandContract> {
    let mut table = HashMap::new();

    table.insert(
        CommandCode::Initialization,
        CommandContract {
            min_params: 0,
            exact_params: true,
            needs_device: true,
            needs_admin: false,
            on_violation: InvalidReply::ToCaller(REPLY_EMPTY),
        },
    );
    table.insert(
        CommandCode::AdminSignIn,
        CommandContract {
            min_params: 1,
            exact_params: true,
            needs_device: false,
            needs_admin: false,
            on_violation: InvalidReply::ToCaller(REPLY_FALSE),
        },
    );
    table.insert(
        CommandCode::AdminSignOut,
        CommandContract {
            min_params: 0,
            exact_params: true,
            needs_device: false,
            needs_admin: false,
            on_violation: InvalidReply::Silent,
        },
    );
    table.insert(
        CommandCode::StartScan,
        CommandContract {
            min_params: 0,
            exact_params: true,
            needs_device: true,
            needs_admin: false,
            on_violation: InvalidReply::ToAll(REPLY_EMPTY),
        },
    );
    table.insert(
        CommandCode::StopScan,
        CommandContract {
            min_params: 0,
            exact_params: true,
            needs_device: true,
            needs_admin: false,
            on_violation: InvalidReply::ToAll(REPLY_EMPTY),
        },
    );
    table.insert(
        CommandCode::OpenDoor,
        CommandContract {
            min_params: 0,
            exact_params: true,
            needs_device: true,
            needs_admin: false,
            on_violation: InvalidReply::ToCaller(REPLY_EMPTY),
        },
    );
    table.insert(
        CommandCode::ReadTemperature,
        CommandContract {
            min_params: 0,
            exact_params: true,
            needs_device: true,
            needs_admin: false,
            on_violation: InvalidReply::ToCaller(REPLY_EMPTY),
        },
    );
    table.insert(
        CommandCode::AddUser,
        CommandContract {
            min_params: 1,
            exact_params: false,
            needs_device: false,
            needs_admin: true,
            on_violation: InvalidReply::ToCaller(REPLY_FALSE),
        },
    );
    table.insert(
        CommandCode::RemoveUser,
        CommandContract {
            min_params: 1,
            exact_params: true,
            needs_device: false,
            needs_admin: true,
            on_violation: InvalidReply::ToCaller(REPLY_FALSE),
        },
    );
    table.insert(
        CommandCode::RewriteTag,
        CommandContract {
            min_params: 2,
            exact_params: true,
            needs_device: true,
            needs_admin: true,
            on_violation: InvalidReply::ToCaller(REPLY_FALSE),
        },
    );
    table.insert(
        CommandCode::EnrollFingerprint,
        CommandContract {
            min_params: 1,
            exact_params: false,
            needs_device: true,
            needs_admin: true,
            on_violation: InvalidReply::ToCaller(REPLY_FALSE),
        },
    );
    table.insert(
        CommandCode::SerialBridge,
        CommandContract {
            min_params: 1,
            exact_params: true,
            needs_device: false,
            needs_admin: true,
            on_violation: InvalidReply::ToCaller(REPLY_FALSE),
        },
    );

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_table_covers_every_command() {
        let table = command_table();
        for code in CommandCode::ALL {
            assert!(table.contains_key(&code), "missing contract for {code}");
        }
    }

    #[rstest]
    #[case(0, true)] // below minimum
    #[case(1, false)] // exact match
    #[case(2, true)] // above exact
    fn test_exact_arity(#[case] actual: usize, #[case] violates: bool) {
        let contract = CommandContract {
            min_params: 1,
            exact_params: true,
            needs_device: false,
            needs_admin: false,
            on_violation: InvalidReply::Silent,
        };
        let violation = contract.check(actual, true, true);
        assert_eq!(violation.is_some(), violates);
    }

    #[rstest]
    #[case(0, true)]
    #[case(1, false)]
    #[case(5, false)] // extra parameters allowed
    fn test_minimum_arity(#[case] actual: usize, #[case] violates: bool) {
        let contract = CommandContract {
            min_params: 1,
            exact_params: false,
            needs_device: false,
            needs_admin: false,
            on_violation: InvalidReply::Silent,
        };
        let violation = contract.check(actual, true, true);
        assert_eq!(violation.is_some(), violates);
    }

    #[test]
    fn test_check_order_short_circuits() {
        let contract = CommandContract {
            min_params: 1,
            exact_params: true,
            needs_device: true,
            needs_admin: true,
            on_violation: InvalidReply::Silent,
        };

        // Arity failure wins even when device and admin would also fail.
        assert!(matches!(
            contract.check(0, false, false),
            Some(ContractViolation::Arity { .. })
        ));

        // Then device availability.
        assert!(matches!(
            contract.check(1, false, false),
            Some(ContractViolation::DeviceUnavailable)
        ));

        // Then admin.
        assert!(matches!(
            contract.check(1, true, false),
            Some(ContractViolation::NotAdmin)
        ));

        assert!(contract.check(1, true, true).is_none());
    }

    #[test]
    fn test_violation_expectedness() {
        assert!(!ContractViolation::Arity {
            expected: 1,
            exact: true,
            actual: 0
        }
        .is_expected());
        assert!(ContractViolation::DeviceUnavailable.is_expected());
        assert!(ContractViolation::NotAdmin.is_expected());
    }
}
