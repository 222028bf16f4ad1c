//! Serial-bridge control.
//!
//! An operator command can temporarily cede the hardware's serial port to
//! an external OS-level forwarding process (e.g. forwarding the port over
//! a USB link). While the forwarder runs, the device lifecycle is
//! suspended: the controller handle is released and hardware disconnects
//! are expected.
//!
//! Invariant: the child-process slot is non-empty only while forwarding
//! is active, and its presence implies the controller handle is empty:
//! `engage` releases the device before spawning, and `release` clears
//! the slot before reconnecting.

use crate::lifecycle::DeviceLifecycle;
use serde::{Deserialize, Serialize};
use smartgate_core::{Error, Result};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Command lines for the external forwarding process.
///
/// A dedicated stop command is configured because terminating the child
/// handle does not reliably stop the underlying forwarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Program that starts the forwarder.
    pub start_program: String,
    /// Arguments for the start program.
    #[serde(default)]
    pub start_args: Vec<String>,
    /// Program that stops the forwarder.
    pub stop_program: String,
    /// Arguments for the stop program.
    #[serde(default)]
    pub stop_args: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            start_program: "smartgate-forwarder".to_string(),
            start_args: vec![],
            stop_program: "pkill".to_string(),
            stop_args: vec!["-f".to_string(), "smartgate-forwarder".to_string()],
        }
    }
}

/// Guarded handle to the forwarding process.
pub struct SerialBridge {
    config: BridgeConfig,
    child: Mutex<Option<Child>>,
}

impl SerialBridge {
    /// Create an inactive bridge.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            child: Mutex::new(None),
        }
    }

    /// Whether the forwarder is currently active.
    pub async fn is_active(&self) -> bool {
        self.child.lock().await.is_some()
    }

    /// Cede the serial port and start the forwarder.
    ///
    /// # Errors
    /// - `Error::BridgeAlreadyActive` when a forwarder is already running
    /// - `Error::BridgeProcess` when spawning fails; the device is
    ///   reconnected immediately as a compensating action
    pub async fn engage(&self, lifecycle: &DeviceLifecycle) -> Result<()> {
        let mut slot = self.child.lock().await;
        if slot.is_some() {
            return Err(Error::BridgeAlreadyActive);
        }

        lifecycle.suspend().await;

        match Command::new(&self.config.start_program)
            .args(&self.config.start_args)
            .spawn()
        {
            Ok(child) => {
                info!(program = %self.config.start_program, "Serial bridge forwarder started");
                *slot = Some(child);
                Ok(())
            }
            Err(e) => {
                error!(program = %self.config.start_program, error = %e,
                       "Serial bridge forwarder failed to start");
                // Compensating action: give the port back to the device.
                lifecycle.resume().await;
                if let Err(e) = lifecycle.connect().await {
                    warn!(error = %e, "Device reconnect after bridge start failure failed");
                } else if let Err(e) = lifecycle.attach_modules().await {
                    warn!(error = %e, "Module bring-up after bridge start failure failed");
                }
                Err(Error::BridgeProcess(e.to_string()))
            }
        }
    }

    /// Stop the forwarder and reclaim the serial port.
    ///
    /// Stop-command and kill failures are logged; the process reference
    /// is cleared regardless to avoid a stuck state, and the device is
    /// reconnected.
    ///
    /// # Errors
    /// Returns `Error::BridgeNotActive` when no forwarder is running.
    pub async fn release(&self, lifecycle: &DeviceLifecycle) -> Result<()> {
        let mut slot = self.child.lock().await;
        let Some(mut child) = slot.take() else {
            return Err(Error::BridgeNotActive);
        };

        match Command::new(&self.config.stop_program)
            .args(&self.config.stop_args)
            .status()
            .await
        {
            Ok(status) if status.success() => {
                debug!("Serial bridge stop command completed");
            }
            Ok(status) => {
                warn!(%status, "Serial bridge stop command reported failure");
            }
            Err(e) => {
                warn!(error = %e, "Serial bridge stop command could not run");
            }
        }

        if let Err(e) = child.kill().await {
            debug!(error = %e, "Forwarder child already gone");
        }
        drop(slot);

        info!("Serial bridge forwarder stopped");

        lifecycle.resume().await;
        if let Err(e) = lifecycle.connect().await {
            error!(error = %e, "Device reconnect after bridge release failed");
        } else if let Err(e) = lifecycle.attach_modules().await {
            warn!(error = %e, "Module bring-up after bridge release failed");
        }

        Ok(())
    }

    /// Best-effort stop used during process shutdown, after the device
    /// handle has already been released.
    pub async fn stop_if_active(&self) {
        let mut slot = self.child.lock().await;
        if let Some(mut child) = slot.take() {
            if let Err(e) = Command::new(&self.config.stop_program)
                .args(&self.config.stop_args)
                .status()
                .await
            {
                warn!(error = %e, "Serial bridge stop command could not run");
            }
            if let Err(e) = child.kill().await {
                debug!(error = %e, "Forwarder child already gone");
            }
            info!("Serial bridge forwarder stopped at shutdown");
        }
    }
}
