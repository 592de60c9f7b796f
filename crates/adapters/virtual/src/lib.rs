//! # pillar-adapter-virtual
//!
//! Virtual actuator providing simulated devices for demonstration and
//! testing. Every executed action is journalled and the last commanded
//! state per device is kept, so tests (and a gateway running without a
//! real bridge) can observe exactly what the schedule engine did.
//!
//! ## Dependency rule
//!
//! Depends on `pillar-app` (port traits) and `pillar-domain` only.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::info;

use pillar_app::ports::DeviceActuator;
use pillar_domain::error::PillarError;
use pillar_domain::scene::{DeviceAction, DeviceId, DeviceState};

/// The last state a virtual device was commanded into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandedState {
    pub state: DeviceState,
    pub brightness: Option<u8>,
    pub xy: Option<(f64, f64)>,
}

/// In-memory [`DeviceActuator`] that always succeeds.
#[derive(Default)]
pub struct VirtualActuator {
    devices: Mutex<HashMap<DeviceId, CommandedState>>,
    journal: Mutex<Vec<DeviceAction>>,
}

impl VirtualActuator {
    /// The last commanded state of a device, if it was ever actuated.
    #[must_use]
    pub fn state_of(&self, device: &DeviceId) -> Option<CommandedState> {
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device)
            .copied()
    }

    /// Every action executed so far, in execution order.
    #[must_use]
    pub fn executed(&self) -> Vec<DeviceAction> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DeviceActuator for VirtualActuator {
    async fn execute(&self, action: &DeviceAction) -> Result<(), PillarError> {
        info!(device = %action.device, state = %action.state, "virtual device actuated");
        self.devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                action.device.clone(),
                CommandedState {
                    state: action.state,
                    brightness: action.brightness,
                    xy: action.xy,
                },
            );
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action.clone());
        Ok(())
    }
}
