//! Actuator port — executing one device action when a timer fires.

use std::future::Future;

use pillar_domain::error::PillarError;
use pillar_domain::scene::DeviceAction;

/// Executes device actions. Called once per action in a firing point's
/// list; a failed actuation is logged by the caller and never retried.
pub trait DeviceActuator {
    /// Drive the device into the state the action describes.
    ///
    /// # Errors
    ///
    /// Returns [`PillarError::Actuation`] when the device or its bridge
    /// refuses the command.
    fn execute(&self, action: &DeviceAction) -> impl Future<Output = Result<(), PillarError>> + Send;
}

impl<T: DeviceActuator + Send + Sync> DeviceActuator for std::sync::Arc<T> {
    fn execute(
        &self,
        action: &DeviceAction,
    ) -> impl Future<Output = Result<(), PillarError>> + Send {
        (**self).execute(action)
    }
}
