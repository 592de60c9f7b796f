//! # pillar-adapter-lights-hue
//!
//! Actuator adapter for Philips Hue bridges. A device action becomes a
//! `PUT /api/<username>/lights/<id>/state` call: brightness percent maps
//! onto the bridge's 1–254 `bri` range and CIE xy coordinates pass
//! through unchanged. The bridge reports failures as an `"error"` entry
//! in its response array, which surfaces as an [`ActuationError`].
//!
//! ## Dependency rule
//!
//! Depends on `pillar-app` (port traits) and `pillar-domain` only.

use tracing::debug;

use pillar_app::ports::DeviceActuator;
use pillar_domain::error::{ActuationError, PillarError};
use pillar_domain::scene::DeviceAction;

/// Hue bridge client implementing [`DeviceActuator`].
pub struct HueActuator {
    client: reqwest::Client,
    bridge_url: String,
    username: String,
}

impl HueActuator {
    /// Create an actuator against a bridge (e.g. `http://192.168.1.2`)
    /// with a registered API username.
    #[must_use]
    pub fn new(bridge_url: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bridge_url: bridge_url.into(),
            username: username.into(),
        }
    }
}

impl DeviceActuator for HueActuator {
    async fn execute(&self, action: &DeviceAction) -> Result<(), PillarError> {
        let url = format!(
            "{}/api/{}/lights/{}/state",
            self.bridge_url,
            self.username,
            action.device.as_str()
        );
        let body = state_body(action);
        debug!(device = %action.device, %body, "sending bridge command");

        let response = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| ActuationError {
                device: action.device.clone(),
                reason: err.to_string(),
            })?;

        let payload: serde_json::Value = response.json().await.map_err(|err| ActuationError {
            device: action.device.clone(),
            reason: format!("unreadable bridge response: {err}"),
        })?;

        if let Some(reason) = bridge_error(&payload) {
            return Err(ActuationError {
                device: action.device.clone(),
                reason,
            }
            .into());
        }
        Ok(())
    }
}

/// Build the Hue state body for an action.
fn state_body(action: &DeviceAction) -> serde_json::Value {
    let mut body = serde_json::json!({ "on": action.state.is_on() });
    if action.state.is_on() {
        if let Some(brightness) = action.brightness {
            body["bri"] = serde_json::json!(percent_to_bri(brightness));
        }
        if let Some((x, y)) = action.xy {
            body["xy"] = serde_json::json!([x, y]);
        }
    }
    body
}

/// Map a 0–100 percentage onto the bridge's 1–254 brightness scale.
fn percent_to_bri(percent: u8) -> u8 {
    let percent = u16::from(percent.min(100));
    u8::try_from((percent * 254).div_ceil(100).max(1)).unwrap_or(u8::MAX)
}

/// The bridge answers with an array of per-field results; any `"error"`
/// entry means the command was refused.
fn bridge_error(payload: &serde_json::Value) -> Option<String> {
    payload.as_array()?.iter().find_map(|entry| {
        let error = entry.get("error")?;
        Some(
            error
                .get("description")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unspecified bridge error")
                .to_string(),
        )
    })
}
