//! Scene — a named, configured group of device actions fired together.
//!
//! Scenes are loaded fresh from the configuration document at every
//! re-arm cycle, so a definition is immutable for the day it was loaded
//! for. The closed set of scene identifiers mirrors the gateway's three
//! lighting moods: morning, evening, and evening TV.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{PillarError, ValidationError};

/// The closed set of scene identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneId {
    Morning,
    Evening,
    EveningTv,
}

impl SceneId {
    /// Every known scene, in firing-order convention.
    pub const ALL: [Self; 3] = [Self::Morning, Self::Evening, Self::EveningTv];

    /// The identifier as it appears in the scene document.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
            Self::EveningTv => "eveningtv",
        }
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bridge-assigned device identifier (e.g. a Hue light number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Desired on/off state for a device action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    On,
    Off,
}

impl DeviceState {
    #[must_use]
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// One device command within a scene: target device, desired state, and
/// optional brightness (percent) and CIE xy colour.
///
/// The engine does not cross-validate actions within a scene; it trusts
/// configuration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAction {
    pub device: DeviceId,
    pub state: DeviceState,
    /// Brightness percentage, 0–100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    /// CIE xy colour coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xy: Option<(f64, f64)>,
}

impl DeviceAction {
    /// Plain on/off action with no brightness or colour.
    #[must_use]
    pub fn switch(device: impl Into<DeviceId>, state: DeviceState) -> Self {
        Self {
            device: device.into(),
            state,
            brightness: None,
            xy: None,
        }
    }
}

impl std::fmt::Display for DeviceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.device, self.state)?;
        if let Some(brightness) = self.brightness {
            write!(f, " @{brightness}%")?;
        }
        Ok(())
    }
}

/// When a scene's "on" firing point anchors: a fixed wall-clock time, or
/// an offset back from the day's sunset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OnAnchor {
    /// Absolute time-of-day, `"HH:MM"` in the document.
    Time(#[serde(with = "crate::time::serde_hhmm")] NaiveTime),
    /// `offset_minutes` before the day's (corrected) sunset.
    SunsetRelative { offset_minutes: i64 },
}

/// A scene as loaded from configuration for one re-arm cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDefinition {
    pub id: SceneId,
    pub on_anchor: OnAnchor,
    #[serde(with = "crate::time::serde_hhmm")]
    pub off_time: NaiveTime,
    pub actions: Vec<DeviceAction>,
}

impl SceneDefinition {
    /// Create a builder for constructing a [`SceneDefinition`].
    #[must_use]
    pub fn builder(id: SceneId) -> SceneDefinitionBuilder {
        SceneDefinitionBuilder {
            id,
            on_anchor: None,
            off_time: None,
            actions: Vec::new(),
        }
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PillarError::Validation`] when the scene has no actions
    /// or an action's brightness exceeds 100 percent.
    pub fn validate(&self) -> Result<(), PillarError> {
        if self.actions.is_empty() {
            return Err(ValidationError::NoActions(self.id).into());
        }
        for action in &self.actions {
            if let Some(brightness) = action.brightness {
                if brightness > 100 {
                    return Err(ValidationError::BrightnessOutOfRange {
                        device: action.device.clone(),
                        got: brightness,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

/// Step-by-step builder for [`SceneDefinition`].
#[derive(Debug)]
pub struct SceneDefinitionBuilder {
    id: SceneId,
    on_anchor: Option<OnAnchor>,
    off_time: Option<NaiveTime>,
    actions: Vec<DeviceAction>,
}

impl SceneDefinitionBuilder {
    #[must_use]
    pub fn on_at(mut self, time: NaiveTime) -> Self {
        self.on_anchor = Some(OnAnchor::Time(time));
        self
    }

    #[must_use]
    pub fn on_before_sunset(mut self, offset_minutes: i64) -> Self {
        self.on_anchor = Some(OnAnchor::SunsetRelative { offset_minutes });
        self
    }

    #[must_use]
    pub fn off_at(mut self, time: NaiveTime) -> Self {
        self.off_time = Some(time);
        self
    }

    #[must_use]
    pub fn action(mut self, action: DeviceAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Consume the builder, validate, and return a [`SceneDefinition`].
    ///
    /// # Errors
    ///
    /// Returns [`PillarError::Validation`] if invariants fail. A missing
    /// on-anchor defaults to midnight; a missing off-time to 23:00.
    pub fn build(self) -> Result<SceneDefinition, PillarError> {
        let scene = SceneDefinition {
            id: self.id,
            on_anchor: self.on_anchor.unwrap_or(OnAnchor::Time(NaiveTime::MIN)),
            off_time: self
                .off_time
                .unwrap_or_else(|| NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN)),
            actions: self.actions,
        };
        scene.validate()?;
        Ok(scene)
    }
}
