//! Common error types used across the workspace.
//!
//! Each failure class maps to its own typed error; `PillarError` is the
//! umbrella the port traits speak, with `#[from]` conversions so callers
//! can use `?` across layer boundaries.

use crate::scene::{DeviceId, SceneId};
use crate::schedule::FiringKind;

/// Top-level error for the pillar workspace.
#[derive(Debug, thiserror::Error)]
pub enum PillarError {
    /// A domain invariant failed during construction or validation.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The scene configuration document could not be read or parsed.
    #[error("scene configuration error")]
    Config(#[from] ConfigError),

    /// The astronomy upstream failed, timed out, or returned garbage.
    #[error("astronomy fetch error")]
    Astronomy(#[from] AstronomyError),

    /// A device refused or failed an actuation.
    #[error("actuation error")]
    Actuation(#[from] ActuationError),

    /// The timer registry detected an internal invariant breach.
    #[error("timer registry violation")]
    Registry(#[from] RegistryViolation),
}

/// Domain invariant failures.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A scene was defined with no device actions at all.
    #[error("scene {0} has no actions")]
    NoActions(SceneId),
    /// Brightness must stay within 0–100 percent.
    #[error("brightness {got} out of range for device {device}")]
    BrightnessOutOfRange { device: DeviceId, got: u8 },
}

/// Scene configuration errors — abort the current re-arm cycle only.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document could not be read.
    #[error("failed to read scene configuration")]
    Io(#[from] std::io::Error),
    /// The document is not valid JSON.
    #[error("failed to parse scene configuration")]
    Parse(#[from] serde_json::Error),
}

/// Astronomy source errors — degrade to the absent-sunset path.
#[derive(Debug, thiserror::Error)]
pub enum AstronomyError {
    /// The upstream did not answer within the configured deadline.
    #[error("sunset fetch timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// Transport or HTTP-level failure from the upstream.
    #[error("sunset upstream failure: {0}")]
    Upstream(String),
    /// The upstream answered but the payload made no sense.
    #[error("malformed sunset response: {0}")]
    Malformed(String),
}

/// A device call failed at fire time. Logged and skipped; the rest of
/// the firing point's action list still runs.
#[derive(Debug, thiserror::Error)]
#[error("actuation failed for device {device}: {reason}")]
pub struct ActuationError {
    pub device: DeviceId,
    pub reason: String,
}

/// Internal registry bug — should never occur; fatal for the cycle.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryViolation {
    /// One arm batch carried two firing points for the same slot.
    #[error("duplicate firing point for slot ({scene}, {kind})")]
    DuplicateSlot { scene: SceneId, kind: FiringKind },
}
