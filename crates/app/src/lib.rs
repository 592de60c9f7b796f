//! # pillar-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `AstronomySource` — fetch the day's sun times for a location
//!   - `SceneSource` — read the scene configuration fresh each cycle
//!   - `DeviceActuator` — execute one device action
//! - Own the **timer registry**: the live set of armed timers, keyed by
//!   `(scene, kind)` slot, with atomic replace-all and generation tagging
//! - Own the **daily re-arm job** that orchestrates configuration →
//!   sunset fetch → schedule computation → registry replacement
//!
//! ## Dependency rule
//! Depends on `pillar-domain` only (plus `tokio` for timers and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod ports;
pub mod rearm;
pub mod registry;
