//! # pillar-domain
//!
//! Pure domain model for the pillar home automation gateway.
//!
//! ## Responsibilities
//! - Foundational types: device identifiers, error conventions, time-of-day helpers
//! - Define **Scenes** (named groups of device actions with on/off anchors)
//! - Define **FiringPoints** (one concrete time + action-list instance for a day)
//! - Compute the day's firing points from scene definitions and the sunset instant
//! - Contain all invariant enforcement and schedule arithmetic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod scene;
pub mod schedule;
pub mod time;
