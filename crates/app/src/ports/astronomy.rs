//! Astronomy port — the external source of the day's sun times.
//!
//! The upstream may be slow or unavailable; callers bound it with a
//! timeout and treat failure as "no sunset this cycle" rather than
//! aborting the re-arm.

use std::future::Future;

use chrono::NaiveDate;
use pillar_domain::error::PillarError;
use pillar_domain::time::Timestamp;

/// Free-text location descriptor forwarded to the upstream feed
/// (e.g. `"london,uk"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location(String);

impl Location {
    #[must_use]
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self(descriptor.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sunrise and sunset instants for one day, as reported upstream.
///
/// The schedule engine only consumes `sunset`; sunrise is part of the
/// feed's response surface and kept for callers that want it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: Timestamp,
    pub sunset: Timestamp,
}

/// Fetches the sun times for a location on a given calendar date.
pub trait AstronomySource {
    /// Fetch sunrise/sunset for `location` on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`PillarError::Astronomy`] on upstream failure or a
    /// nonsensical payload.
    fn sun_times(
        &self,
        location: &Location,
        date: NaiveDate,
    ) -> impl Future<Output = Result<SunTimes, PillarError>> + Send;
}

impl<T: AstronomySource + Send + Sync> AstronomySource for std::sync::Arc<T> {
    fn sun_times(
        &self,
        location: &Location,
        date: NaiveDate,
    ) -> impl Future<Output = Result<SunTimes, PillarError>> + Send {
        (**self).sun_times(location, date)
    }
}
