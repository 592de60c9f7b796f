//! # pillar-adapter-astronomy-owm
//!
//! Astronomy adapter backed by the OpenWeatherMap current-weather feed,
//! which reports the day's sunrise and sunset as epoch seconds in its
//! `sys` block.
//!
//! The feed has known quirks the domain layer compensates for: it only
//! answers for the current day regardless of the requested date, and
//! the reported instant has been observed in the wrong half of the day.
//! This adapter translates the payload faithfully and leaves the
//! plausibility correction to the schedule computation.
//!
//! ## Dependency rule
//!
//! Depends on `pillar-app` (port traits) and `pillar-domain` only.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::debug;

use pillar_app::ports::{AstronomySource, Location, SunTimes};
use pillar_domain::error::{AstronomyError, PillarError};
use pillar_domain::time::Timestamp;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// OpenWeatherMap client implementing [`AstronomySource`].
pub struct OwmAstronomy {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OwmAstronomy {
    /// Create a client against the public OpenWeatherMap endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different endpoint (local test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

impl AstronomySource for OwmAstronomy {
    async fn sun_times(
        &self,
        location: &Location,
        date: NaiveDate,
    ) -> Result<SunTimes, PillarError> {
        // The current-weather endpoint always answers for today; the
        // requested date is carried for logging and for sources that do
        // honour it.
        debug!(%location, %date, "fetching sun times");

        let url = format!("{}/data/2.5/weather", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", location.as_str()), ("appid", self.api_key.as_str())])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| AstronomyError::Upstream(err.to_string()))?;

        let payload: WeatherResponse = response
            .json()
            .await
            .map_err(|err| AstronomyError::Malformed(err.to_string()))?;

        SunTimes::try_from(payload).map_err(Into::into)
    }
}

/// The slice of the current-weather payload this adapter consumes.
#[derive(Debug, Deserialize)]
struct WeatherResponse {
    sys: SysBlock,
}

#[derive(Debug, Deserialize)]
struct SysBlock {
    sunrise: i64,
    sunset: i64,
}

impl TryFrom<WeatherResponse> for SunTimes {
    type Error = AstronomyError;

    fn try_from(payload: WeatherResponse) -> Result<Self, Self::Error> {
        let sunrise = epoch_instant(payload.sys.sunrise, "sunrise")?;
        let sunset = epoch_instant(payload.sys.sunset, "sunset")?;
        Ok(Self { sunrise, sunset })
    }
}

fn epoch_instant(seconds: i64, field: &str) -> Result<Timestamp, AstronomyError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| AstronomyError::Malformed(format!("{field} epoch {seconds} out of range")))
}
