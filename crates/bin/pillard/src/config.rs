//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `pillard.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values. The scene document itself lives in a
//! separate JSON file (re-read daily); this config only points at it.

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the house is.
    pub location: LocationConfig,
    /// Daily schedule settings.
    pub schedule: ScheduleConfig,
    /// Astronomy feed settings.
    pub astronomy: AstronomyConfig,
    /// Light bridge settings.
    pub lights: LightsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Location forwarded to the astronomy feed, and the timezone all
/// times-of-day are interpreted in.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Free-text place descriptor (e.g. `"london,uk"`).
    pub place: String,
    /// IANA timezone name (e.g. `"Europe/London"`).
    pub timezone: String,
}

/// Daily re-arm settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Path to the JSON scene document.
    pub scenes_path: String,
    /// Wall-clock time of the daily re-arm, `"HH:MM"`.
    pub rearm_time: String,
    /// Upper bound on the sunset fetch, in seconds.
    pub sunset_timeout_secs: u64,
}

/// OpenWeatherMap feed configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AstronomyConfig {
    /// API key for the feed.
    pub api_key: String,
    /// Override the endpoint (local test servers).
    pub base_url: Option<String>,
}

/// Hue bridge configuration. When either field is missing the daemon
/// falls back to the virtual actuator.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    /// Bridge base URL (e.g. `"http://192.168.1.2"`).
    pub bridge_url: Option<String>,
    /// Registered bridge API username.
    pub username: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `pillard.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if
    /// the resulting values fail validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("pillard.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PILLAR_PLACE") {
            self.location.place = val;
        }
        if let Ok(val) = std::env::var("PILLAR_TIMEZONE") {
            self.location.timezone = val;
        }
        if let Ok(val) = std::env::var("PILLAR_SCENES") {
            self.schedule.scenes_path = val;
        }
        if let Ok(val) = std::env::var("PILLAR_REARM_TIME") {
            self.schedule.rearm_time = val;
        }
        if let Ok(val) = std::env::var("PILLAR_OWM_API_KEY") {
            self.astronomy.api_key = val;
        }
        if let Ok(val) = std::env::var("PILLAR_HUE_BRIDGE") {
            self.lights.bridge_url = Some(val);
        }
        if let Ok(val) = std::env::var("PILLAR_HUE_USERNAME") {
            self.lights.username = Some(val);
        }
        if let Ok(val) = std::env::var("PILLAR_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;
        self.rearm_time()?;
        if self.schedule.sunset_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "sunset_timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.location.place.is_empty() {
            return Err(ConfigError::Validation(
                "location.place must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The configured timezone, parsed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the name is not a known
    /// IANA timezone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.location.timezone.parse().map_err(|_| {
            ConfigError::Validation(format!("unknown timezone {:?}", self.location.timezone))
        })
    }

    /// The configured daily re-arm time, parsed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the value is not `HH:MM`.
    pub fn rearm_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.schedule.rearm_time, "%H:%M").map_err(|err| {
            ConfigError::Validation(format!(
                "invalid rearm_time {:?}: {err}",
                self.schedule.rearm_time
            ))
        })
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            place: "london,uk".to_string(),
            timezone: "Europe/London".to_string(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            scenes_path: "scenes.json".to_string(),
            rearm_time: "00:10".to_string(),
            sunset_timeout_secs: 10,
        }
    }
}

impl Default for AstronomyConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "pillard=info,pillar=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
