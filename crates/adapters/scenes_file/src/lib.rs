//! # pillar-adapter-scenes-file
//!
//! Scene source adapter reading a JSON document keyed by scene id:
//!
//! ```json
//! {
//!   "morning":   { "on": "06:45", "off": "08:30", "lights": [ { "device": "1", "state": "on", "brightness": 80 } ] },
//!   "evening":   { "on": { "offset_minutes": 30 }, "off": "23:00", "lights": [ { "device": "2", "state": "on", "brightness": 60 } ] },
//!   "eveningtv": { "on": "19:30", "off": "22:30", "lights": [ { "device": "4", "state": "on", "xy": [0.31, 0.33] } ] }
//! }
//! ```
//!
//! The document is re-read on every re-arm cycle, so edits take effect
//! the next day without a restart. A malformed or missing scene is
//! skipped with a warning — that scene simply gets no timers this cycle;
//! only an unreadable or syntactically broken document is an error.
//!
//! ## Dependency rule
//!
//! Depends on `pillar-app` (port traits) and `pillar-domain` only.

use std::path::PathBuf;

use chrono::NaiveTime;
use serde::Deserialize;
use tracing::{debug, warn};

use pillar_app::ports::SceneSource;
use pillar_domain::error::{ConfigError, PillarError};
use pillar_domain::scene::{DeviceAction, OnAnchor, SceneDefinition, SceneId};

/// File-backed [`SceneSource`].
pub struct FileSceneSource {
    path: PathBuf,
}

impl FileSceneSource {
    /// Create a source reading from `path` on every load.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SceneSource for FileSceneSource {
    async fn load(&self) -> Result<Vec<SceneDefinition>, PillarError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(ConfigError::Io)?;
        let document: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(parse_scenes(&document))
    }
}

/// One scene as it appears in the document.
#[derive(Debug, Deserialize)]
struct SceneEntry {
    on: OnAnchor,
    #[serde(with = "pillar_domain::time::serde_hhmm")]
    off: NaiveTime,
    lights: Vec<DeviceAction>,
}

/// Extract every known scene, skipping the ones that are absent or do
/// not parse. Unknown top-level keys are ignored.
fn parse_scenes(document: &serde_json::Map<String, serde_json::Value>) -> Vec<SceneDefinition> {
    let mut scenes = Vec::new();
    for id in SceneId::ALL {
        let Some(raw) = document.get(id.as_str()) else {
            debug!(scene = %id, "scene not configured, no timers this cycle");
            continue;
        };
        match serde_json::from_value::<SceneEntry>(raw.clone()) {
            Ok(entry) => {
                let scene = SceneDefinition {
                    id,
                    on_anchor: entry.on,
                    off_time: entry.off,
                    actions: entry.lights,
                };
                match scene.validate() {
                    Ok(()) => scenes.push(scene),
                    Err(err) => warn!(scene = %id, error = %err, "invalid scene skipped"),
                }
            }
            Err(err) => warn!(scene = %id, error = %err, "malformed scene skipped"),
        }
    }
    scenes
}
