//! Schedule computation — turning scene definitions into the day's
//! concrete firing points.
//!
//! Everything here is a pure function of its inputs: the calendar date,
//! the loaded scenes, and (optionally) the day's sunset instant. No
//! clock reads, no IO, so the arithmetic is unit-testable against
//! literal timestamps.

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::scene::{DeviceAction, DeviceState, OnAnchor, SceneDefinition, SceneId};
use crate::time::Timestamp;

/// Whether a firing point switches its scene on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FiringKind {
    On,
    Off,
}

impl std::fmt::Display for FiringKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => f.write_str("on"),
            Self::Off => f.write_str("off"),
        }
    }
}

/// One concrete (time-of-day, action-list) instance derived from a scene
/// for a specific calendar day. Produced fresh every re-arm cycle and
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct FiringPoint {
    pub time: NaiveTime,
    pub scene: SceneId,
    pub kind: FiringKind,
    pub actions: Vec<DeviceAction>,
}

impl FiringPoint {
    /// The registry slot this point occupies.
    #[must_use]
    pub fn slot(&self) -> (SceneId, FiringKind) {
        (self.scene, self.kind)
    }
}

/// Monotonically increasing tag identifying which re-arm cycle produced
/// a given armed timer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Generation(u64);

impl Generation {
    /// The successor generation.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Correct an implausible sunset instant.
///
/// Some astronomy feeds report the sunset in the wrong half of the day
/// (an AM timestamp for a PM event). A "sunset" before local noon is
/// nonsensical, so it is shifted forward by 12 hours before use. This is
/// a documented workaround for a known upstream quirk, not a general
/// guarantee about feed behaviour.
#[must_use]
pub fn correct_sunset(sunset: Timestamp, tz: Tz) -> Timestamp {
    if sunset.with_timezone(&tz).hour() < 12 {
        sunset + Duration::hours(12)
    } else {
        sunset
    }
}

/// Compute the full set of firing points for `date`.
///
/// - Absolute on-anchors pass through verbatim; sunset-relative anchors
///   resolve to the local clock time of the corrected sunset minus the
///   configured offset. The feed's reported calendar date is discarded
///   in favour of `date` (another known quirk: instants a day off).
/// - A sunset-relative scene with no sunset available this cycle emits
///   no "on" point; its "off" point is still produced.
/// - "On" points carry the scene's actions filtered to `state == on`.
///   "Off" points always carry the full all-devices-off list, so a
///   device present in an on-list but forgotten in symmetry is still
///   switched off.
/// - Points whose action list ends up empty are not emitted.
#[must_use]
pub fn compute_firing_points(
    date: NaiveDate,
    scenes: &[SceneDefinition],
    sunset: Option<Timestamp>,
    tz: Tz,
) -> Vec<FiringPoint> {
    let all_off = all_devices_off(scenes);
    let mut points = Vec::with_capacity(scenes.len() * 2);

    for scene in scenes {
        let on_time = match scene.on_anchor {
            OnAnchor::Time(time) => Some(time),
            OnAnchor::SunsetRelative { offset_minutes } => {
                sunset.map(|instant| sunset_on_time(instant, offset_minutes, date, tz))
            }
        };

        if let Some(time) = on_time {
            let actions: Vec<DeviceAction> = scene
                .actions
                .iter()
                .filter(|action| action.state.is_on())
                .cloned()
                .collect();
            if !actions.is_empty() {
                points.push(FiringPoint {
                    time,
                    scene: scene.id,
                    kind: FiringKind::On,
                    actions,
                });
            }
        }

        if !all_off.is_empty() {
            points.push(FiringPoint {
                time: scene.off_time,
                scene: scene.id,
                kind: FiringKind::Off,
                actions: all_off.clone(),
            });
        }
    }

    points
}

/// The "everything off" action list: every device mentioned anywhere in
/// the configuration, first-seen order, deduplicated.
fn all_devices_off(scenes: &[SceneDefinition]) -> Vec<DeviceAction> {
    let mut actions: Vec<DeviceAction> = Vec::new();
    for scene in scenes {
        for action in &scene.actions {
            if actions.iter().all(|seen| seen.device != action.device) {
                actions.push(DeviceAction::switch(action.device.clone(), DeviceState::Off));
            }
        }
    }
    actions
}

/// Local on-time for a sunset-relative anchor: clock time of the
/// corrected sunset, rebased onto `date`, minus the offset.
fn sunset_on_time(sunset: Timestamp, offset_minutes: i64, date: NaiveDate, tz: Tz) -> NaiveTime {
    let clock = correct_sunset(sunset, tz).with_timezone(&tz).time();
    (date.and_time(clock) - Duration::minutes(offset_minutes)).time()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Europe::London;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn on(device: &str) -> DeviceAction {
        DeviceAction {
            device: device.into(),
            state: DeviceState::On,
            brightness: Some(80),
            xy: None,
        }
    }

    fn three_scenes() -> Vec<SceneDefinition> {
        vec![
            SceneDefinition::builder(SceneId::Morning)
                .on_at(hm(6, 45))
                .off_at(hm(8, 30))
                .action(on("1"))
                .action(on("2"))
                .build()
                .unwrap(),
            SceneDefinition::builder(SceneId::Evening)
                .on_before_sunset(30)
                .off_at(hm(23, 0))
                .action(on("2"))
                .action(on("3"))
                .build()
                .unwrap(),
            SceneDefinition::builder(SceneId::EveningTv)
                .on_at(hm(19, 30))
                .off_at(hm(22, 30))
                .action(on("4"))
                .build()
                .unwrap(),
        ]
    }

    fn find(points: &[FiringPoint], scene: SceneId, kind: FiringKind) -> Option<&FiringPoint> {
        points.iter().find(|p| p.scene == scene && p.kind == kind)
    }

    #[test]
    fn should_be_deterministic_for_fixed_inputs() {
        let scenes = three_scenes();
        // January London sunset at 17:02 UTC == 17:02 local.
        let sunset = Some(utc(2024, 1, 15, 17, 2));
        let a = compute_firing_points(date(), &scenes, sunset, London);
        let b = compute_firing_points(date(), &scenes, sunset, London);
        assert_eq!(a, b);
    }

    #[test]
    fn should_anchor_evening_on_point_to_offset_before_sunset() {
        let points = compute_firing_points(
            date(),
            &three_scenes(),
            Some(utc(2024, 1, 15, 17, 2)),
            London,
        );
        let evening_on = find(&points, SceneId::Evening, FiringKind::On).unwrap();
        assert_eq!(evening_on.time, hm(16, 32));
        let evening_off = find(&points, SceneId::Evening, FiringKind::Off).unwrap();
        assert_eq!(evening_off.time, hm(23, 0));
    }

    #[test]
    fn should_correct_pre_noon_sunset_by_adding_twelve_hours() {
        // The feed reports 05:02 AM for a 17:02 sunset.
        let corrected = correct_sunset(utc(2024, 1, 15, 5, 2), London);
        assert_eq!(corrected, utc(2024, 1, 15, 17, 2));

        // A plausible afternoon instant passes through untouched.
        let untouched = correct_sunset(utc(2024, 1, 15, 17, 2), London);
        assert_eq!(untouched, utc(2024, 1, 15, 17, 2));
    }

    #[test]
    fn should_apply_correction_inside_firing_point_computation() {
        let points = compute_firing_points(
            date(),
            &three_scenes(),
            Some(utc(2024, 1, 15, 5, 2)),
            London,
        );
        let evening_on = find(&points, SceneId::Evening, FiringKind::On).unwrap();
        assert_eq!(evening_on.time, hm(16, 32));
    }

    #[test]
    fn should_discard_feed_calendar_date_in_favour_of_requested_date() {
        // Same clock time, reported a day early.
        let points = compute_firing_points(
            date(),
            &three_scenes(),
            Some(utc(2024, 1, 14, 17, 2)),
            London,
        );
        let evening_on = find(&points, SceneId::Evening, FiringKind::On).unwrap();
        assert_eq!(evening_on.time, hm(16, 32));
    }

    #[test]
    fn should_omit_sunset_scene_on_point_when_sunset_absent() {
        let points = compute_firing_points(date(), &three_scenes(), None, London);
        assert!(find(&points, SceneId::Evening, FiringKind::On).is_none());
        // The off point does not depend on sunset and is still produced,
        // as are the non-sunset scenes.
        assert!(find(&points, SceneId::Evening, FiringKind::Off).is_some());
        assert_eq!(
            find(&points, SceneId::Morning, FiringKind::On).unwrap().time,
            hm(6, 45)
        );
        assert_eq!(
            find(&points, SceneId::EveningTv, FiringKind::On)
                .unwrap()
                .time,
            hm(19, 30)
        );
    }

    #[test]
    fn should_filter_on_points_to_on_state_actions() {
        let scenes = vec![
            SceneDefinition::builder(SceneId::Morning)
                .on_at(hm(6, 45))
                .off_at(hm(8, 30))
                .action(on("1"))
                .action(DeviceAction::switch("2", DeviceState::Off))
                .build()
                .unwrap(),
        ];
        let points = compute_firing_points(date(), &scenes, None, London);
        let morning_on = find(&points, SceneId::Morning, FiringKind::On).unwrap();
        assert_eq!(morning_on.actions.len(), 1);
        assert_eq!(morning_on.actions[0].device.as_str(), "1");
    }

    #[test]
    fn should_carry_full_device_superset_on_off_points() {
        let points = compute_firing_points(
            date(),
            &three_scenes(),
            Some(utc(2024, 1, 15, 17, 2)),
            London,
        );
        // Device "4" only appears in the eveningtv on-list, device "1"
        // only in morning; every off point still covers all of 1–4.
        let morning_off = find(&points, SceneId::Morning, FiringKind::Off).unwrap();
        let devices: Vec<&str> = morning_off
            .actions
            .iter()
            .map(|a| a.device.as_str())
            .collect();
        assert_eq!(devices, vec!["1", "2", "3", "4"]);
        assert!(morning_off.actions.iter().all(|a| a.state == DeviceState::Off));

        let tv_off = find(&points, SceneId::EveningTv, FiringKind::Off).unwrap();
        assert_eq!(tv_off.actions, morning_off.actions);
    }

    #[test]
    fn should_not_emit_on_point_when_no_on_state_actions_remain() {
        let scenes = vec![
            SceneDefinition::builder(SceneId::Morning)
                .on_at(hm(6, 45))
                .off_at(hm(8, 30))
                .action(DeviceAction::switch("1", DeviceState::Off))
                .build()
                .unwrap(),
        ];
        let points = compute_firing_points(date(), &scenes, None, London);
        assert!(find(&points, SceneId::Morning, FiringKind::On).is_none());
        assert!(find(&points, SceneId::Morning, FiringKind::Off).is_some());
    }

    #[test]
    fn should_emit_nothing_for_empty_scene_list() {
        assert!(compute_firing_points(date(), &[], None, London).is_empty());
    }

    #[test]
    fn should_increment_generation_monotonically() {
        let g0 = Generation::default();
        let g1 = g0.next();
        assert!(g1 > g0);
        assert_eq!(g1.as_u64(), g0.as_u64() + 1);
    }

    #[test]
    fn should_handle_summer_timezone_offset_for_sunset_anchor() {
        // 2024-07-01 London sunset is 21:21 local, reported as 20:21 UTC.
        let scenes = three_scenes();
        let points = compute_firing_points(
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            &scenes,
            Some(utc(2024, 7, 1, 20, 21)),
            London,
        );
        let evening_on = find(&points, SceneId::Evening, FiringKind::On).unwrap();
        assert_eq!(evening_on.time, hm(20, 51));
    }
}
