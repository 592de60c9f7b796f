//! Timer registry — the live set of armed timers.
//!
//! The registry owns every scheduled firing and is the only component
//! that mutates the armed set. Each slot `(scene, kind)` holds at most
//! one armed timer at any instant; arming a slot cancels whatever was
//! there first. Batches are tagged with a monotonically increasing
//! [`Generation`], and a batch only ever touches the slots it names, so
//! a cycle that skipped a slot (e.g. a failed sunset fetch) leaves the
//! previous day's timer running under its old tag.
//!
//! Firing protocol: a timer that wakes first *claims* its slot — it
//! removes its own entry under the registry lock, verifying the
//! generation tag still matches. `arm_all` and `cancel_all` only abort
//! timers still present in the map, so once claimed, a firing timer
//! runs its action list to completion and cannot be interrupted
//! mid-list.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pillar_domain::error::{PillarError, RegistryViolation};
use pillar_domain::scene::{DeviceAction, SceneId};
use pillar_domain::schedule::{FiringKind, FiringPoint, Generation};
use pillar_domain::time::{self, Timestamp, next_occurrence};

use crate::ports::DeviceActuator;

/// A registry slot: one scene, one direction.
pub type Slot = (SceneId, FiringKind);

/// Owns the currently armed timers and serializes all mutation.
///
/// Cheap to clone; clones share the same armed set.
pub struct TimerRegistry<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for TimerRegistry<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<A> {
    actuator: A,
    tz: Tz,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    generation: Generation,
    slots: HashMap<Slot, ArmedTimer>,
}

/// The live, registry-owned scheduled instance of one firing point.
struct ArmedTimer {
    generation: Generation,
    fire_at: Timestamp,
    handle: JoinHandle<()>,
}

impl<A> TimerRegistry<A>
where
    A: DeviceActuator + Send + Sync + 'static,
{
    /// Create an empty registry firing through `actuator`, with
    /// times-of-day interpreted in `tz`.
    #[must_use]
    pub fn new(actuator: A, tz: Tz) -> Self {
        Self {
            inner: Arc::new(Inner {
                actuator,
                tz,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Replace the timers for every slot named in `points` with a fresh
    /// batch under a new generation.
    ///
    /// Slots *not* named are left untouched under their old generation —
    /// this is the partial-failure policy: a cycle that could not
    /// recompute a slot keeps yesterday's timer instead of dropping it.
    /// Each timer is armed at the next occurrence of its time-of-day.
    ///
    /// # Errors
    ///
    /// Returns [`PillarError::Registry`] if `points` names the same slot
    /// twice; the registry is not modified in that case.
    pub fn arm_all(&self, points: Vec<FiringPoint>) -> Result<Generation, PillarError> {
        // A batch implying two live timers for one slot is an internal
        // bug; reject before any cancellation so a bad batch cannot
        // half-replace a generation.
        for (index, point) in points.iter().enumerate() {
            if points[..index].iter().any(|seen| seen.slot() == point.slot()) {
                let (scene, kind) = point.slot();
                return Err(RegistryViolation::DuplicateSlot { scene, kind }.into());
            }
        }

        let now = time::now();
        let mut state = self.lock();
        let generation = state.generation.next();
        state.generation = generation;

        for point in points {
            let slot = point.slot();
            if let Some(old) = state.slots.remove(&slot) {
                old.handle.abort();
                debug!(
                    scene = %slot.0,
                    kind = %slot.1,
                    generation = %old.generation,
                    "cancelled previously armed timer"
                );
            }
            let fire_at = next_occurrence(point.time, self.inner.tz, now);
            let handle = self.spawn_timer(slot, generation, point.actions, fire_at, now);
            info!(
                scene = %slot.0,
                kind = %slot.1,
                at = %fire_at,
                generation = %generation,
                "armed timer"
            );
            state.slots.insert(
                slot,
                ArmedTimer {
                    generation,
                    fire_at,
                    handle,
                },
            );
        }

        Ok(generation)
    }

    /// Cancel every armed timer unconditionally. Shutdown only; there is
    /// no per-timer cancellation path.
    pub fn cancel_all(&self) {
        let mut state = self.lock();
        for (slot, timer) in state.slots.drain() {
            timer.handle.abort();
            debug!(scene = %slot.0, kind = %slot.1, "cancelled timer at shutdown");
        }
    }

    /// The generation allocated by the most recent [`arm_all`](Self::arm_all).
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.lock().generation
    }

    /// Number of currently armed timers.
    #[must_use]
    pub fn armed_count(&self) -> usize {
        self.lock().slots.len()
    }

    /// The generation tag and deadline of the timer armed for a slot.
    #[must_use]
    pub fn armed(&self, scene: SceneId, kind: FiringKind) -> Option<(Generation, Timestamp)> {
        self.lock()
            .slots
            .get(&(scene, kind))
            .map(|timer| (timer.generation, timer.fire_at))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn_timer(
        &self,
        slot: Slot,
        generation: Generation,
        actions: Vec<DeviceAction>,
        fire_at: Timestamp,
        now: Timestamp,
    ) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let delay = (fire_at - now).to_std().unwrap_or(std::time::Duration::ZERO);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            // Claim the slot before touching any device. Once the entry
            // is gone from the map, no cancellation path can reach this
            // task, so the action list below always runs to completion.
            let claimed = {
                let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);
                match state.slots.get(&slot) {
                    Some(armed) if armed.generation == generation => {
                        state.slots.remove(&slot);
                        true
                    }
                    _ => false,
                }
            };
            if !claimed {
                return;
            }

            info!(scene = %slot.0, kind = %slot.1, generation = %generation, "timer firing");
            for action in &actions {
                if let Err(err) = inner.actuator.execute(action).await {
                    // One failing device must not block the rest of the
                    // scene; log and carry on.
                    warn!(device = %action.device, error = %err, "actuation failed, continuing");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveTime, Timelike};
    use chrono_tz::Tz;
    use pillar_domain::error::ActuationError;
    use pillar_domain::scene::{DeviceAction, DeviceId, DeviceState};
    use std::future::Future;

    // ── Recording actuator ─────────────────────────────────────────

    #[derive(Default)]
    struct RecordingActuator {
        executed: Mutex<Vec<DeviceAction>>,
        /// Devices that refuse every command.
        failing: Vec<DeviceId>,
    }

    impl RecordingActuator {
        fn failing_on(devices: &[&str]) -> Self {
            Self {
                executed: Mutex::new(Vec::new()),
                failing: devices.iter().map(|d| DeviceId::from(*d)).collect(),
            }
        }

        fn executed(&self) -> Vec<DeviceAction> {
            self.executed.lock().unwrap().clone()
        }
    }

    impl DeviceActuator for RecordingActuator {
        fn execute(
            &self,
            action: &DeviceAction,
        ) -> impl Future<Output = Result<(), PillarError>> + Send {
            let failed = self.failing.contains(&action.device);
            if !failed {
                self.executed.lock().unwrap().push(action.clone());
            }
            let device = action.device.clone();
            async move {
                if failed {
                    Err(ActuationError {
                        device,
                        reason: "refused".to_string(),
                    }
                    .into())
                } else {
                    Ok(())
                }
            }
        }
    }

    // ── Helpers ────────────────────────────────────────────────────

    const TZ: Tz = chrono_tz::UTC;

    /// Time-of-day `minutes` from now, so the armed delay is predictable
    /// under the paused test clock.
    fn in_minutes(minutes: i64) -> NaiveTime {
        (time::now() + Duration::minutes(minutes))
            .time()
            .with_nanosecond(0)
            .unwrap()
    }

    fn point(scene: SceneId, kind: FiringKind, time: NaiveTime, devices: &[&str]) -> FiringPoint {
        let state = match kind {
            FiringKind::On => DeviceState::On,
            FiringKind::Off => DeviceState::Off,
        };
        FiringPoint {
            time,
            scene,
            kind,
            actions: devices
                .iter()
                .map(|d| DeviceAction::switch(*d, state))
                .collect(),
        }
    }

    fn registry() -> TimerRegistry<Arc<RecordingActuator>> {
        TimerRegistry::new(Arc::new(RecordingActuator::default()), TZ)
    }

    async fn sleep_minutes(minutes: u64) {
        tokio::time::sleep(std::time::Duration::from_secs(minutes * 60)).await;
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_arm_one_timer_per_point() {
        let registry = registry();
        let generation = registry
            .arm_all(vec![
                point(SceneId::Morning, FiringKind::On, in_minutes(60), &["1"]),
                point(SceneId::Morning, FiringKind::Off, in_minutes(120), &["1"]),
            ])
            .unwrap();

        assert_eq!(registry.armed_count(), 2);
        assert_eq!(registry.generation(), generation);
        assert!(registry.armed(SceneId::Morning, FiringKind::On).is_some());
        registry.cancel_all();
    }

    #[tokio::test]
    async fn should_replace_named_slots_and_leave_others_untouched() {
        let registry = registry();
        let first = registry
            .arm_all(vec![
                point(SceneId::Morning, FiringKind::On, in_minutes(60), &["1"]),
                point(SceneId::Evening, FiringKind::On, in_minutes(600), &["2"]),
            ])
            .unwrap();

        // Second batch recomputes morning only; evening must keep its
        // old generation and deadline.
        let (_, evening_deadline) = registry.armed(SceneId::Evening, FiringKind::On).unwrap();
        let second = registry
            .arm_all(vec![point(
                SceneId::Morning,
                FiringKind::On,
                in_minutes(90),
                &["1"],
            )])
            .unwrap();

        assert_eq!(second, first.next());
        assert_eq!(registry.armed_count(), 2);

        let (morning_generation, _) = registry.armed(SceneId::Morning, FiringKind::On).unwrap();
        assert_eq!(morning_generation, second);

        let (evening_generation, evening_at) =
            registry.armed(SceneId::Evening, FiringKind::On).unwrap();
        assert_eq!(evening_generation, first);
        assert_eq!(evening_at, evening_deadline);
        registry.cancel_all();
    }

    #[tokio::test]
    async fn should_never_hold_two_timers_for_one_slot() {
        let registry = registry();
        for _ in 0..3 {
            registry
                .arm_all(vec![
                    point(SceneId::Morning, FiringKind::On, in_minutes(60), &["1"]),
                    point(SceneId::Morning, FiringKind::Off, in_minutes(120), &["1"]),
                    point(SceneId::EveningTv, FiringKind::On, in_minutes(180), &["4"]),
                ])
                .unwrap();
        }
        assert_eq!(registry.armed_count(), 3);
        registry.cancel_all();
    }

    #[tokio::test]
    async fn should_reject_duplicate_slot_within_one_batch() {
        let registry = registry();
        registry
            .arm_all(vec![point(
                SceneId::Morning,
                FiringKind::On,
                in_minutes(60),
                &["1"],
            )])
            .unwrap();
        let before = registry.generation();

        let result = registry.arm_all(vec![
            point(SceneId::Evening, FiringKind::On, in_minutes(60), &["2"]),
            point(SceneId::Evening, FiringKind::On, in_minutes(90), &["3"]),
        ]);

        assert!(matches!(
            result,
            Err(PillarError::Registry(RegistryViolation::DuplicateSlot {
                scene: SceneId::Evening,
                kind: FiringKind::On,
            }))
        ));
        // The bad batch must not have touched anything.
        assert_eq!(registry.generation(), before);
        assert_eq!(registry.armed_count(), 1);
        registry.cancel_all();
    }

    #[tokio::test(start_paused = true)]
    async fn should_execute_actions_in_order_and_remove_itself_after_firing() {
        let actuator = Arc::new(RecordingActuator::default());
        let registry = TimerRegistry::new(Arc::clone(&actuator), TZ);
        registry
            .arm_all(vec![point(
                SceneId::Morning,
                FiringKind::On,
                in_minutes(2),
                &["1", "2", "3"],
            )])
            .unwrap();

        sleep_minutes(4).await;

        let executed = actuator.executed();
        let devices: Vec<&str> = executed.iter().map(|a| a.device.as_str()).collect();
        assert_eq!(devices, vec!["1", "2", "3"]);
        assert_eq!(registry.armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_continue_past_failing_action() {
        let actuator = Arc::new(RecordingActuator::failing_on(&["2"]));
        let registry = TimerRegistry::new(Arc::clone(&actuator), TZ);
        registry
            .arm_all(vec![point(
                SceneId::Evening,
                FiringKind::Off,
                in_minutes(2),
                &["1", "2", "3", "4"],
            )])
            .unwrap();

        sleep_minutes(4).await;

        // Action 2 of 4 errored; 3 and 4 still executed.
        let executed = actuator.executed();
        let devices: Vec<&str> = executed.iter().map(|a| a.device.as_str()).collect();
        assert_eq!(devices, vec!["1", "3", "4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_fire_cancelled_timer() {
        let actuator = Arc::new(RecordingActuator::default());
        let registry = TimerRegistry::new(Arc::clone(&actuator), TZ);
        registry
            .arm_all(vec![point(
                SceneId::Morning,
                FiringKind::On,
                in_minutes(2),
                &["1"],
            )])
            .unwrap();
        // Re-arm the same slot further out before the first deadline.
        registry
            .arm_all(vec![point(
                SceneId::Morning,
                FiringKind::On,
                in_minutes(10),
                &["1"],
            )])
            .unwrap();

        sleep_minutes(5).await;
        assert!(actuator.executed().is_empty());

        sleep_minutes(7).await;
        assert_eq!(actuator.executed().len(), 1);
        assert_eq!(registry.armed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_cancel_everything_at_shutdown() {
        let actuator = Arc::new(RecordingActuator::default());
        let registry = TimerRegistry::new(Arc::clone(&actuator), TZ);
        registry
            .arm_all(vec![
                point(SceneId::Morning, FiringKind::On, in_minutes(2), &["1"]),
                point(SceneId::Evening, FiringKind::On, in_minutes(3), &["2"]),
            ])
            .unwrap();

        registry.cancel_all();
        assert_eq!(registry.armed_count(), 0);

        sleep_minutes(10).await;
        assert!(actuator.executed().is_empty());
    }
}
