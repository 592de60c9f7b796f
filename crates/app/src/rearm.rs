//! Daily re-arm job — recomputes and reinstalls the day's timers.
//!
//! One cycle runs: load scene configuration fresh → fetch today's sunset
//! under a bounded timeout → compute firing points → hand the complete
//! set to the registry in a single `arm_all`. A failed configuration
//! read or a registry violation aborts the cycle and leaves the previous
//! timers armed; a failed or slow sunset fetch only degrades the cycle
//! to the no-sunset path. Stale but correct beats fresh but broken.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;
use tracing::{error, info, warn};

use pillar_domain::error::PillarError;
use pillar_domain::schedule::{Generation, compute_firing_points};
use pillar_domain::time::{self, Timestamp, local_date, next_occurrence};

use crate::ports::{AstronomySource, DeviceActuator, Location, SceneSource};
use crate::registry::TimerRegistry;

/// Orchestrates the once-per-day schedule recomputation.
pub struct DailyRearmJob<S, C, A> {
    scenes: S,
    astronomy: C,
    registry: TimerRegistry<A>,
    location: Location,
    tz: Tz,
    rearm_time: NaiveTime,
    fetch_timeout: Duration,
}

impl<S, C, A> DailyRearmJob<S, C, A>
where
    S: SceneSource,
    C: AstronomySource,
    A: DeviceActuator + Send + Sync + 'static,
{
    /// Create a job that re-arms `registry` every day at `rearm_time`
    /// (interpreted in `tz`), bounding each sunset fetch by
    /// `fetch_timeout`.
    pub fn new(
        scenes: S,
        astronomy: C,
        registry: TimerRegistry<A>,
        location: Location,
        tz: Tz,
        rearm_time: NaiveTime,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            scenes,
            astronomy,
            registry,
            location,
            tz,
            rearm_time,
            fetch_timeout,
        }
    }

    /// Run one re-arm cycle.
    ///
    /// # Errors
    ///
    /// Returns [`PillarError::Config`] when the scene document cannot be
    /// loaded, or [`PillarError::Registry`] when the computed batch is
    /// internally inconsistent. In both cases the registry keeps the
    /// previously armed timers. Astronomy failures are *not* errors
    /// here; they degrade to the absent-sunset path.
    pub async fn run_cycle(&self) -> Result<Generation, PillarError> {
        let scenes = self.scenes.load().await?;
        let now = time::now();
        let today = local_date(self.tz, now);

        let sunset = self.fetch_sunset(today).await;
        let points = compute_firing_points(today, &scenes, sunset, self.tz);
        let generation = self.registry.arm_all(points)?;
        info!(
            %generation,
            date = %today,
            sunset_known = sunset.is_some(),
            armed = self.registry.armed_count(),
            "re-arm cycle complete"
        );
        Ok(generation)
    }

    /// Run forever: one cycle immediately (the first run happens at
    /// process start), then one per day at the configured re-arm time.
    pub async fn run(self) {
        loop {
            if let Err(err) = self.run_cycle().await {
                error!(error = %err, "re-arm cycle aborted; previous timers stay armed");
            }
            let now = time::now();
            let next = next_occurrence(self.rearm_time, self.tz, now);
            info!(at = %next, "sleeping until next re-arm");
            let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(delay).await;
        }
    }

    /// Today's sunset, or `None` when the upstream failed or took too
    /// long — never an error for the cycle.
    async fn fetch_sunset(&self, date: NaiveDate) -> Option<Timestamp> {
        let fetch = self.astronomy.sun_times(&self.location, date);
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(times)) => Some(times.sunset),
            Ok(Err(err)) => {
                warn!(error = %err, "sunset fetch failed; arming non-sunset scenes only");
                None
            }
            Err(_) => {
                warn!(
                    timeout = ?self.fetch_timeout,
                    "sunset fetch timed out; arming non-sunset scenes only"
                );
                None
            }
        }
    }
}
