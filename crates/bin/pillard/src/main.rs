//! # pillard — pillar daemon
//!
//! Composition root that wires the adapters together and runs the daily
//! schedule engine.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env vars)
//! - Initialize tracing
//! - Construct the astronomy, scene-source, and actuator adapters
//! - Construct the timer registry and the daily re-arm job
//! - Spawn the job and wait for SIGINT/SIGTERM
//! - Cancel every armed timer on shutdown
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no schedule logic belongs here.

mod config;

use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use pillar_adapter_astronomy_owm::OwmAstronomy;
use pillar_adapter_lights_hue::HueActuator;
use pillar_adapter_scenes_file::FileSceneSource;
use pillar_adapter_virtual::VirtualActuator;
use pillar_app::ports::{DeviceActuator, Location};
use pillar_app::rearm::DailyRearmJob;
use pillar_app::registry::TimerRegistry;
use pillar_domain::error::PillarError;
use pillar_domain::scene::DeviceAction;

use config::Config;

/// The actuator selected at startup: a real bridge when configured,
/// otherwise the virtual one.
enum Actuator {
    Hue(HueActuator),
    Virtual(VirtualActuator),
}

impl DeviceActuator for Actuator {
    async fn execute(&self, action: &DeviceAction) -> Result<(), PillarError> {
        match self {
            Self::Hue(hue) => hue.execute(action).await,
            Self::Virtual(virt) => virt.execute(action).await,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let tz = config.timezone()?;
    let rearm_time = config.rearm_time()?;

    let scenes = FileSceneSource::new(&config.schedule.scenes_path);

    let mut astronomy = OwmAstronomy::new(config.astronomy.api_key.clone());
    if let Some(base_url) = &config.astronomy.base_url {
        astronomy = astronomy.with_base_url(base_url.clone());
    }

    let actuator = match (&config.lights.bridge_url, &config.lights.username) {
        (Some(bridge_url), Some(username)) => {
            info!(bridge = %bridge_url, "using hue bridge actuator");
            Actuator::Hue(HueActuator::new(bridge_url.clone(), username.clone()))
        }
        _ => {
            info!("no bridge configured; using virtual actuator");
            Actuator::Virtual(VirtualActuator::default())
        }
    };

    let registry = TimerRegistry::new(actuator, tz);
    let job = DailyRearmJob::new(
        scenes,
        astronomy,
        registry.clone(),
        Location::new(config.location.place.clone()),
        tz,
        rearm_time,
        Duration::from_secs(config.schedule.sunset_timeout_secs),
    );

    info!(
        place = %config.location.place,
        timezone = %tz,
        rearm = %config.schedule.rearm_time,
        "pillard starting"
    );
    let job_handle = tokio::spawn(job.run());

    shutdown_signal().await;
    info!("shutting down; cancelling all armed timers");
    job_handle.abort();
    registry.cancel_all();

    Ok(())
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
