use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use rust_arview::config::ArConfig;
use rust_arview::io::PoseLog;
use rust_arview::scene::{FlatScene, SceneHost};
use rust_arview::system::{ArEvent, ArSystem};
use rust_arview::tracking::ReplayTrackingSource;
use rust_arview::viz::OverlaySink;

/// Render tick of the headless loop (~60 Hz).
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Keep rendering this long after the recording should have ended.
const DRAIN_MARGIN: Duration = Duration::from_millis(500);

fn overlay_sink() -> Result<Box<dyn OverlaySink>> {
    #[cfg(feature = "rerun")]
    {
        let sink = rust_arview::viz::rerun::RerunOverlay::spawn("rust-arview")?;
        Ok(Box::new(sink))
    }
    #[cfg(not(feature = "rerun"))]
    {
        Ok(Box::new(rust_arview::viz::LogOverlay::default()))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "demos/arview.yaml".to_string());
    let poses_path = args.next().unwrap_or_else(|| "demos/walk.csv".to_string());

    let config = ArConfig::from_yaml_file(&config_path)?;
    let log = PoseLog::load(&poses_path)?;
    info!(
        poses = log.len(),
        duration_s = log.duration_s(),
        "loaded pose log {}",
        poses_path
    );

    let rate = config.replay.playback_rate;
    let replay_time = if rate > 0.0 {
        Duration::from_secs_f64(log.duration_s() / rate)
    } else {
        Duration::ZERO
    };

    let mut scene = FlatScene::new(config.surface_height);
    let source = ReplayTrackingSource::new(log, config.replay.field_of_view, rate);
    let mut system = ArSystem::new(Box::new(source), scene.projection(), &config);
    system.set_overlay_sink(Some(overlay_sink()?));
    let events = system.subscribe();

    match config.preset()? {
        Some(preset) => system
            .change_scene(&preset, &mut scene)
            .context("Failed to start tracking")?,
        None => system.start_tracking().context("Failed to start tracking")?,
    }

    let started = Instant::now();
    while started.elapsed() < replay_time + DRAIN_MARGIN {
        let tick = Instant::now();
        let report = system.render_frame(&mut scene);

        for event in events.try_iter() {
            match event {
                ArEvent::TrackingStateChanged(state) => info!(%state, "tracking state"),
                ArEvent::TrackingReset { session } => info!(%session, "tracking reset"),
                ArEvent::TrackingInterrupted { reason, .. } => info!(?reason, "interrupted"),
                ArEvent::TrackingResumed { .. } => info!("resumed"),
                ArEvent::FieldOfViewChanged { fov, .. } => {
                    info!(vfov_deg = fov.vertical_degrees(), "field of view")
                }
                // High-rate events
                other => debug!(?other),
            }
        }

        if report.transform_updated && report.frame % 60 == 0 {
            if let Some(t) = report.transform {
                info!(
                    frame = report.frame,
                    lat = t.camera.position.latitude,
                    lon = t.camera.position.longitude,
                    alt = t.camera.position.altitude,
                    heading = t.camera.heading,
                    "camera"
                );
            }
        }

        if let Some(rest) = FRAME_INTERVAL.checked_sub(tick.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    info!(
        camera_updates = scene.camera_updates(),
        fov_updates = scene.fov_updates(),
        state = %system.tracking_state(),
        "replay done"
    );
    if let Some(t) = system.camera_transform() {
        info!(camera = ?t.camera, "final camera");
    }

    system.shutdown();
    Ok(())
}
