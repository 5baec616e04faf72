//! Synthetic tracking source driven by hand, for tests and headless use.
//!
//! The [`SimulatedTrackingSource`] is handed to the system; the paired
//! [`SimulatedHandle`] stays with the caller and plays the platform's role:
//! it pushes poses, intrinsics and quality signals into whichever session is
//! currently running.

use std::sync::Arc;

use nalgebra::Vector3;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::ArError;

use super::pose::{DetectedPlane, FieldOfView, PointCloud, TrackingPose};
use super::source::{InterruptionReason, TrackingSink, TrackingSource};

#[derive(Debug, Default)]
struct Inner {
    sink: Option<TrackingSink>,
    starts: usize,
    stops: usize,
    start_error: Option<ArError>,
    surface_hit: Option<Vector3<f64>>,
    initial_fov: Option<FieldOfView>,
}

pub struct SimulatedTrackingSource {
    inner: Arc<Mutex<Inner>>,
}

/// Caller-side control of a [`SimulatedTrackingSource`].
#[derive(Clone)]
pub struct SimulatedHandle {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedTrackingSource {
    pub fn new() -> (Self, SimulatedHandle) {
        let inner = Arc::new(Mutex::new(Inner::default()));
        (
            Self {
                inner: Arc::clone(&inner),
            },
            SimulatedHandle { inner },
        )
    }
}

impl TrackingSource for SimulatedTrackingSource {
    fn name(&self) -> &str {
        "simulated"
    }

    fn start(&mut self, sink: TrackingSink) -> Result<(), ArError> {
        let fov = {
            let mut inner = self.inner.lock();
            if let Some(err) = inner.start_error.clone() {
                return Err(err);
            }
            inner.starts += 1;
            inner.sink = Some(sink.clone());
            inner.initial_fov
        };

        // Outside the lock: the sink calls back into the system
        if let Some(fov) = fov {
            let _ = sink.field_of_view(fov);
        }
        Ok(())
    }

    fn stop(&mut self) {
        let mut inner = self.inner.lock();
        if inner.sink.take().is_some() {
            inner.stops += 1;
        }
    }

    fn hit_test(&self, _screen_x: f64, _screen_y: f64) -> Option<Vector3<f64>> {
        self.inner.lock().surface_hit
    }
}

impl SimulatedHandle {
    /// Sink of the running session, if any.
    pub fn sink(&self) -> Option<TrackingSink> {
        self.inner.lock().sink.clone()
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().sink.is_some()
    }

    pub fn starts(&self) -> usize {
        self.inner.lock().starts
    }

    pub fn stops(&self) -> usize {
        self.inner.lock().stops
    }

    /// Make subsequent starts fail with `error` (`None` restores success).
    pub fn fail_starts_with(&self, error: Option<ArError>) {
        self.inner.lock().start_error = error;
    }

    /// Point returned by hit tests (`None`: nothing under any pixel).
    pub fn set_surface_hit(&self, hit: Option<Vector3<f64>>) {
        self.inner.lock().surface_hit = hit;
    }

    /// Intrinsics reported as soon as a session starts.
    pub fn set_initial_field_of_view(&self, fov: Option<FieldOfView>) {
        self.inner.lock().initial_fov = fov;
    }

    pub fn push_pose(&self, pose: TrackingPose) -> Result<(), ArError> {
        match self.sink() {
            Some(sink) => sink.pose(pose),
            None => {
                debug!("simulated pose with no running session");
                Ok(())
            }
        }
    }

    pub fn push_field_of_view(&self, fov: FieldOfView) -> Result<(), ArError> {
        self.sink().map_or(Ok(()), |sink| sink.field_of_view(fov))
    }

    pub fn push_planes(&self, planes: Vec<DetectedPlane>) -> Result<(), ArError> {
        self.sink().map_or(Ok(()), |sink| sink.planes(planes))
    }

    pub fn push_points(&self, points: PointCloud) -> Result<(), ArError> {
        self.sink().map_or(Ok(()), |sink| sink.points(points))
    }

    pub fn interrupt(&self, reason: InterruptionReason) {
        if let Some(sink) = self.sink() {
            sink.interrupted(reason);
        }
    }

    pub fn resume(&self) {
        if let Some(sink) = self.sink() {
            sink.resumed();
        }
    }
}
