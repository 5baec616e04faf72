//! The tracking source seam.
//!
//! Platform AR frameworks are wrapped as [`TrackingSource`] implementations.
//! A source owns the native session and reports through the
//! [`TrackingSink`] it is handed on start; the sink stamps every update with
//! the session it belongs to. The core never depends on a concrete platform
//! type.

use std::sync::Arc;

use nalgebra::Vector3;

use crate::error::ArError;

use super::pose::{DetectedPlane, FieldOfView, PointCloud, TrackingPose};
use super::state::SessionId;

/// Why the platform reports degraded tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionReason {
    InsufficientFeatures,
    ExcessiveMotion,
    Relocalizing,
    SessionInterrupted,
}

/// Receiver side of the canonical tracking events.
///
/// Called on the source's own thread; implementations must not block.
pub trait TrackingHandler: Send + Sync {
    fn pose_updated(&self, session: SessionId, pose: TrackingPose) -> Result<(), ArError>;

    fn field_of_view_updated(&self, session: SessionId, fov: FieldOfView) -> Result<(), ArError>;

    fn planes_updated(
        &self,
        session: SessionId,
        planes: Vec<DetectedPlane>,
    ) -> Result<(), ArError>;

    fn points_updated(&self, session: SessionId, points: PointCloud) -> Result<(), ArError>;

    fn tracking_interrupted(&self, session: SessionId, reason: InterruptionReason);

    fn tracking_resumed(&self, session: SessionId);
}

/// Session-stamped handle a [`TrackingSource`] reports through.
#[derive(Clone)]
pub struct TrackingSink {
    session: SessionId,
    handler: Arc<dyn TrackingHandler>,
}

impl TrackingSink {
    pub fn new(session: SessionId, handler: Arc<dyn TrackingHandler>) -> Self {
        Self { session, handler }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn pose(&self, pose: TrackingPose) -> Result<(), ArError> {
        self.handler.pose_updated(self.session, pose)
    }

    pub fn field_of_view(&self, fov: FieldOfView) -> Result<(), ArError> {
        self.handler.field_of_view_updated(self.session, fov)
    }

    pub fn planes(&self, planes: Vec<DetectedPlane>) -> Result<(), ArError> {
        self.handler.planes_updated(self.session, planes)
    }

    pub fn points(&self, points: PointCloud) -> Result<(), ArError> {
        self.handler.points_updated(self.session, points)
    }

    pub fn interrupted(&self, reason: InterruptionReason) {
        self.handler.tracking_interrupted(self.session, reason);
    }

    pub fn resumed(&self) {
        self.handler.tracking_resumed(self.session);
    }
}

impl std::fmt::Debug for TrackingSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingSink")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// A platform AR tracking subsystem.
pub trait TrackingSource: Send {
    fn name(&self) -> &str;

    /// Begin a native session reporting into `sink`.
    ///
    /// Fails with [`ArError::PermissionDenied`] or
    /// [`ArError::PlatformUnsupported`] instead of silently producing nothing.
    fn start(&mut self, sink: TrackingSink) -> Result<(), ArError>;

    /// Tear the native session down. Must be idempotent.
    fn stop(&mut self);

    /// World-space point on a detected surface under a screen pixel, in the
    /// current session's tracking frame.
    fn hit_test(&self, _screen_x: f64, _screen_y: f64) -> Option<Vector3<f64>> {
        None
    }
}
