//! Shared state between the tracking thread and the render thread.
//!
//! The `SharedState` struct holds everything both sides touch: the lifecycle
//! behind a short critical section, the origin settings, and the single-slot
//! pending buffers. It is also the handler that tracking and positioning
//! sources report into.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use nalgebra::Vector3;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::error::ArError;
use crate::geometry::{CameraTransform, GeoProjection};
use crate::origin::{LocationOverride, OriginState};
use crate::positioning::{PositioningHandler, PositioningSink};
use crate::tracking::{
    DetectedPlane, FieldOfView, InterruptionReason, Lifecycle, PointCloud, PoseAdmission,
    SessionId, TrackingHandler, TrackingPose, TrackingSink, TrackingState,
};

use super::events::{ArEvent, EventBus};
use super::pending::PendingSlot;

/// Shared state accessible by the tracking source thread and the render thread.
pub struct SharedState {
    /// Owned by the state machine; only the methods below mutate it.
    /// Lock order: `lifecycle` before `origin`.
    lifecycle: Mutex<Lifecycle>,

    /// Mirror of the lifecycle session for the lock-free stale check.
    /// 0 means no session.
    current_session: AtomicU64,

    /// Anchor, scale and overrides. Tracking reads, UI writes.
    origin: RwLock<OriginState>,

    projection: Arc<dyn GeoProjection>,

    pub(crate) transform_slot: PendingSlot<CameraTransform>,
    pub(crate) fov_slot: PendingSlot<FieldOfView>,
    pub(crate) planes_slot: PendingSlot<Vec<DetectedPlane>>,
    pub(crate) points_slot: PendingSlot<PointCloud>,

    events: EventBus,

    /// Drop poses while the source reports degraded tracking.
    mask_interrupted_poses: AtomicBool,

    /// Bumped whenever a positioning source is released.
    positioning_generation: AtomicU64,
}

impl SharedState {
    pub fn new(
        origin: OriginState,
        projection: Arc<dyn GeoProjection>,
        event_capacity: usize,
        mask_interrupted_poses: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            lifecycle: Mutex::new(Lifecycle::new()),
            current_session: AtomicU64::new(0),
            origin: RwLock::new(origin),
            projection,
            transform_slot: PendingSlot::new(),
            fov_slot: PendingSlot::new(),
            planes_slot: PendingSlot::new(),
            points_slot: PendingSlot::new(),
            events: EventBus::new(event_capacity),
            mask_interrupted_poses: AtomicBool::new(mask_interrupted_poses),
            positioning_generation: AtomicU64::new(1),
        })
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.lifecycle.lock().state()
    }

    pub fn session(&self) -> Option<SessionId> {
        match self.current_session.load(Ordering::SeqCst) {
            0 => None,
            id => Some(SessionId::new(id)),
        }
    }

    fn is_current(&self, session: SessionId) -> bool {
        self.current_session.load(Ordering::SeqCst) == session.0
    }

    pub fn origin(&self) -> RwLockReadGuard<'_, OriginState> {
        self.origin.read()
    }

    pub fn origin_mut(&self) -> RwLockWriteGuard<'_, OriginState> {
        self.origin.write()
    }

    pub fn projection(&self) -> &Arc<dyn GeoProjection> {
        &self.projection
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn set_mask_interrupted_poses(&self, mask: bool) {
        self.mask_interrupted_poses.store(mask, Ordering::SeqCst);
    }

    /// Sink stamped with `session` for a tracking source.
    pub fn tracking_sink(self: &Arc<Self>, session: SessionId) -> TrackingSink {
        TrackingSink::new(session, Arc::clone(self) as Arc<dyn TrackingHandler>)
    }

    /// Sink for a positioning source, stamped with the live generation.
    pub fn positioning_sink(self: &Arc<Self>) -> PositioningSink {
        PositioningSink::new(
            self.positioning_generation.load(Ordering::SeqCst),
            Arc::clone(self) as Arc<dyn PositioningHandler>,
        )
    }

    /// Invalidate every positioning sink handed out so far and forget the
    /// overrides they supplied.
    ///
    /// Both happen under the origin write lock, which positioning fixes also
    /// hold while checking their generation.
    pub fn retire_positioning(&self) {
        let mut origin = self.origin.write();
        self.positioning_generation.fetch_add(1, Ordering::SeqCst);
        origin.clear_overrides();
    }

    fn is_live_positioning(&self, generation: u64) -> bool {
        generation == self.positioning_generation.load(Ordering::SeqCst)
    }

    fn publish_session(&self, session: Option<SessionId>) {
        self.current_session
            .store(session.map_or(0, |s| s.0), Ordering::SeqCst);
    }

    fn clear_pending(&self) {
        self.transform_slot.clear();
        self.fov_slot.clear();
        self.planes_slot.clear();
        self.points_slot.clear();
    }

    // -- lifecycle transitions, driven by ArSystem ------------------------

    /// `Stopped -> Starting`. The returned session is already current when
    /// this returns, so the source may report immediately.
    pub(crate) fn begin_start(&self) -> Option<SessionId> {
        let session = {
            let mut lc = self.lifecycle.lock();
            let session = lc.request_start()?;
            self.publish_session(Some(session));
            session
        };
        info!(%session, "tracking starting");
        self.events
            .emit(ArEvent::TrackingStateChanged(TrackingState::Starting));
        Some(session)
    }

    /// `Tracking -> Resetting` with a fresh session and a cleared offset.
    pub(crate) fn begin_reset(&self) -> Option<SessionId> {
        let session = {
            let mut lc = self.lifecycle.lock();
            let session = lc.request_reset()?;
            self.publish_session(Some(session));
            self.clear_pending();
            self.origin.write().clear_initial_offset();
            session
        };

        info!(%session, "tracking reset");
        self.events
            .emit(ArEvent::TrackingStateChanged(TrackingState::Resetting));
        self.events.emit(ArEvent::TrackingReset { session });
        Some(session)
    }

    /// Any state -> `Stopped`. Returns false if already stopped.
    pub(crate) fn stop(&self) -> bool {
        {
            let mut lc = self.lifecycle.lock();
            if !lc.request_stop() {
                return false;
            }
            self.publish_session(None);
            self.clear_pending();
            self.origin.write().clear_initial_offset();
        }

        info!("tracking stopped");
        self.events
            .emit(ArEvent::TrackingStateChanged(TrackingState::Stopped));
        true
    }

    pub(crate) fn start_failed(&self, session: SessionId, error: &ArError) {
        let stopped = {
            let mut lc = self.lifecycle.lock();
            let stopped = lc.start_failed(session);
            if stopped {
                self.publish_session(None);
                self.clear_pending();
            }
            stopped
        };

        if stopped {
            warn!(%session, %error, "tracking source failed to start");
            self.events
                .emit(ArEvent::TrackingStateChanged(TrackingState::Stopped));
        }
    }

    /// `point` (tracking world of the current session) relative to the
    /// session reference pose.
    pub(crate) fn session_relative_point(&self, point: &Vector3<f64>) -> Option<Vector3<f64>> {
        let lc = self.lifecycle.lock();
        let reference = lc.reference()?;
        Some(reference.inverse().transform_point(point))
    }
}

impl TrackingHandler for SharedState {
    fn pose_updated(&self, session: SessionId, pose: TrackingPose) -> Result<(), ArError> {
        if !self.is_current(session) {
            debug!(%session, "pose from stale session dropped");
            return Err(ArError::StaleSessionUpdate(session));
        }

        let pose = pose.to_se3().inspect_err(|e| {
            debug!(%session, error = %e, "pose dropped");
        })?;

        let (relative, entered_tracking) = {
            let mut lc = self.lifecycle.lock();
            if lc.is_interrupted() && self.mask_interrupted_poses.load(Ordering::SeqCst) {
                debug!(%session, "pose masked while interrupted");
                return Ok(());
            }
            match lc.admit_pose(session, &pose) {
                PoseAdmission::Stale => {
                    debug!(%session, "pose from stale session dropped");
                    return Err(ArError::StaleSessionUpdate(session));
                }
                PoseAdmission::Accepted {
                    relative,
                    entered_tracking,
                } => (relative, entered_tracking),
            }
        };

        let transform = self
            .origin
            .read()
            .camera_transform(&relative, self.projection.as_ref());

        // Teardown emits its own event after leaving this lock, so a pose
        // that gets here first is announced before it.
        let _lc = self.lifecycle.lock();
        if !self.is_current(session) {
            debug!(%session, "pose superseded while being composed");
            return Err(ArError::StaleSessionUpdate(session));
        }
        self.transform_slot.publish(session, transform);

        if entered_tracking {
            info!(%session, "tracking");
            self.events
                .emit(ArEvent::TrackingStateChanged(TrackingState::Tracking));
        }
        self.events
            .emit(ArEvent::CameraTransformChanged { session, transform });
        Ok(())
    }

    fn field_of_view_updated(&self, session: SessionId, fov: FieldOfView) -> Result<(), ArError> {
        if !self.is_current(session) {
            return Err(ArError::StaleSessionUpdate(session));
        }
        if !fov.is_valid() {
            warn!(%session, ?fov, "degenerate field of view dropped");
            return Err(ArError::InvalidPose("degenerate field of view"));
        }

        let _lc = self.lifecycle.lock();
        if !self.is_current(session) {
            return Err(ArError::StaleSessionUpdate(session));
        }
        self.fov_slot.publish(session, fov);
        self.events
            .emit(ArEvent::FieldOfViewChanged { session, fov });
        Ok(())
    }

    fn planes_updated(&self, session: SessionId, planes: Vec<DetectedPlane>) -> Result<(), ArError> {
        if !self.is_current(session) {
            return Err(ArError::StaleSessionUpdate(session));
        }
        self.planes_slot.publish(session, planes);
        Ok(())
    }

    fn points_updated(&self, session: SessionId, points: PointCloud) -> Result<(), ArError> {
        if !self.is_current(session) {
            return Err(ArError::StaleSessionUpdate(session));
        }
        self.points_slot.publish(session, points);
        Ok(())
    }

    fn tracking_interrupted(&self, session: SessionId, reason: InterruptionReason) {
        if self.lifecycle.lock().set_interrupted(session, true) {
            info!(%session, ?reason, "tracking interrupted");
            self.events
                .emit(ArEvent::TrackingInterrupted { session, reason });
        }
    }

    fn tracking_resumed(&self, session: SessionId) {
        if self.lifecycle.lock().set_interrupted(session, false) {
            info!(%session, "tracking resumed");
            self.events.emit(ArEvent::TrackingResumed { session });
        }
    }
}

impl PositioningHandler for SharedState {
    fn location_updated(&self, generation: u64, fix: LocationOverride) {
        {
            let mut origin = self.origin.write();
            if !self.is_live_positioning(generation) {
                debug!(generation, "fix from released positioning source dropped");
                return;
            }
            origin.set_location_override(Some(fix));
        }

        self.events.emit(ArEvent::LocationChanged(fix.position));
        if let Some(heading) = fix.heading {
            self.events.emit(ArEvent::HeadingChanged(heading));
        }
    }

    fn heading_updated(&self, generation: u64, heading: f64) {
        {
            let mut origin = self.origin.write();
            if !self.is_live_positioning(generation) {
                debug!(generation, "heading from released positioning source dropped");
                return;
            }
            origin.set_heading_override(Some(heading));
        }

        self.events.emit(ArEvent::HeadingChanged(heading));
    }
}
