//! Render-thread side of the pose handoff.
//!
//! Called once per frame right before drawing. Takes whatever the tracking
//! thread left in the pending slots, drops anything from a torn-down session,
//! and applies the newest transform and field of view to the scene host.

use tracing::{debug, trace};

use crate::geometry::CameraTransform;
use crate::scene::SceneHost;
use crate::tracking::{FieldOfView, SessionId};
use crate::viz::{OverlayColor, OverlaySink};

use super::events::ArEvent;
use super::pending::Tagged;
use super::shared_state::SharedState;

/// What one render tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    /// Session current at the start of the tick.
    pub session: Option<SessionId>,
    /// A new transform was applied this tick.
    pub transform_updated: bool,
    pub fov_updated: bool,
    /// Updates discarded because they belonged to an older session.
    pub dropped_stale: usize,
    /// Transform the scene camera holds after this tick.
    pub transform: Option<CameraTransform>,
}

pub struct FrameSyncBridge {
    frame: u64,
    last_transform: Option<Tagged<CameraTransform>>,
    last_fov: Option<FieldOfView>,
    plane_color: Option<OverlayColor>,
    point_cloud_color: Option<OverlayColor>,
    overlay: Option<Box<dyn OverlaySink>>,
}

impl FrameSyncBridge {
    pub fn new(plane_color: Option<OverlayColor>, point_cloud_color: Option<OverlayColor>) -> Self {
        Self {
            frame: 0,
            last_transform: None,
            last_fov: None,
            plane_color,
            point_cloud_color,
            overlay: None,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn last_transform(&self) -> Option<&CameraTransform> {
        self.last_transform.as_ref().map(|t| &t.value)
    }

    pub fn last_field_of_view(&self) -> Option<&FieldOfView> {
        self.last_fov.as_ref()
    }

    pub fn set_plane_color(&mut self, color: Option<OverlayColor>) {
        self.plane_color = color;
    }

    pub fn set_point_cloud_color(&mut self, color: Option<OverlayColor>) {
        self.point_cloud_color = color;
    }

    pub fn set_overlay_sink(&mut self, sink: Option<Box<dyn OverlaySink>>) {
        self.overlay = sink;
    }

    pub fn render_frame(&mut self, shared: &SharedState, host: &mut dyn SceneHost) -> FrameReport {
        self.frame += 1;
        let session = shared.session();
        let mut dropped_stale = 0;

        let is_fresh = |tag: SessionId| Some(tag) == session;

        let mut transform_updated = false;
        if let Some(pending) = shared.transform_slot.take() {
            if is_fresh(pending.session) {
                host.set_camera(&pending.value);
                if let Some(overlay) = self.overlay.as_mut() {
                    overlay.camera_moved(&pending.value);
                }
                self.last_transform = Some(pending);
                transform_updated = true;
            } else {
                dropped_stale += 1;
            }
        }

        let mut fov_updated = false;
        if let Some(pending) = shared.fov_slot.take() {
            if is_fresh(pending.session) {
                if self.last_fov != Some(pending.value) {
                    host.set_field_of_view(&pending.value);
                    fov_updated = true;
                }
                self.last_fov = Some(pending.value);
            } else {
                dropped_stale += 1;
            }
        }

        dropped_stale += self.forward_overlays(shared, session);

        if dropped_stale > 0 {
            debug!(frame = self.frame, dropped_stale, "stale updates discarded");
        }
        trace!(frame = self.frame, transform_updated, fov_updated, "frame synced");

        shared.events().emit(ArEvent::RenderFrame { frame: self.frame });

        FrameReport {
            frame: self.frame,
            session,
            transform_updated,
            fov_updated,
            dropped_stale,
            transform: self.last_transform.as_ref().map(|t| t.value),
        }
    }

    /// Overlays may trail the camera by a frame; they are only taken when
    /// the matching colour is set.
    fn forward_overlays(&mut self, shared: &SharedState, session: Option<SessionId>) -> usize {
        let mut dropped = 0;

        if let Some(color) = self.plane_color {
            if let Some(pending) = shared.planes_slot.take() {
                match self.overlay.as_mut() {
                    Some(overlay) if Some(pending.session) == session => {
                        overlay.draw_planes(pending.session, &pending.value, color)
                    }
                    Some(_) => dropped += 1,
                    None => {}
                }
            }
        }

        if let Some(color) = self.point_cloud_color {
            if let Some(pending) = shared.points_slot.take() {
                match self.overlay.as_mut() {
                    Some(overlay) if Some(pending.session) == session => {
                        overlay.draw_point_cloud(pending.session, &pending.value, color)
                    }
                    Some(_) => dropped += 1,
                    None => {}
                }
            }
        }

        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::geometry::Wgs84Projection;
    use crate::origin::OriginState;
    use crate::scene::FlatScene;
    use crate::tracking::{DetectedPlane, PointCloud, TrackingHandler, TrackingPose};
    use crate::viz::LogOverlay;

    fn tracking_shared() -> (Arc<SharedState>, SessionId) {
        let shared = SharedState::new(OriginState::default(), Arc::new(Wgs84Projection), 16, true);
        let session = shared.begin_start().unwrap();
        (shared, session)
    }

    #[test]
    fn test_tick_without_update_reuses_transform() {
        let (shared, session) = tracking_shared();
        let mut bridge = FrameSyncBridge::new(None, None);
        let mut scene = FlatScene::default();

        shared.pose_updated(session, TrackingPose::identity()).unwrap();
        let first = bridge.render_frame(&shared, &mut scene);
        assert!(first.transform_updated);

        let second = bridge.render_frame(&shared, &mut scene);
        assert!(!second.transform_updated);
        assert_eq!(second.transform, first.transform);
        assert_eq!(scene.camera_updates(), 1);
        assert_eq!(second.frame, 2);
    }

    #[test]
    fn test_at_most_one_transform_per_tick() {
        let (shared, session) = tracking_shared();
        let mut bridge = FrameSyncBridge::new(None, None);
        let mut scene = FlatScene::default();

        for i in 0..5 {
            let x = i as f64;
            shared
                .pose_updated(session, TrackingPose::new(0.0, 0.0, 0.0, 1.0, x, 0.0, 0.0))
                .unwrap();
        }
        let report = bridge.render_frame(&shared, &mut scene);
        assert!(report.transform_updated);
        assert_eq!(scene.camera_updates(), 1);

        let newest = shared.origin().camera_transform(
            &crate::geometry::SE3::from_translation(nalgebra::Vector3::new(4.0, 0.0, 0.0)),
            &Wgs84Projection,
        );
        assert_eq!(report.transform, Some(newest));
    }

    #[test]
    fn test_stale_slot_content_dropped() {
        let (shared, session) = tracking_shared();
        let mut bridge = FrameSyncBridge::new(None, None);
        let mut scene = FlatScene::default();

        // Simulates a pose admitted just before teardown and published after
        let transform = shared
            .origin()
            .camera_transform(&crate::geometry::SE3::identity(), &Wgs84Projection);
        shared
            .transform_slot
            .publish(SessionId::new(session.0 + 100), transform);
        let report = bridge.render_frame(&shared, &mut scene);
        assert!(!report.transform_updated);
        assert_eq!(report.dropped_stale, 1);
        assert!(scene.camera().is_none());
    }

    #[test]
    fn test_overlays_only_with_color() {
        let (shared, session) = tracking_shared();
        let mut bridge = FrameSyncBridge::new(None, None);
        bridge.set_overlay_sink(Some(Box::new(LogOverlay::default())));
        let mut scene = FlatScene::default();

        shared
            .planes_updated(session, vec![DetectedPlane {
                center: Default::default(),
                boundary: Vec::new(),
            }])
            .unwrap();
        bridge.render_frame(&shared, &mut scene);
        // Not taken while the overlay is disabled
        assert!(!shared.planes_slot.is_empty());

        bridge.set_plane_color(Some(OverlayColor::rgba(255, 255, 0, 128)));
        bridge.render_frame(&shared, &mut scene);
        assert!(shared.planes_slot.is_empty());
    }

    #[derive(Clone, Default)]
    struct RecordingOverlay {
        clouds: Arc<parking_lot::Mutex<Vec<(SessionId, usize, OverlayColor)>>>,
    }

    impl OverlaySink for RecordingOverlay {
        fn draw_planes(&mut self, _: SessionId, _: &[DetectedPlane], _: OverlayColor) {}

        fn draw_point_cloud(&mut self, session: SessionId, points: &PointCloud, color: OverlayColor) {
            self.clouds.lock().push((session, points.len(), color));
        }
    }

    #[test]
    fn test_point_cloud_forwarded_and_stale_dropped() {
        let (shared, session) = tracking_shared();
        let color = OverlayColor::rgba(0, 200, 255, 255);
        let mut bridge = FrameSyncBridge::new(None, Some(color));
        let overlay = RecordingOverlay::default();
        bridge.set_overlay_sink(Some(Box::new(overlay.clone())));
        let mut scene = FlatScene::default();

        let cloud = vec![nalgebra::Vector3::new(0.1, 0.0, -1.0); 3];
        shared.points_updated(session, cloud.clone()).unwrap();
        let report = bridge.render_frame(&shared, &mut scene);
        assert_eq!(report.dropped_stale, 0);
        assert_eq!(*overlay.clouds.lock(), vec![(session, 3, color)]);

        // Left behind by a session that is no longer current
        shared
            .points_slot
            .publish(SessionId::new(session.0 + 100), cloud);
        let report = bridge.render_frame(&shared, &mut scene);
        assert_eq!(report.dropped_stale, 1);
        assert_eq!(overlay.clouds.lock().len(), 1);
        assert!(shared.points_slot.is_empty());
    }

    #[test]
    fn test_fov_applied_once() {
        let (shared, session) = tracking_shared();
        let mut bridge = FrameSyncBridge::new(None, None);
        let mut scene = FlatScene::default();

        shared
            .field_of_view_updated(session, FieldOfView::default())
            .unwrap();
        assert!(bridge.render_frame(&shared, &mut scene).fov_updated);

        shared
            .field_of_view_updated(session, FieldOfView::default())
            .unwrap();
        assert!(!bridge.render_frame(&shared, &mut scene).fov_updated);
        assert_eq!(scene.fov_updates(), 1);
        assert_eq!(bridge.last_field_of_view(), Some(&FieldOfView::default()));
    }
}
