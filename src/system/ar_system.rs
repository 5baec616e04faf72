//! AR system - main entry point.
//!
//! The `ArSystem` is the top-level struct that UI bindings interact with. It
//! owns the shared state, the tracking source and the optional positioning
//! source, and drives the render-thread bridge. All methods run on the
//! UI/render thread; the tracking source reports from its own thread.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use nalgebra::Vector3;
use tracing::{debug, info, warn};

use crate::config::ArConfig;
use crate::error::ArError;
use crate::geometry::frames::pixel_ray_tracking;
use crate::geometry::{CameraTransform, GeoPosition, GeoProjection, SE3};
use crate::origin::{OriginCamera, OriginState, TranslationFactor};
use crate::positioning::{FixedPositioningSource, PositioningSource};
use crate::scene::{SceneHost, ScenePreset};
use crate::tracking::{FieldOfView, SessionId, TrackingSource, TrackingState};
use crate::viz::{OverlayColor, OverlaySink};

use super::events::ArEvent;
use super::frame_sync::{FrameReport, FrameSyncBridge};
use super::shared_state::SharedState;

/// Builds the positioning source installed when a scene asks for one.
pub type PositioningFactory = Box<dyn Fn() -> Box<dyn PositioningSource> + Send>;

pub struct ArSystem {
    /// Shared state (lifecycle, origin, pending slots) seen by the source thread.
    shared: Arc<SharedState>,

    source: Box<dyn TrackingSource>,

    positioning: Option<Box<dyn PositioningSource>>,
    positioning_active: bool,
    positioning_factory: Option<PositioningFactory>,

    bridge: FrameSyncBridge,

    active_scene: Option<String>,
}

impl ArSystem {
    pub fn new(
        source: Box<dyn TrackingSource>,
        projection: Arc<dyn GeoProjection>,
        config: &ArConfig,
    ) -> Self {
        let origin = OriginState::new(config.origin, config.translation_factor);
        let shared = SharedState::new(
            origin,
            projection,
            config.event_capacity,
            config.mask_interrupted_poses,
        );

        let positioning_factory = config.positioning.map(|fix| {
            Box::new(move || Box::new(FixedPositioningSource::new(fix)) as Box<dyn PositioningSource>)
                as PositioningFactory
        });

        Self {
            shared,
            source,
            positioning: None,
            positioning_active: false,
            positioning_factory,
            bridge: FrameSyncBridge::new(config.plane_color, config.point_cloud_color),
            active_scene: None,
        }
    }

    pub fn subscribe(&self) -> Receiver<ArEvent> {
        self.shared.events().subscribe()
    }

    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn tracking_state(&self) -> TrackingState {
        self.shared.tracking_state()
    }

    pub fn session(&self) -> Option<SessionId> {
        self.shared.session()
    }

    pub fn active_scene(&self) -> Option<&str> {
        self.active_scene.as_deref()
    }

    /// Last transform applied to the scene camera.
    pub fn camera_transform(&self) -> Option<&CameraTransform> {
        self.bridge.last_transform()
    }

    pub fn field_of_view(&self) -> Option<&FieldOfView> {
        self.bridge.last_field_of_view()
    }

    // -- lifecycle --------------------------------------------------------

    /// `Stopped -> Starting`. A no-op while a session is active.
    ///
    /// Lifecycle failures from the source are returned and leave the system
    /// `Stopped`.
    pub fn start_tracking(&mut self) -> Result<(), ArError> {
        let Some(session) = self.shared.begin_start() else {
            return Ok(());
        };
        self.launch_session(session)
    }

    /// Tear the session down. Late updates from it are discarded.
    pub fn stop_tracking(&mut self) {
        if self.shared.stop() {
            self.source.stop();
        }
    }

    /// Replace the running session with a fresh one whose first pose maps to
    /// the unmodified origin camera. A no-op unless `Tracking`.
    pub fn reset_tracking(&mut self) -> Result<(), ArError> {
        let Some(session) = self.shared.begin_reset() else {
            return Ok(());
        };
        self.source.stop();
        self.launch_session(session)
    }

    fn launch_session(&mut self, session: SessionId) -> Result<(), ArError> {
        let sink = self.shared.tracking_sink(session);
        match self.source.start(sink) {
            Ok(()) => {
                info!(%session, source = self.source.name(), "session started");
                Ok(())
            }
            Err(e) => {
                self.shared.start_failed(session, &e);
                self.source.stop();
                Err(e)
            }
        }
    }

    // -- origin & mode ----------------------------------------------------

    /// Replace the geographic anchor. While tracking, the session is reset so
    /// the next pose re-anchors at the new origin.
    pub fn set_origin_camera(&mut self, origin: OriginCamera) -> Result<(), ArError> {
        self.shared.origin_mut().set_origin(origin);
        debug!(?origin, "origin camera set");
        if self.tracking_state() == TrackingState::Tracking {
            self.reset_tracking()?;
        }
        Ok(())
    }

    pub fn set_translation_factor(&mut self, factor: f64) -> Result<(), ArError> {
        let factor = TranslationFactor::new(factor).inspect_err(|e| {
            warn!(error = %e, "translation factor rejected");
        })?;
        self.shared.origin_mut().set_factor(factor);
        debug!(%factor, "translation factor set");
        Ok(())
    }

    pub fn origin_camera(&self) -> OriginCamera {
        *self.shared.origin().origin()
    }

    pub fn translation_factor(&self) -> TranslationFactor {
        self.shared.origin().factor()
    }

    /// Force the scene heading, replacing the yaw contributed by tracking.
    pub fn set_heading_override(&mut self, heading: Option<f64>) {
        self.shared.origin_mut().set_heading_override(heading);
        if let Some(heading) = heading {
            self.shared.events().emit(ArEvent::HeadingChanged(heading));
        }
    }

    pub fn set_mask_interrupted_poses(&mut self, mask: bool) {
        self.shared.set_mask_interrupted_poses(mask);
    }

    /// Anchor the surface under `(screen_x, screen_y)` at the scene origin.
    ///
    /// Silently does nothing when the source reports no surface there or no
    /// pose has been seen yet in this session.
    pub fn set_initial_transformation(&mut self, screen_x: f64, screen_y: f64) {
        let Some(hit) = self.source.hit_test(screen_x, screen_y) else {
            let error = ArError::NoSurfaceHit {
                x: screen_x,
                y: screen_y,
            };
            debug!(%error, "initial transformation unchanged");
            return;
        };
        let Some(hit) = self.shared.session_relative_point(&hit) else {
            debug!("initial transformation needs a tracked pose");
            return;
        };

        let offset = SE3::from_translation(-hit);
        self.shared.origin_mut().set_initial_offset(offset);
        info!(hit = ?hit, "initial transformation set");
        self.shared
            .events()
            .emit(ArEvent::InitialTransformationChanged(offset));
    }

    /// Geographic position on the scene surface under a screen pixel, using
    /// the camera and field of view last applied by [`ArSystem::render_frame`].
    ///
    /// Screen coordinates are image pixels of the camera feed.
    pub fn screen_to_location(
        &self,
        screen_x: f64,
        screen_y: f64,
        host: &dyn SceneHost,
    ) -> Option<GeoPosition> {
        let transform = self.bridge.last_transform()?;
        let fov = self.bridge.last_field_of_view()?;

        let ray_cam = pixel_ray_tracking(
            (screen_x, screen_y),
            (fov.focal_x, fov.focal_y),
            (fov.principal_x, fov.principal_y),
        );
        let direction = transform.scene_pose.rotation * ray_cam;
        let origin: Vector3<f64> = transform.scene_pose.translation;

        let location = host.surface_intersection(&origin, &direction);
        if location.is_none() {
            debug!(screen_x, screen_y, "no surface under screen point");
        }
        location
    }

    // -- rendering ----------------------------------------------------------

    /// Apply pending updates to `host`. Call right before each draw.
    pub fn render_frame(&mut self, host: &mut dyn SceneHost) -> FrameReport {
        self.bridge.render_frame(&self.shared, host)
    }

    pub fn set_plane_color(&mut self, color: Option<OverlayColor>) {
        self.bridge.set_plane_color(color);
    }

    pub fn set_point_cloud_color(&mut self, color: Option<OverlayColor>) {
        self.bridge.set_point_cloud_color(color);
    }

    pub fn set_overlay_sink(&mut self, sink: Option<Box<dyn OverlaySink>>) {
        self.bridge.set_overlay_sink(sink);
    }

    // -- positioning & scenes ---------------------------------------------

    /// Install and start a positioning source, releasing any previous one.
    pub fn set_positioning_source(
        &mut self,
        source: Box<dyn PositioningSource>,
    ) -> Result<(), ArError> {
        self.release_positioning();
        self.positioning = Some(source);
        self.resume_positioning()
    }

    /// Source to install when a scene asks for positioning and none is set.
    /// Replaces the one derived from [`ArConfig::positioning`].
    pub fn set_positioning_factory(&mut self, factory: Option<PositioningFactory>) {
        self.positioning_factory = factory;
    }

    pub fn is_positioning_active(&self) -> bool {
        self.positioning_active
    }

    fn resume_positioning(&mut self) -> Result<(), ArError> {
        if self.positioning_active {
            return Ok(());
        }
        if self.positioning.is_none() {
            self.positioning = self.positioning_factory.as_ref().map(|build| build());
        }
        let Some(source) = self.positioning.as_mut() else {
            warn!("scene wants positioning but no source is configured; anchoring at the origin camera");
            return Ok(());
        };
        source.start(self.shared.positioning_sink())?;
        info!(source = source.name(), "positioning started");
        self.positioning_active = true;
        Ok(())
    }

    /// Stop the positioning source and forget its overrides. Fixes still in
    /// flight from it are ignored.
    fn release_positioning(&mut self) {
        if !self.positioning_active {
            return;
        }
        self.shared.retire_positioning();
        if let Some(source) = self.positioning.as_mut() {
            source.stop();
            info!(source = source.name(), "positioning released");
        }
        self.positioning_active = false;
    }

    /// Swap the active scene content and re-anchor tracking on it.
    pub fn change_scene(
        &mut self,
        preset: &ScenePreset,
        host: &mut dyn SceneHost,
    ) -> Result<(), ArError> {
        info!(scene = %preset.name, mode = ?preset.mode, "changing scene");
        host.scene_changed(preset);
        self.active_scene = Some(preset.name.clone());

        {
            let mut origin = self.shared.origin_mut();
            origin.set_origin(preset.origin);
            origin.set_factor(preset.translation_factor);
        }

        if preset.use_positioning {
            self.resume_positioning()?;
        } else {
            self.release_positioning();
        }

        match self.tracking_state() {
            TrackingState::Tracking => self.reset_tracking(),
            TrackingState::Stopped => self.start_tracking(),
            TrackingState::Starting | TrackingState::Resetting => Ok(()),
        }
    }

    /// Stop tracking and positioning.
    pub fn shutdown(&mut self) {
        self.stop_tracking();
        self.release_positioning();
    }
}

impl Drop for ArSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
