use std::sync::Arc;

use nalgebra::Vector3;
use tracing::debug;

use crate::geometry::geodesy::intersect_ellipsoid;
use crate::geometry::{CameraTransform, GeoPosition, GeoProjection, Wgs84Projection};
use crate::tracking::FieldOfView;

use super::{ScenePreset, SceneHost};

/// Reference scene host: the WGS84 ellipsoid at a constant height, no
/// renderer. Records what the core applied to it.
#[derive(Debug, Clone)]
pub struct FlatScene {
    surface_height: f64,
    camera: Option<CameraTransform>,
    fov: Option<FieldOfView>,
    camera_updates: usize,
    fov_updates: usize,
    scene: Option<String>,
}

impl FlatScene {
    pub fn new(surface_height: f64) -> Self {
        Self {
            surface_height,
            camera: None,
            fov: None,
            camera_updates: 0,
            fov_updates: 0,
            scene: None,
        }
    }

    pub fn camera(&self) -> Option<&CameraTransform> {
        self.camera.as_ref()
    }

    pub fn field_of_view(&self) -> Option<&FieldOfView> {
        self.fov.as_ref()
    }

    pub fn camera_updates(&self) -> usize {
        self.camera_updates
    }

    pub fn fov_updates(&self) -> usize {
        self.fov_updates
    }

    pub fn scene_name(&self) -> Option<&str> {
        self.scene.as_deref()
    }
}

impl Default for FlatScene {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl SceneHost for FlatScene {
    fn projection(&self) -> Arc<dyn GeoProjection> {
        Arc::new(Wgs84Projection)
    }

    fn set_camera(&mut self, transform: &CameraTransform) {
        self.camera = Some(*transform);
        self.camera_updates += 1;
    }

    fn set_field_of_view(&mut self, fov: &FieldOfView) {
        self.fov = Some(*fov);
        self.fov_updates += 1;
    }

    fn surface_intersection(
        &self,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<GeoPosition> {
        let hit = intersect_ellipsoid(origin, direction, self.surface_height)?;
        Some(Wgs84Projection.from_scene(&hit))
    }

    fn scene_changed(&mut self, preset: &ScenePreset) {
        debug!(scene = %preset.name, "scene swapped");
        self.scene = Some(preset.name.clone());
    }
}
