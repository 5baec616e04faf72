//! Scene/view host seam.
//!
//! The host is owned by the application and only ever touched from the render
//! thread. The core hands it finished transforms; it never reaches into the
//! host from the tracking thread.

pub mod flat;
pub mod presets;

use std::sync::Arc;

use nalgebra::Vector3;

use crate::geometry::{CameraTransform, GeoPosition, GeoProjection};
use crate::tracking::FieldOfView;

pub use flat::FlatScene;
pub use presets::{ArMode, ScenePreset, builtin_presets, find_preset};

pub trait SceneHost {
    /// Geographic-to-scene projection used for every transform.
    fn projection(&self) -> Arc<dyn GeoProjection>;

    fn set_camera(&mut self, transform: &CameraTransform);

    /// Configure the viewport so the scene lines up with the camera feed.
    fn set_field_of_view(&mut self, fov: &FieldOfView);

    /// First intersection of a scene-space ray with the scene surface.
    fn surface_intersection(
        &self,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<GeoPosition>;

    /// The active scene content was replaced.
    fn scene_changed(&mut self, preset: &ScenePreset);
}
