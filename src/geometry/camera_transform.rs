//! Pose reconciliation: tracking pose + origin camera -> scene camera.
//!
//! ```text
//! Tracking pose (q, t), session relative
//!     │
//!     ▼ R_enu_world = camera_rotation(origin h, p, r)
//!     │
//! ENU at origin:   R_enu_cam = R_enu_world * q
//!                  t_enu     = R_enu_world * (factor * t)
//!     │
//!     ▼ projection.enu_to_scene(origin), projection.to_scene(origin)
//!     │
//! Scene pose (R_scene_cam, p_scene)
//!     │
//!     ▼ projection.from_scene + ENU at the camera's own position
//!     │
//! Geographic camera (position, heading, pitch, roll)
//! ```

use nalgebra::UnitQuaternion;
use serde::{Deserialize, Serialize};

use crate::error::ArError;
use crate::origin::TranslationFactor;
use crate::tracking::TrackingPose;

use super::frames::{camera_angles, camera_rotation};
use super::geodesy::{GeoPosition, GeoProjection};
use super::se3::SE3;

/// Geographic camera: position plus heading/pitch/roll in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCamera {
    pub position: GeoPosition,
    #[serde(default)]
    pub heading: f64,
    #[serde(default = "level_pitch")]
    pub pitch: f64,
    #[serde(default)]
    pub roll: f64,
}

fn level_pitch() -> f64 {
    90.0
}

impl GeoCamera {
    pub fn new(
        latitude: f64,
        longitude: f64,
        altitude: f64,
        heading: f64,
        pitch: f64,
        roll: f64,
    ) -> Self {
        Self {
            position: GeoPosition::new(latitude, longitude, altitude),
            heading,
            pitch,
            roll,
        }
    }

    /// Rotation taking camera (tracking-convention) vectors into local ENU.
    pub fn rotation_enu(&self) -> UnitQuaternion<f64> {
        camera_rotation(self.heading, self.pitch, self.roll)
    }
}

impl Default for GeoCamera {
    /// Level camera facing north at the null island.
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, level_pitch(), 0.0)
    }
}

/// Scene camera produced from one tracking pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    /// Camera-to-scene transform in scene Cartesian coordinates.
    pub scene_pose: SE3,
    /// The same camera in geographic terms.
    pub camera: GeoCamera,
}

impl CameraTransform {
    /// Re-derive the transform with the camera's yaw replaced by `heading`.
    pub fn with_heading(&self, heading: f64, projection: &dyn GeoProjection) -> CameraTransform {
        let camera = GeoCamera {
            heading,
            ..self.camera
        };
        let r_scene_enu = projection.enu_to_scene(&camera.position);
        CameraTransform {
            scene_pose: SE3::new(r_scene_enu * camera.rotation_enu(), self.scene_pose.translation),
            camera,
        }
    }
}

/// Compute the scene camera for a raw tracking pose.
///
/// Pure and deterministic. Fails with [`ArError::InvalidPose`] for a zero or
/// near-zero quaternion and for non-finite components.
pub fn compute_camera_transform(
    origin: &GeoCamera,
    pose: &TrackingPose,
    factor: TranslationFactor,
    projection: &dyn GeoProjection,
) -> Result<CameraTransform, ArError> {
    let pose = pose.to_se3()?;
    Ok(camera_transform_from_se3(origin, &pose, factor, projection))
}

/// [`compute_camera_transform`] for an already validated pose.
pub fn camera_transform_from_se3(
    origin: &GeoCamera,
    pose: &SE3,
    factor: TranslationFactor,
    projection: &dyn GeoProjection,
) -> CameraTransform {
    // Tracking world -> ENU at the origin
    let r_enu_world = origin.rotation_enu();
    let r_enu_cam = r_enu_world * pose.rotation;
    let t_enu = r_enu_world * (pose.translation * factor.get());

    // ENU at the origin -> scene
    let r_scene_enu = projection.enu_to_scene(&origin.position);
    let origin_scene = projection.to_scene(&origin.position);

    let p_scene = origin_scene + r_scene_enu * t_enu;
    let r_scene_cam = r_scene_enu * r_enu_cam;

    // Angles are relative to the ENU frame at the camera, not at the origin
    let position = projection.from_scene(&p_scene);
    let r_local_cam = projection.enu_to_scene(&position).inverse() * r_scene_cam;
    let angles = camera_angles(&r_local_cam);

    CameraTransform {
        scene_pose: SE3::new(r_scene_cam, p_scene),
        camera: GeoCamera {
            position,
            heading: angles.heading,
            pitch: angles.pitch,
            roll: angles.roll,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::frames::heading_delta;
    use crate::geometry::geodesy::Wgs84Projection;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn origin() -> GeoCamera {
        GeoCamera::new(48.3808, -4.49492, 48.2511, 0.0, 90.0, 0.0)
    }

    fn factor(f: f64) -> TranslationFactor {
        TranslationFactor::new(f).unwrap()
    }

    fn walking_pose() -> TrackingPose {
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.3);
        let q = q.quaternion();
        TrackingPose::new(q.i, q.j, q.k, q.w, 0.4, 0.1, -1.2)
    }

    #[test]
    fn test_identity_pose_maps_to_origin() {
        let t = compute_camera_transform(
            &origin(),
            &TrackingPose::identity(),
            factor(500.0),
            &Wgs84Projection,
        )
        .unwrap();

        let o = origin();
        assert_relative_eq!(t.camera.position.latitude, o.position.latitude, epsilon = 1e-9);
        assert_relative_eq!(t.camera.position.longitude, o.position.longitude, epsilon = 1e-9);
        assert_relative_eq!(t.camera.position.altitude, o.position.altitude, epsilon = 1e-4);
        assert!(heading_delta(t.camera.heading, 0.0) < 1e-9);
        assert_relative_eq!(t.camera.pitch, 90.0, epsilon = 1e-9);
        assert_relative_eq!(t.camera.roll, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let a = compute_camera_transform(&origin(), &walking_pose(), factor(10.0), &Wgs84Projection);
        let b = compute_camera_transform(&origin(), &walking_pose(), factor(10.0), &Wgs84Projection);
        assert_eq!(a, b);
    }

    #[test]
    fn test_doubling_factor_doubles_offset() {
        let o = origin();
        let origin_scene = Wgs84Projection.to_scene(&o.position);

        let t1 = compute_camera_transform(&o, &walking_pose(), factor(3.0), &Wgs84Projection)
            .unwrap();
        let t2 = compute_camera_transform(&o, &walking_pose(), factor(6.0), &Wgs84Projection)
            .unwrap();

        let d1 = (t1.scene_pose.translation - origin_scene).norm();
        let d2 = (t2.scene_pose.translation - origin_scene).norm();
        assert_relative_eq!(d2, 2.0 * d1, epsilon = 1e-6);
        assert_eq!(t1.scene_pose.rotation, t2.scene_pose.rotation);
    }

    #[test]
    fn test_zero_quaternion_is_invalid() {
        let pose = TrackingPose::new(0.0, 0.0, 0.0, 0.0, 0.1, 0.2, 0.3);
        let result = compute_camera_transform(&origin(), &pose, factor(1.0), &Wgs84Projection);
        assert!(matches!(result, Err(ArError::InvalidPose(_))));
    }

    #[test]
    fn test_forward_step_moves_along_heading() {
        // Facing east, one metre forward is one metre east
        let o = GeoCamera::new(0.0, 0.0, 0.0, 90.0, 90.0, 0.0);
        let pose = TrackingPose::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, -1.0);
        let t = compute_camera_transform(&o, &pose, factor(1.0), &Wgs84Projection).unwrap();

        let moved = t.scene_pose.translation - Wgs84Projection.to_scene(&o.position);
        // ECEF +Y is east at (0, 0)
        assert_relative_eq!(moved, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
        assert!(heading_delta(t.camera.heading, 90.0) < 1e-6);
    }

    #[test]
    fn test_device_yaw_adds_to_origin_heading() {
        // Turning the device 90 degrees left (about +Y) faces west of north
        let q = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
        let pose = TrackingPose::from_se3(&SE3::new(q, Vector3::zeros()));
        let t = compute_camera_transform(&origin(), &pose, factor(1.0), &Wgs84Projection).unwrap();

        assert!(heading_delta(t.camera.heading, 270.0) < 1e-6);
        assert_relative_eq!(t.camera.pitch, 90.0, epsilon = 1e-6);
    }

    #[test]
    fn test_with_heading_replaces_yaw_only() {
        let t = compute_camera_transform(&origin(), &walking_pose(), factor(1.0), &Wgs84Projection)
            .unwrap();
        let overridden = t.with_heading(45.0, &Wgs84Projection);

        assert_eq!(overridden.camera.heading, 45.0);
        assert_eq!(overridden.camera.pitch, t.camera.pitch);
        assert_eq!(overridden.scene_pose.translation, t.scene_pose.translation);

        let local = Wgs84Projection.enu_to_scene(&overridden.camera.position).inverse()
            * overridden.scene_pose.rotation;
        assert!(heading_delta(camera_angles(&local).heading, 45.0) < 1e-6);
    }
}
