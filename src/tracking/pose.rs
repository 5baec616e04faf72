//! Raw tracking-source payloads: device pose, camera intrinsics and the
//! geometry used by debug overlays.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ArError;
use crate::geometry::SE3;

/// Quaternions with a norm below this are rejected as degenerate.
const MIN_QUATERNION_NORM: f64 = 1e-6;

/// Device pose in the tracking world frame, exactly as reported by the
/// platform. The quaternion is not assumed to be normalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingPose {
    pub rotation: Quaternion<f64>,
    pub translation: Vector3<f64>,
}

impl TrackingPose {
    #[allow(clippy::too_many_arguments)]
    pub fn new(qx: f64, qy: f64, qz: f64, qw: f64, tx: f64, ty: f64, tz: f64) -> Self {
        Self {
            rotation: Quaternion::new(qw, qx, qy, qz),
            translation: Vector3::new(tx, ty, tz),
        }
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0)
    }

    pub fn from_se3(pose: &SE3) -> Self {
        Self {
            rotation: *pose.rotation.quaternion(),
            translation: pose.translation,
        }
    }

    /// Validate and convert into a rigid transform.
    pub fn to_se3(&self) -> Result<SE3, ArError> {
        let q = &self.rotation;
        if !(q.w.is_finite() && q.i.is_finite() && q.j.is_finite() && q.k.is_finite()) {
            return Err(ArError::InvalidPose("non-finite quaternion"));
        }
        if q.norm() < MIN_QUATERNION_NORM {
            return Err(ArError::InvalidPose("zero quaternion"));
        }
        if !self.translation.iter().all(|v| v.is_finite()) {
            return Err(ArError::InvalidPose("non-finite translation"));
        }

        Ok(SE3 {
            rotation: UnitQuaternion::from_quaternion(*q),
            translation: self.translation,
        })
    }
}

/// Camera intrinsics of the live feed, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldOfView {
    pub focal_x: f64,
    pub focal_y: f64,
    pub principal_x: f64,
    pub principal_y: f64,
    pub image_width: f64,
    pub image_height: f64,
}

impl FieldOfView {
    pub fn is_valid(&self) -> bool {
        self.focal_x > 0.0
            && self.focal_y > 0.0
            && self.image_width > 0.0
            && self.image_height > 0.0
            && self.principal_x.is_finite()
            && self.principal_y.is_finite()
    }

    /// Vertical field of view in degrees.
    pub fn vertical_degrees(&self) -> f64 {
        (2.0 * (0.5 * self.image_height / self.focal_y).atan()).to_degrees()
    }

    pub fn horizontal_degrees(&self) -> f64 {
        (2.0 * (0.5 * self.image_width / self.focal_x).atan()).to_degrees()
    }
}

impl Default for FieldOfView {
    /// A 1920x1080 feed with a ~60 degree horizontal field of view.
    fn default() -> Self {
        Self {
            focal_x: 1662.77,
            focal_y: 1662.77,
            principal_x: 960.0,
            principal_y: 540.0,
            image_width: 1920.0,
            image_height: 1080.0,
        }
    }
}

/// A plane detected by the tracking source, in tracking world coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedPlane {
    /// Plane centre pose; the plane normal is the local +Y axis.
    pub center: SE3,
    /// Boundary polygon, in world coordinates.
    pub boundary: Vec<Vector3<f64>>,
}

/// Feature points detected by the tracking source, in world coordinates.
pub type PointCloud = Vec<Vector3<f64>>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_quaternion_rejected() {
        let pose = TrackingPose::new(0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 3.0);
        assert_eq!(pose.to_se3(), Err(ArError::InvalidPose("zero quaternion")));
    }

    #[test]
    fn test_near_zero_quaternion_rejected() {
        let pose = TrackingPose::new(1e-9, 0.0, 0.0, 1e-9, 0.0, 0.0, 0.0);
        assert!(pose.to_se3().is_err());
    }

    #[test]
    fn test_nan_translation_rejected() {
        let pose = TrackingPose::new(0.0, 0.0, 0.0, 1.0, f64::NAN, 0.0, 0.0);
        assert!(matches!(pose.to_se3(), Err(ArError::InvalidPose(_))));
    }

    #[test]
    fn test_unnormalized_quaternion_is_normalized() {
        let pose = TrackingPose::new(0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0);
        let se3 = pose.to_se3().unwrap();
        assert_relative_eq!(se3.rotation.angle(), 0.0);
    }

    #[test]
    fn test_default_fov_is_sixty_degrees() {
        let fov = FieldOfView::default();
        assert!(fov.is_valid());
        assert_relative_eq!(fov.horizontal_degrees(), 60.0, epsilon = 1e-3);
    }
}
