//! Rigid-body transforms.

use nalgebra::{UnitQuaternion, Vector3};

/// Rigid transform `T = [R | t]` mapping points from a source frame into a
/// target frame: `p_target = R * p_source + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation,
        }
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    pub fn inverse(&self) -> SE3 {
        let rot_inv = self.rotation.inverse();
        SE3 {
            rotation: rot_inv,
            translation: -(rot_inv * self.translation),
        }
    }

    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }

    pub fn is_identity(&self, eps: f64) -> bool {
        self.translation.norm() <= eps && self.rotation.angle() <= eps
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> SE3 {
        SE3::new(
            UnitQuaternion::from_euler_angles(0.1, -0.4, 0.7),
            Vector3::new(1.0, -2.0, 0.5),
        )
    }

    #[test]
    fn test_inverse_composes_to_identity() {
        let t = sample();
        let id = t.compose(&t.inverse());
        assert!(id.is_identity(1e-12));
    }

    #[test]
    fn test_compose_matches_sequential_transform() {
        let a = sample();
        let b = SE3::from_translation(Vector3::new(0.0, 3.0, 0.0));
        let p = Vector3::new(0.3, 0.2, -1.0);

        let direct = a.compose(&b).transform_point(&p);
        let sequential = a.transform_point(&b.transform_point(&p));
        assert_relative_eq!(direct, sequential, epsilon = 1e-12);
    }
}
