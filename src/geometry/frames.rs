//! Coordinate frame definitions and conversions between the AR tracking
//! frame and the geographic scene.
//!
//! # Overview
//!
//! Three coordinate systems meet in this crate:
//!
//! 1. **Tracking frame** - where the platform AR framework reports poses
//! 2. **Local ENU frame** - East/North/Up tangent frame at a geographic position
//! 3. **Scene frame** - the renderer's Cartesian space (ECEF for
//!    [`Wgs84Projection`](super::geodesy::Wgs84Projection))
//!
//! ## Tracking Frame (RUB - ARKit/ARCore convention)
//! ```text
//!        +Y (up)
//!         |
//!         |
//!         +------ +X (right)
//!        /
//!       /
//!      +Z (backwards, camera looks along -Z)
//! ```
//! The tracking world frame is gravity aligned (+Y up) but its yaw is
//! arbitrary: it is whatever direction the device faced when the session
//! started.
//!
//! ## Local ENU Frame
//! ```text
//!        +Z (up)
//!         |
//!         |  +Y (north)
//!         | /
//!         |/
//!         +------ +X (east)
//! ```
//!
//! # Camera angles
//!
//! Scene cameras are described by heading, pitch and roll in degrees:
//! - heading: clockwise from north
//! - pitch: 0 looks straight down, 90 looks at the horizon, 180 straight up
//! - roll: rotation about the viewing axis
//!
//! The rotation taking camera (RUB) vectors into ENU is
//!
//! ```text
//! R_enu_cam(h, p, r) = Rz(-h) * Rx(p - 90) * B * Rz(r)
//! ```
//!
//! where `B = Rx(90)` is the fixed basis change between the Y-up tracking
//! frame and the Z-up ENU frame: a level device facing north has its +X on
//! east, +Y on up and +Z on south.
//!
//! Because `Rx(p - 90) * Rx(90) = Rx(p)`, the product is a ZXZ Euler sequence
//! and [`camera_angles`] recovers `(h, p, r)` from any rotation.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

/// Below this `sin(pitch)` the camera is treated as looking straight down (or
/// up) and roll is folded into heading.
const GIMBAL_SIN_EPS: f64 = 1e-10;

/// Fixed basis change from the tracking frame (RUB, Y-up) to ENU (Z-up).
///
/// Maps:
/// - Tracking +X (right)     → East
/// - Tracking +Y (up)        → Up
/// - Tracking +Z (backwards) → South (-North)
#[rustfmt::skip]
pub fn rotation_enu_tracking() -> Matrix3<f64> {
    Matrix3::new(
        1.0, 0.0,  0.0,  // East  = Tracking X
        0.0, 0.0, -1.0,  // North = -Tracking Z
        0.0, 1.0,  0.0,  // Up    = Tracking Y
    )
}

/// Inverse of [`rotation_enu_tracking`].
pub fn rotation_tracking_enu() -> Matrix3<f64> {
    rotation_enu_tracking().transpose()
}

fn basis_enu_tracking() -> UnitQuaternion<f64> {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
        rotation_enu_tracking(),
    ))
}

/// Camera heading/pitch/roll in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraAngles {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// `R_enu_cam` for a camera with the given angles (degrees).
pub fn camera_rotation(heading: f64, pitch: f64, roll: f64) -> UnitQuaternion<f64> {
    let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -heading.to_radians());
    let tilt = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), (pitch - 90.0).to_radians());
    let spin = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), roll.to_radians());

    yaw * tilt * basis_enu_tracking() * spin
}

/// Recover heading/pitch/roll (degrees) from `R_enu_cam`.
///
/// Heading is normalized to `[0, 360)`, pitch lies in `[0, 180]` and roll in
/// `(-180, 180]`.
pub fn camera_angles(r_enu_cam: &UnitQuaternion<f64>) -> CameraAngles {
    let m = r_enu_cam.to_rotation_matrix().into_inner();

    // atan2 rather than acos(m22): stays well conditioned near 0 and 180
    let sin_pitch = m[(0, 2)].hypot(m[(1, 2)]);
    let pitch = sin_pitch.atan2(m[(2, 2)]).to_degrees();

    let (yaw, roll) = if sin_pitch < GIMBAL_SIN_EPS {
        // Looking straight down/up: only the sum of heading and roll is observable
        (m[(1, 0)].atan2(m[(0, 0)]), 0.0)
    } else {
        (m[(0, 2)].atan2(-m[(1, 2)]), m[(2, 0)].atan2(m[(2, 1)]))
    };

    CameraAngles {
        heading: normalize_heading(-yaw.to_degrees()),
        pitch,
        roll: roll.to_degrees(),
    }
}

/// Wrap a heading into `[0, 360)`.
pub fn normalize_heading(deg: f64) -> f64 {
    let h = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if h >= 360.0 { 0.0 } else { h }
}

/// Smallest absolute difference between two headings, in degrees.
pub fn heading_delta(a: f64, b: f64) -> f64 {
    ((a - b + 180.0).rem_euclid(360.0) - 180.0).abs()
}

/// Direction (in camera RUB coordinates) of the ray through an image pixel.
pub fn pixel_ray_tracking(
    pixel: (f64, f64),
    focal: (f64, f64),
    principal: (f64, f64),
) -> Vector3<f64> {
    Vector3::new(
        (pixel.0 - principal.0) / focal.0,
        -(pixel.1 - principal.1) / focal.1,
        -1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basis_is_rotation() {
        let r = rotation_enu_tracking();
        assert_relative_eq!(r * rotation_tracking_enu(), Matrix3::identity(), epsilon = 1e-12);
        assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_level_north_camera_looks_north() {
        let r = camera_rotation(0.0, 90.0, 0.0);
        let forward = r * Vector3::new(0.0, 0.0, -1.0);
        let up = r * Vector3::new(0.0, 1.0, 0.0);

        assert_relative_eq!(forward, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(up, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_heading_is_clockwise_from_north() {
        let r = camera_rotation(90.0, 90.0, 0.0);
        let forward = r * Vector3::new(0.0, 0.0, -1.0);
        assert_relative_eq!(forward, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_pitch_zero_looks_down() {
        let r = camera_rotation(0.0, 0.0, 0.0);
        let forward = r * Vector3::new(0.0, 0.0, -1.0);
        assert_relative_eq!(forward, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_angles_roundtrip() {
        for &(h, p, r) in &[(0.0, 90.0, 0.0), (45.0, 60.0, 10.0), (300.0, 135.0, -40.0)] {
            let angles = camera_angles(&camera_rotation(h, p, r));
            assert!(heading_delta(angles.heading, h) < 1e-9);
            assert_relative_eq!(angles.pitch, p, epsilon = 1e-9);
            assert_relative_eq!(angles.roll, r, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_straight_down_folds_roll_into_heading() {
        let angles = camera_angles(&camera_rotation(30.0, 0.0, 20.0));
        assert_relative_eq!(angles.pitch, 0.0, epsilon = 1e-6);
        assert_relative_eq!(angles.roll, 0.0);
        assert!(heading_delta(angles.heading, 10.0) < 1e-6);
    }

    #[test]
    fn test_heading_delta_wraps() {
        assert_relative_eq!(heading_delta(359.5, 0.5), 1.0, epsilon = 1e-12);
        assert_relative_eq!(heading_delta(10.0, 350.0), 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_center_pixel_ray_is_optical_axis() {
        let ray = pixel_ray_tracking((320.0, 240.0), (500.0, 500.0), (320.0, 240.0));
        assert_relative_eq!(ray, Vector3::new(0.0, 0.0, -1.0));
    }
}
