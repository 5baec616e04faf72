//! WGS84 geodesy: geodetic <-> ECEF conversion, local ENU bases and
//! ray/surface intersection.
//!
//! The scene host decides which projection maps geographic positions into
//! scene Cartesian space; [`GeoProjection`] is that seam. [`Wgs84Projection`]
//! is the earth-centred earth-fixed implementation used by the reference
//! scene and the tests.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis (m).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Geodetic position: degrees and metres above the ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

/// Geographic-to-scene projection supplied by the scene host.
///
/// Implementations are plain values: the tracking thread uses them to compute
/// camera transforms without ever touching the view itself.
pub trait GeoProjection: Send + Sync {
    /// Project a geographic position into scene Cartesian space.
    fn to_scene(&self, position: &GeoPosition) -> Vector3<f64>;

    /// Inverse of [`GeoProjection::to_scene`].
    fn from_scene(&self, point: &Vector3<f64>) -> GeoPosition;

    /// Rotation taking local ENU vectors at `position` into scene space.
    fn enu_to_scene(&self, position: &GeoPosition) -> UnitQuaternion<f64>;
}

/// Scene Cartesian = ECEF on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgs84Projection;

impl GeoProjection for Wgs84Projection {
    fn to_scene(&self, position: &GeoPosition) -> Vector3<f64> {
        geodetic_to_ecef(position)
    }

    fn from_scene(&self, point: &Vector3<f64>) -> GeoPosition {
        ecef_to_geodetic(point)
    }

    fn enu_to_scene(&self, position: &GeoPosition) -> UnitQuaternion<f64> {
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(
            rotation_ecef_enu(position.latitude, position.longitude),
        ))
    }
}

fn eccentricity_sq() -> f64 {
    WGS84_F * (2.0 - WGS84_F)
}

fn semi_minor_axis() -> f64 {
    WGS84_A * (1.0 - WGS84_F)
}

pub fn geodetic_to_ecef(position: &GeoPosition) -> Vector3<f64> {
    let e2 = eccentricity_sq();
    let (sin_lat, cos_lat) = position.latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = position.longitude.to_radians().sin_cos();
    let h = position.altitude;

    // Prime vertical radius of curvature
    let n = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Vector3::new(
        (n + h) * cos_lat * cos_lon,
        (n + h) * cos_lat * sin_lon,
        (n * (1.0 - e2) + h) * sin_lat,
    )
}

/// Bowring's closed form, polished with two fixed-point iterations.
pub fn ecef_to_geodetic(p: &Vector3<f64>) -> GeoPosition {
    let e2 = eccentricity_sq();
    let b = semi_minor_axis();
    let ep2 = (WGS84_A * WGS84_A - b * b) / (b * b);

    let rho = (p.x * p.x + p.y * p.y).sqrt();
    let theta = (p.z * WGS84_A).atan2(rho * b);
    let (sin_t, cos_t) = theta.sin_cos();

    let mut lat = (p.z + ep2 * b * sin_t.powi(3)).atan2(rho - e2 * WGS84_A * cos_t.powi(3));
    for _ in 0..2 {
        let sin_lat = lat.sin();
        let n = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        lat = (p.z + e2 * n * sin_lat).atan2(rho);
    }
    let lon = p.y.atan2(p.x);

    let (sin_lat, cos_lat) = lat.sin_cos();
    let n = WGS84_A / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    // Valid at all latitudes, including the poles
    let alt = rho * cos_lat + p.z * sin_lat - WGS84_A * WGS84_A / n;

    GeoPosition {
        latitude: lat.to_degrees(),
        longitude: lon.to_degrees(),
        altitude: alt,
    }
}

/// Rotation whose columns are the East, North and Up unit vectors at
/// (`lat_deg`, `lon_deg`) expressed in ECEF.
#[rustfmt::skip]
pub fn rotation_ecef_enu(lat_deg: f64, lon_deg: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = lat_deg.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon_deg.to_radians().sin_cos();
    Matrix3::new(
        -sin_lon, -sin_lat * cos_lon, cos_lat * cos_lon,
         cos_lon, -sin_lat * sin_lon, cos_lat * sin_lon,
         0.0,      cos_lat,           sin_lat,
    )
}

/// Intersect a ray with the surface lying `height` metres above the WGS84
/// ellipsoid (both semi-axes grown by `height`).
///
/// Returns the nearest intersection in front of the ray origin.
pub fn intersect_ellipsoid(
    origin: &Vector3<f64>,
    direction: &Vector3<f64>,
    height: f64,
) -> Option<Vector3<f64>> {
    let a = WGS84_A + height;
    let b = semi_minor_axis() + height;
    let scale = Vector3::new(1.0 / a, 1.0 / a, 1.0 / b);

    // Map the ellipsoid to the unit sphere
    let o = origin.component_mul(&scale);
    let d = direction.component_mul(&scale);

    let qa = d.dot(&d);
    if qa <= f64::EPSILON {
        return None;
    }
    let qb = 2.0 * o.dot(&d);
    let qc = o.dot(&o) - 1.0;

    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return None;
    }
    let sqrt_disc = disc.sqrt();
    let t_near = (-qb - sqrt_disc) / (2.0 * qa);
    let t_far = (-qb + sqrt_disc) / (2.0 * qa);

    let t = if t_near >= 0.0 {
        t_near
    } else if t_far >= 0.0 {
        t_far
    } else {
        return None;
    };

    Some(origin + direction * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_equator_prime_meridian() {
        let p = geodetic_to_ecef(&GeoPosition::new(0.0, 0.0, 0.0));
        assert_relative_eq!(p, Vector3::new(WGS84_A, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_geodetic_roundtrip() {
        for pos in [
            GeoPosition::new(37.7308, -119.612, 1212.0),
            GeoPosition::new(-33.9, 151.2, 5.0),
            GeoPosition::new(89.5, 10.0, 100.0),
        ] {
            let back = ecef_to_geodetic(&geodetic_to_ecef(&pos));
            assert_relative_eq!(back.latitude, pos.latitude, epsilon = 1e-9);
            assert_relative_eq!(back.longitude, pos.longitude, epsilon = 1e-9);
            assert_relative_eq!(back.altitude, pos.altitude, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_enu_up_is_surface_normal() {
        let pos = GeoPosition::new(48.3808, -4.49492, 0.0);
        let r = rotation_ecef_enu(pos.latitude, pos.longitude);
        let up = r.column(2).into_owned();

        let above = geodetic_to_ecef(&GeoPosition::new(pos.latitude, pos.longitude, 10.0));
        let below = geodetic_to_ecef(&pos);
        assert_relative_eq!((above - below).normalize(), up, epsilon = 1e-9);
        assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_ray_straight_down_hits_point_below() {
        let pos = GeoPosition::new(34.0, -117.0, 50.0);
        let origin = geodetic_to_ecef(&pos);
        let down = -rotation_ecef_enu(pos.latitude, pos.longitude).column(2).into_owned();

        let hit = intersect_ellipsoid(&origin, &down, 0.0).expect("ray must hit");
        let geo = ecef_to_geodetic(&hit);
        assert_relative_eq!(geo.latitude, 34.0, epsilon = 1e-9);
        assert_relative_eq!(geo.longitude, -117.0, epsilon = 1e-9);
        assert_relative_eq!(geo.altitude, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_ray_pointing_up_misses() {
        let pos = GeoPosition::new(34.0, -117.0, 50.0);
        let origin = geodetic_to_ecef(&pos);
        let up = rotation_ecef_enu(pos.latitude, pos.longitude).column(2).into_owned();

        assert!(intersect_ellipsoid(&origin, &up, 0.0).is_none());
    }
}
