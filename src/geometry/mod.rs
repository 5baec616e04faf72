//! Geometry: rigid transforms, frame conventions, WGS84 geodesy and the
//! tracking-pose to scene-camera reconciliation.

pub mod camera_transform;
pub mod frames;
pub mod geodesy;
pub mod se3;

pub use camera_transform::{
    CameraTransform, GeoCamera, camera_transform_from_se3, compute_camera_transform,
};
pub use geodesy::{GeoPosition, GeoProjection, Wgs84Projection};
pub use se3::SE3;
