//! Debug overlays for detected planes and feature points.
//!
//! Overlay geometry stays in the tracking world frame; sinks draw it as is.

#[cfg(feature = "rerun")]
pub mod rerun;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::CameraTransform;
use crate::tracking::{DetectedPlane, PointCloud, SessionId};

/// Straight-alpha RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayColor(pub [u8; 4]);

impl OverlayColor {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub fn alpha(self) -> u8 {
        self.0[3]
    }
}

impl fmt::Display for OverlayColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

/// Render-thread consumer of overlay geometry.
pub trait OverlaySink: Send {
    fn draw_planes(&mut self, session: SessionId, planes: &[DetectedPlane], color: OverlayColor);

    fn draw_point_cloud(&mut self, session: SessionId, points: &PointCloud, color: OverlayColor);

    fn camera_moved(&mut self, _transform: &CameraTransform) {}
}

/// Traces overlay sizes instead of drawing them.
#[derive(Debug, Default)]
pub struct LogOverlay {
    pub planes_drawn: usize,
    pub point_clouds_drawn: usize,
}

impl OverlaySink for LogOverlay {
    fn draw_planes(&mut self, session: SessionId, planes: &[DetectedPlane], color: OverlayColor) {
        self.planes_drawn += 1;
        debug!(%session, planes = planes.len(), %color, "planes overlay");
    }

    fn draw_point_cloud(&mut self, session: SessionId, points: &PointCloud, color: OverlayColor) {
        self.point_clouds_drawn += 1;
        debug!(%session, points = points.len(), %color, "point cloud overlay");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_display() {
        assert_eq!(OverlayColor::rgba(255, 0, 16, 128).to_string(), "#ff001080");
    }

    #[test]
    fn test_color_yaml() {
        let c: OverlayColor = serde_yaml::from_str("[0, 255, 0, 100]").unwrap();
        assert_eq!(c, OverlayColor::rgba(0, 255, 0, 100));
        assert_eq!(c.alpha(), 100);
    }
}
