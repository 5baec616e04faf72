//! Rerun-based overlay sink.
//!
//! Entity hierarchy:
//!     status               - Geographic camera (position, heading, pitch, roll)
//!     tracking/
//!         planes           - Detected plane boundaries (line strips)
//!         points           - Feature point cloud

use anyhow::{Context, Result};
use nalgebra::Vector3;
use rerun::RecordingStream;

use crate::geometry::CameraTransform;
use crate::tracking::{DetectedPlane, PointCloud, SessionId};

use super::{OverlayColor, OverlaySink};

pub struct RerunOverlay {
    rec: RecordingStream,
    last_session: Option<SessionId>,
}

impl RerunOverlay {
    /// Spawn a viewer process and stream into it.
    pub fn spawn(app_name: &str) -> Result<Self> {
        let rec = rerun::RecordingStreamBuilder::new(app_name)
            .spawn()
            .context("Failed to spawn rerun viewer")?;

        // Tracking frame is Right-Up-Back
        rec.log_static("tracking", &rerun::ViewCoordinates::RUB()).ok();

        Ok(Self {
            rec,
            last_session: None,
        })
    }

    /// Clear geometry left over from a previous session.
    fn enter_session(&mut self, session: SessionId) {
        if self.last_session != Some(session) {
            self.rec
                .log("tracking", &rerun::Clear::recursive())
                .ok();
            self.last_session = Some(session);
        }
    }
}

fn color(c: OverlayColor) -> rerun::Color {
    let [r, g, b, a] = c.0;
    rerun::Color::from_unmultiplied_rgba(r, g, b, a)
}

fn to_f32(p: &Vector3<f64>) -> [f32; 3] {
    [p.x as f32, p.y as f32, p.z as f32]
}

impl OverlaySink for RerunOverlay {
    fn draw_planes(&mut self, session: SessionId, planes: &[DetectedPlane], c: OverlayColor) {
        self.enter_session(session);

        let strips: Vec<Vec<[f32; 3]>> = planes
            .iter()
            .filter(|p| p.boundary.len() >= 3)
            .map(|p| {
                let mut strip: Vec<[f32; 3]> = p.boundary.iter().map(to_f32).collect();
                // Close the polygon
                strip.push(strip[0]);
                strip
            })
            .collect();

        self.rec
            .log(
                "tracking/planes",
                &rerun::LineStrips3D::new(strips)
                    .with_colors([color(c)])
                    .with_radii([0.005f32]),
            )
            .ok();
    }

    fn draw_point_cloud(&mut self, session: SessionId, points: &PointCloud, c: OverlayColor) {
        self.enter_session(session);

        let pts: Vec<[f32; 3]> = points.iter().map(to_f32).collect();
        self.rec
            .log(
                "tracking/points",
                &rerun::Points3D::new(pts)
                    .with_colors([color(c)])
                    .with_radii([0.01f32]),
            )
            .ok();
    }

    fn camera_moved(&mut self, transform: &CameraTransform) {
        let cam = &transform.camera;
        let text = format!(
            "lat {:.6} | lon {:.6} | alt {:.2} m | heading {:.1} | pitch {:.1} | roll {:.1}",
            cam.position.latitude,
            cam.position.longitude,
            cam.position.altitude,
            cam.heading,
            cam.pitch,
            cam.roll
        );
        self.rec
            .log(
                "status",
                &rerun::TextDocument::new(text).with_media_type(rerun::MediaType::markdown()),
            )
            .ok();
    }
}
