//! Error taxonomy for the tracking core.
//!
//! Geometry failures (`InvalidPose`, `NoSurfaceHit`) are handled where they
//! occur and degrade to "no change". Lifecycle failures (`PermissionDenied`,
//! `PlatformUnsupported`) are returned to the caller so the UI can react.

use thiserror::Error;

use crate::tracking::SessionId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArError {
    /// Degenerate rotation or non-finite translation from the tracking source.
    #[error("invalid pose: {0}")]
    InvalidPose(&'static str),

    /// The platform refused camera or motion access.
    #[error("camera or motion permission denied")]
    PermissionDenied,

    /// The device cannot run an AR tracking session.
    #[error("AR tracking is not supported on this platform: {0}")]
    PlatformUnsupported(String),

    /// An update arrived tagged with a session that has been torn down.
    #[error("update from stale session {0}")]
    StaleSessionUpdate(SessionId),

    /// A screen-space query found no geometry to intersect.
    #[error("no surface under screen point ({x:.1}, {y:.1})")]
    NoSurfaceHit { x: f64, y: f64 },

    #[error("translation factor must be finite and > 0, got {0}")]
    InvalidTranslationFactor(f64),
}

impl ArError {
    /// Lifecycle failures leave tracking stopped and must reach the caller.
    pub fn is_lifecycle_failure(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::PlatformUnsupported(_))
    }
}
