//! Tracking side of the core: the source adapter seam, the canonical pose and
//! intrinsics types, and the lifecycle state machine.
//!
//! Sources run on their own thread and report through a session-stamped
//! [`TrackingSink`]. Everything here is independent of the scene host.

pub mod lifecycle;
pub mod pose;
pub mod replay;
pub mod simulated;
pub mod source;
pub mod state;

pub use lifecycle::{Lifecycle, PoseAdmission};
pub use pose::{DetectedPlane, FieldOfView, PointCloud, TrackingPose};
pub use replay::ReplayTrackingSource;
pub use simulated::{SimulatedHandle, SimulatedTrackingSource};
pub use source::{InterruptionReason, TrackingHandler, TrackingSink, TrackingSource};
pub use state::{SessionId, TrackingState};
