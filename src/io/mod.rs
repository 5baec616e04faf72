//! Loaders for recorded data.

pub mod pose_log;

pub use pose_log::{PoseEntry, PoseLog};
