//! Positioning source seam (GPS, compass, ...).
//!
//! A positioning source reports through a [`PositioningSink`] stamped with a
//! generation number. Releasing a source bumps the generation so fixes still
//! in flight from it are ignored.

pub mod fixed;
pub mod simulated;

use std::sync::Arc;

use crate::error::ArError;
use crate::origin::LocationOverride;

pub use fixed::{FixedPosition, FixedPositioningSource};
pub use simulated::{PositioningHandle, SimulatedPositioningSource};

/// Receiver of positioning fixes. Called on the source's own thread.
pub trait PositioningHandler: Send + Sync {
    fn location_updated(&self, generation: u64, fix: LocationOverride);

    fn heading_updated(&self, generation: u64, heading: f64);
}

#[derive(Clone)]
pub struct PositioningSink {
    generation: u64,
    handler: Arc<dyn PositioningHandler>,
}

impl PositioningSink {
    pub fn new(generation: u64, handler: Arc<dyn PositioningHandler>) -> Self {
        Self {
            generation,
            handler,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn location(&self, fix: LocationOverride) {
        self.handler.location_updated(self.generation, fix);
    }

    pub fn heading(&self, heading: f64) {
        self.handler.heading_updated(self.generation, heading);
    }
}

impl std::fmt::Debug for PositioningSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositioningSink")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

pub trait PositioningSource: Send {
    fn name(&self) -> &str;

    fn start(&mut self, sink: PositioningSink) -> Result<(), ArError>;

    /// Must be idempotent.
    fn stop(&mut self);
}
