use serde::{Deserialize, Serialize};

use crate::error::ArError;
use crate::geometry::GeoPosition;
use crate::origin::LocationOverride;

use super::{PositioningSink, PositioningSource};

/// Surveyed device location from the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedPosition {
    pub position: GeoPosition,
    #[serde(default)]
    pub heading: Option<f64>,
}

/// Reports one configured fix each time it starts.
///
/// Stands in for GPS on hosts without a receiver, e.g. a headless replay of a
/// walk recorded at a known spot.
#[derive(Debug, Clone)]
pub struct FixedPositioningSource {
    fix: FixedPosition,
    sink: Option<PositioningSink>,
}

impl FixedPositioningSource {
    pub fn new(fix: FixedPosition) -> Self {
        Self { fix, sink: None }
    }
}

impl PositioningSource for FixedPositioningSource {
    fn name(&self) -> &str {
        "fixed-positioning"
    }

    fn start(&mut self, sink: PositioningSink) -> Result<(), ArError> {
        sink.location(LocationOverride {
            position: self.fix.position,
            heading: self.fix.heading,
        });
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        self.sink = None;
    }
}
