use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ArError;
use crate::geometry::GeoPosition;
use crate::origin::LocationOverride;

use super::{PositioningSink, PositioningSource};

#[derive(Debug, Default)]
struct Inner {
    sink: Option<PositioningSink>,
    starts: usize,
    stops: usize,
}

/// Positioning source fed by hand through a [`PositioningHandle`].
pub struct SimulatedPositioningSource {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Clone)]
pub struct PositioningHandle {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedPositioningSource {
    pub fn new() -> (Self, PositioningHandle) {
        let inner = Arc::new(Mutex::new(Inner::default()));
        (
            Self {
                inner: Arc::clone(&inner),
            },
            PositioningHandle { inner },
        )
    }
}

impl PositioningSource for SimulatedPositioningSource {
    fn name(&self) -> &str {
        "simulated-positioning"
    }

    fn start(&mut self, sink: PositioningSink) -> Result<(), ArError> {
        let mut inner = self.inner.lock();
        inner.starts += 1;
        inner.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        let mut inner = self.inner.lock();
        if inner.sink.take().is_some() {
            inner.stops += 1;
        }
    }
}

impl PositioningHandle {
    pub fn is_running(&self) -> bool {
        self.inner.lock().sink.is_some()
    }

    pub fn starts(&self) -> usize {
        self.inner.lock().starts
    }

    pub fn stops(&self) -> usize {
        self.inner.lock().stops
    }

    /// Sink of the running source, kept alive past `stop` by callers that
    /// want to simulate late fixes.
    pub fn sink(&self) -> Option<PositioningSink> {
        self.inner.lock().sink.clone()
    }

    pub fn push_location(&self, position: GeoPosition, heading: Option<f64>) {
        if let Some(sink) = self.sink() {
            sink.location(LocationOverride { position, heading });
        }
    }

    pub fn push_heading(&self, heading: f64) {
        if let Some(sink) = self.sink() {
            sink.heading(heading);
        }
    }
}
