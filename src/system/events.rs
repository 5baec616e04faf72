//! Typed notifications emitted by the core.
//!
//! Subscribers get a bounded `crossbeam-channel` receiver. Emission never
//! blocks: a full subscriber misses the event, a dropped one is pruned.

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;
use tracing::trace;

use crate::geometry::{CameraTransform, GeoPosition, SE3};
use crate::tracking::{FieldOfView, InterruptionReason, SessionId, TrackingState};

/// Default capacity of a subscriber channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum ArEvent {
    /// A new transform was computed on the tracking thread.
    CameraTransformChanged {
        session: SessionId,
        transform: CameraTransform,
    },
    FieldOfViewChanged {
        session: SessionId,
        fov: FieldOfView,
    },
    LocationChanged(GeoPosition),
    HeadingChanged(f64),
    InitialTransformationChanged(SE3),
    /// A fresh session replaced the previous one.
    TrackingReset { session: SessionId },
    TrackingStateChanged(TrackingState),
    TrackingInterrupted {
        session: SessionId,
        reason: InterruptionReason,
    },
    TrackingResumed { session: SessionId },
    /// The render thread finished its pre-draw update for `frame`.
    RenderFrame { frame: u64 },
}

pub struct EventBus {
    capacity: usize,
    subscribers: Mutex<Vec<Sender<ArEvent>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<ArEvent> {
        let (tx, rx) = bounded(self.capacity);
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn emit(&self, event: ArEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("event subscriber full, event dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
