//! Tracking lifecycle state machine.
//!
//! ```text
//!            start()            first pose
//! Stopped ───────────▶ Starting ───────────▶ Tracking
//!    ▲                    │                   │    ▲
//!    │    start failure   │          reset()  │    │ first pose
//!    ├────────────────────┘                   ▼    │
//!    │                                     Resetting
//!    │             stop() from any state       │
//!    └─────────────────────────────────────────┘
//! ```
//!
//! Pure bookkeeping: no I/O, no threads. The caller holds it behind a short
//! critical section and drives the tracking source according to the returned
//! decisions.

use tracing::debug;

use crate::geometry::SE3;

use super::state::{SessionId, TrackingState};

/// Outcome of offering a pose to the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseAdmission {
    /// Not from the current session (or no session); drop it.
    Stale,
    /// Apply `relative`, the pose expressed against the session reference.
    Accepted {
        relative: SE3,
        /// This pose moved the machine from `Starting`/`Resetting` to `Tracking`.
        entered_tracking: bool,
    },
}

#[derive(Debug)]
pub struct Lifecycle {
    state: TrackingState,
    session: Option<SessionId>,
    next_session: u64,
    /// First pose of the current session; defines the zero offset.
    reference: Option<SE3>,
    interrupted: bool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: TrackingState::Stopped,
            session: None,
            next_session: 1,
            reference: None,
            interrupted: false,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn is_current(&self, session: SessionId) -> bool {
        self.session == Some(session)
    }

    pub fn reference(&self) -> Option<&SE3> {
        self.reference.as_ref()
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    fn begin_session(&mut self) -> SessionId {
        let id = SessionId::new(self.next_session);
        self.next_session += 1;
        self.session = Some(id);
        self.reference = None;
        self.interrupted = false;
        id
    }

    /// `Stopped -> Starting`. Returns the new session, or `None` when already
    /// active (re-entrant start is a no-op).
    pub fn request_start(&mut self) -> Option<SessionId> {
        if self.state != TrackingState::Stopped {
            debug!(state = %self.state, "start ignored");
            return None;
        }
        self.state = TrackingState::Starting;
        Some(self.begin_session())
    }

    /// `Tracking -> Resetting`. Returns the replacement session.
    ///
    /// A no-op in every other state, `Starting` included: no pose has been
    /// seen yet so there is nothing to re-anchor.
    pub fn request_reset(&mut self) -> Option<SessionId> {
        if self.state != TrackingState::Tracking {
            debug!(state = %self.state, "reset ignored");
            return None;
        }
        self.state = TrackingState::Resetting;
        Some(self.begin_session())
    }

    /// Any state -> `Stopped`. Returns false if already stopped.
    pub fn request_stop(&mut self) -> bool {
        if self.state == TrackingState::Stopped {
            return false;
        }
        self.state = TrackingState::Stopped;
        self.session = None;
        self.reference = None;
        self.interrupted = false;
        true
    }

    /// The source refused to start `session`: fall back to `Stopped`.
    pub fn start_failed(&mut self, session: SessionId) -> bool {
        let pending = matches!(
            self.state,
            TrackingState::Starting | TrackingState::Resetting
        );
        if !pending || !self.is_current(session) {
            return false;
        }
        self.request_stop()
    }

    pub fn admit_pose(&mut self, session: SessionId, pose: &SE3) -> PoseAdmission {
        if !self.is_current(session) {
            return PoseAdmission::Stale;
        }

        match self.state {
            TrackingState::Stopped => PoseAdmission::Stale,
            TrackingState::Starting | TrackingState::Resetting => {
                self.reference = Some(*pose);
                self.state = TrackingState::Tracking;
                PoseAdmission::Accepted {
                    relative: SE3::identity(),
                    entered_tracking: true,
                }
            }
            TrackingState::Tracking => {
                let relative = match &self.reference {
                    Some(reference) => reference.inverse().compose(pose),
                    None => {
                        self.reference = Some(*pose);
                        SE3::identity()
                    }
                };
                PoseAdmission::Accepted {
                    relative,
                    entered_tracking: false,
                }
            }
        }
    }

    /// Returns true if the flag changed.
    pub fn set_interrupted(&mut self, session: SessionId, interrupted: bool) -> bool {
        if !self.is_current(session) || self.interrupted == interrupted {
            return false;
        }
        self.interrupted = interrupted;
        true
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
