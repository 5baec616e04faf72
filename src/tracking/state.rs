//! Tracking lifecycle states and session identifiers.

use std::fmt;

/// State of the tracking lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingState {
    /// No session; updates are discarded.
    Stopped,
    /// Session requested, waiting for the first pose.
    Starting,
    /// Poses are being turned into scene cameras.
    Tracking,
    /// Old session torn down, waiting for the first pose of the new one.
    Resetting,
}

impl TrackingState {
    /// True while a session exists (everything but `Stopped`).
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Stopped)
    }
}

impl Default for TrackingState {
    fn default() -> Self {
        Self::Stopped
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Tracking => "tracking",
            Self::Resetting => "resetting",
        };
        f.write_str(s)
    }
}

/// Identifies one lifetime of the platform tracking session.
///
/// Every update is tagged with the session that produced it so that updates
/// racing a stop or reset can be recognised and dropped. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_stopped() {
        assert_eq!(TrackingState::default(), TrackingState::Stopped);
        assert!(!TrackingState::Stopped.is_active());
        assert!(TrackingState::Resetting.is_active());
    }

    #[test]
    fn test_session_id_display() {
        assert_eq!(format!("{}", SessionId::new(7)), "S7");
        assert!(SessionId::new(2) > SessionId::new(1));
    }
}
