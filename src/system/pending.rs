//! Single-slot, last-write-wins handoff between the tracking thread and the
//! render thread.

use parking_lot::Mutex;

use crate::tracking::SessionId;

/// A value stamped with the session that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged<T> {
    pub session: SessionId,
    pub value: T,
}

/// Holds at most one pending update. Writers overwrite, the reader takes.
///
/// The critical section is a single `Option` swap so neither side can observe
/// a partially written value and neither side waits on the other for long.
#[derive(Debug)]
pub struct PendingSlot<T> {
    slot: Mutex<Option<Tagged<T>>>,
}

impl<T> PendingSlot<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Store `value`, returning true if it replaced an unconsumed update.
    ///
    /// A late update from an older session never displaces a newer one.
    pub fn publish(&self, session: SessionId, value: T) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|pending| pending.session > session) {
            return false;
        }
        slot.replace(Tagged { session, value }).is_some()
    }

    pub fn take(&self) -> Option<Tagged<T>> {
        self.slot.lock().take()
    }

    pub fn clear(&self) {
        self.slot.lock().take();
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl<T> Default for PendingSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_overwrites() {
        let slot = PendingSlot::new();
        assert!(!slot.publish(SessionId::new(1), 1));
        assert!(slot.publish(SessionId::new(1), 2));
        assert!(slot.publish(SessionId::new(2), 3));

        let taken = slot.take().unwrap();
        assert_eq!(taken.session, SessionId::new(2));
        assert_eq!(taken.value, 3);
        assert!(slot.take().is_none());
    }

    #[test]
    fn test_older_session_keeps_newer_update() {
        let slot = PendingSlot::new();
        slot.publish(SessionId::new(3), "first of new session");
        assert!(!slot.publish(SessionId::new(2), "late from old session"));

        let taken = slot.take().unwrap();
        assert_eq!(taken.session, SessionId::new(3));
        assert_eq!(taken.value, "first of new session");

        // An empty slot takes anything
        assert!(!slot.publish(SessionId::new(2), "late"));
        assert_eq!(slot.take().unwrap().session, SessionId::new(2));
    }

    #[test]
    fn test_clear() {
        let slot = PendingSlot::new();
        slot.publish(SessionId::new(1), "a");
        slot.clear();
        assert!(slot.is_empty());
    }
}
