//! System orchestration: the public operations, the state shared with the
//! tracking thread, and the render-thread handoff.
//!
//! This module contains the top-level `ArSystem` that UI bindings drive,
//! along with the shared state, the pending-update slots and the typed
//! notifications.

mod ar_system;
pub mod events;
pub mod frame_sync;
pub mod pending;
pub mod shared_state;

pub use ar_system::{ArSystem, PositioningFactory};
pub use events::{ArEvent, EventBus};
pub use frame_sync::{FrameReport, FrameSyncBridge};
pub use pending::{PendingSlot, Tagged};
pub use shared_state::SharedState;
