//! Progress events emitted by the sync orchestrator.
//!
//! Consumers (the CLI, a UI surface) subscribe to a [`SyncEventReceiver`]
//! to render progress without polling the session.

use opx_core::SyncMode;

/// A typed progress event for one sync session.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The session entered `InProgress`.
    Started { session_id: String, mode: SyncMode },

    /// The broker token was proactively refreshed mid-sync.
    TokenRefreshed,

    /// One page was fetched, normalized, filtered and staged.
    PageStaged {
        /// 1-based page number.
        page: u32,
        /// Rows accepted by the dedup pool.
        accepted: usize,
        /// Raw rows the venue returned on this page.
        evaluated: usize,
    },

    /// The final merge committed successfully.
    Committed { imported: usize, new_orders: usize },

    /// Terminal failure.
    Failed { message: String },

    /// Terminal cancellation; nothing was committed.
    Canceled,
}

/// Sender half of the sync event channel.
pub type SyncEventSender = tokio::sync::mpsc::UnboundedSender<SyncEvent>;

/// Receiver half of the sync event channel.
pub type SyncEventReceiver = tokio::sync::mpsc::UnboundedReceiver<SyncEvent>;

/// Create an event channel pair.
pub fn channel() -> (SyncEventSender, SyncEventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
