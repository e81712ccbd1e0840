//! # opx-sync
//!
//! Broker synchronization pipeline: paginated fetch → normalize → filter
//! → dedupe → stage → commit, with taxonomy-driven retries, proactive
//! token refresh, cooperative cancellation, and progress events.
//!
//! ## Lifecycle
//!
//! 1. Construct a [`SyncOrchestrator`] over a
//!    [`BrokerTransport`](opx_broker::BrokerTransport).
//! 2. Call [`SyncOrchestrator::sync_daily`] or
//!    [`SyncOrchestrator::refresh`] with the current auth state and the
//!    baseline operation set.
//! 3. Read the returned [`SyncReport`]: a terminal session state
//!    (success/failed/canceled) plus the merged operation set on success.
//!
//! Callers must serialize sync invocations against the same destination;
//! the engine assumes no concurrent reentrancy.

pub mod event;
pub mod normalize;
pub mod orchestrator;
pub mod session;

pub use event::{SyncEvent, SyncEventReceiver, SyncEventSender};
pub use orchestrator::{SyncOrchestrator, SyncReport};
pub use session::{FailureCode, SyncFailure, SyncSession};
