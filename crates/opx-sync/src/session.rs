//! Sync session bookkeeping.
//!
//! One [`SyncSession`] is created per orchestration call and mutated
//! through the staging steps until it reaches a terminal state. Terminal
//! failure is session state, not a Rust error — cancellation in
//! particular is a first-class outcome, never a failure.

use opx_core::time_util::now_ms;
use opx_core::{SyncMode, SyncStatus};
use serde::Serialize;
use uuid::Uuid;

/// Machine-readable failure code on a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCode {
    /// The broker session is dead or missing; the user must log in again.
    TokenExpired,
    /// The venue throttled the sync past the retry budget.
    RateLimited,
    /// Transport or venue failure after retries were exhausted.
    Transport,
}

/// Failure details attached to a terminal [`SyncStatus::Failed`] session.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    pub code: FailureCode,
    pub message: String,
    /// The caller should prompt for a fresh login before the next sync.
    pub needs_reauth: bool,
    /// Suggested wait before retrying, for rate-limit failures.
    pub suggested_wait_secs: Option<u64>,
}

/// State of one sync orchestration call.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSession {
    pub session_id: String,
    pub status: SyncStatus,
    /// ms since epoch.
    pub start_time: u64,
    pub end_time: Option<u64>,
    /// Rows committed by the final merge.
    pub operations_imported_count: usize,
    /// Raw rows the venue returned across all pages.
    pub operations_evaluated_count: usize,
    pub pages_fetched: u32,
    pub retry_attempts: u32,
    pub mode: SyncMode,
    pub error: Option<SyncFailure>,
}

impl SyncSession {
    /// Allocate a session and enter `InProgress`.
    pub fn start(mode: SyncMode) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            status: SyncStatus::InProgress,
            start_time: now_ms(),
            end_time: None,
            operations_imported_count: 0,
            operations_evaluated_count: 0,
            pages_fetched: 0,
            retry_attempts: 0,
            mode,
            error: None,
        }
    }

    pub fn succeed(&mut self, imported: usize) {
        self.status = SyncStatus::Success;
        self.operations_imported_count = imported;
        self.end_time = Some(now_ms());
    }

    pub fn fail(&mut self, failure: SyncFailure) {
        self.status = SyncStatus::Failed;
        self.error = Some(failure);
        self.end_time = Some(now_ms());
    }

    pub fn cancel(&mut self) {
        self.status = SyncStatus::Canceled;
        self.end_time = Some(now_ms());
    }
}
