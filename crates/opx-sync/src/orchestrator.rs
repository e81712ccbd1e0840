//! Sync orchestration: paginated fetch → normalize → filter → dedupe →
//! stage → commit.
//!
//! The orchestrator drives one long-lived asynchronous sequence per call.
//! Pagination is strictly sequential (each page token depends on the
//! prior response), cancellation is cooperative — the token is polled
//! before each page fetch and before the final commit — and the commit is
//! all-or-nothing: a canceled session discards everything it staged.
//!
//! ```text
//! run()
//! ├── cancellation check            (per page)
//! ├── TokenManager::ensure_valid    (proactive refresh)
//! ├── retry_with_backoff(fetch)     (taxonomy-driven predicate)
//! ├── normalize + min-timestamp filter + dedupe pool
//! └── on cursor exhaustion: cancellation check → merge_batch → commit
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use opx_broker::api::ListOperationsRequest;
use opx_broker::token::{BrokerAuth, TokenManager};
use opx_broker::BrokerTransport;
use opx_core::dedup::{merge_batch, OperationDedup};
use opx_core::error::{classify_anyhow, should_retry, suggested_wait_secs, ErrorCategory, OpxError};
use opx_core::retry::{retry_with_backoff, RetryPolicy};
use opx_core::{Operation, SyncMode};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::event::{SyncEvent, SyncEventSender};
use crate::normalize::normalize_row;
use crate::session::{FailureCode, SyncFailure, SyncSession};

/// Default suggested wait when the venue rate-limits without a hint.
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;

/// Outcome of one sync orchestration call.
///
/// `operations` is the merged set on success and empty on failure or
/// cancellation — staged pages are never partially committed.
#[derive(Debug)]
pub struct SyncReport {
    pub session: SyncSession,
    pub operations: Vec<Operation>,
    pub new_orders_count: usize,
    pub new_ops_count: usize,
}

/// Drives paginated sync against a [`BrokerTransport`].
///
/// One logical sync at a time: callers must serialize invocations against
/// the same destination (the pool is local to a call, the destination is
/// not).
pub struct SyncOrchestrator<T: BrokerTransport> {
    transport: T,
    token_manager: TokenManager,
    retry_policy: RetryPolicy,
    page_size: u32,
    account_id: Option<String>,
    cancel: CancellationToken,
    events: Option<SyncEventSender>,
}

impl<T: BrokerTransport> SyncOrchestrator<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            token_manager: TokenManager::default(),
            retry_policy: RetryPolicy::default(),
            page_size: 50,
            account_id: None,
            cancel: CancellationToken::new(),
            events: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_token_manager(mut self, manager: TokenManager) -> Self {
        self.token_manager = manager;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_account_id(mut self, account_id: Option<String>) -> Self {
        self.account_id = account_id;
        self
    }

    pub fn with_events(mut self, events: SyncEventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Handle callers use to request cooperative cancellation.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Full sync of the requested date (or the venue default range).
    pub async fn sync_daily(
        &self,
        auth: &mut Option<BrokerAuth>,
        baseline: &[Operation],
        date: Option<String>,
    ) -> SyncReport {
        self.run(SyncMode::Daily, date, None, auth, baseline).await
    }

    /// Incremental sync: drops operations at or before the watermark of
    /// the last successful sync. Same algorithm as [`Self::sync_daily`],
    /// parameterized.
    pub async fn refresh(
        &self,
        auth: &mut Option<BrokerAuth>,
        baseline: &[Operation],
        last_sync_timestamp_ms: u64,
    ) -> SyncReport {
        self.run(
            SyncMode::Refresh,
            None,
            Some(last_sync_timestamp_ms),
            auth,
            baseline,
        )
        .await
    }

    async fn run(
        &self,
        mode: SyncMode,
        date: Option<String>,
        min_timestamp_ms: Option<u64>,
        auth: &mut Option<BrokerAuth>,
        baseline: &[Operation],
    ) -> SyncReport {
        let mut session = SyncSession::start(mode);
        info!("sync {} started — session {}", mode, session.session_id);
        self.emit(SyncEvent::Started {
            session_id: session.session_id.clone(),
            mode,
        });

        let mut pool = OperationDedup::seeded(baseline);
        let mut staged: Vec<Operation> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            if self.cancel.is_cancelled() {
                return self.finish_canceled(session);
            }

            // Keep the token usable for the whole page round-trip.
            let token = match self
                .token_manager
                .ensure_valid(&self.transport, auth, |_| self.emit(SyncEvent::TokenRefreshed))
                .await
            {
                Ok(token) => token,
                Err(e) => return self.finish_failed(session, auth_or_transport_failure(&e)),
            };

            let request = ListOperationsRequest {
                token,
                date: date.clone(),
                page_token: page_token.clone(),
                account_id: self.account_id.clone(),
                page_size: self.page_size,
            };

            let calls = AtomicU32::new(0);
            let fetched = retry_with_backoff(
                &self.retry_policy,
                |e| should_retry(classify_anyhow(e)),
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let request = request.clone();
                    async move { self.transport.list_operations(&request).await }
                },
            )
            .await;
            session.retry_attempts += calls.load(Ordering::SeqCst).saturating_sub(1);

            let page = match fetched {
                Ok(page) => page,
                Err(e) => return self.finish_failed(session, fetch_failure(&e)),
            };

            session.pages_fetched += 1;
            let evaluated = page.operations.len();
            session.operations_evaluated_count += evaluated;

            let mut accepted = 0usize;
            for row in &page.operations {
                let Some(op) = normalize_row(row) else { continue };
                if let Some(min) = min_timestamp_ms {
                    if op.trade_timestamp <= min {
                        continue;
                    }
                }
                if pool.insert(&op) {
                    staged.push(op);
                    accepted += 1;
                }
            }
            self.emit(SyncEvent::PageStaged {
                page: session.pages_fetched,
                accepted,
                evaluated,
            });

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        // Commit is all-or-nothing: a late cancellation discards every
        // staged page.
        if self.cancel.is_cancelled() {
            return self.finish_canceled(session);
        }

        let outcome = merge_batch(baseline, &staged);
        session.succeed(outcome.new_ops_count);
        info!(
            "sync {} committed — {} new operation(s), {} new order(s), {} page(s), {} retry(ies)",
            session.session_id,
            outcome.new_ops_count,
            outcome.new_orders_count,
            session.pages_fetched,
            session.retry_attempts,
        );
        self.emit(SyncEvent::Committed {
            imported: outcome.new_ops_count,
            new_orders: outcome.new_orders_count,
        });

        SyncReport {
            session,
            operations: outcome.merged,
            new_orders_count: outcome.new_orders_count,
            new_ops_count: outcome.new_ops_count,
        }
    }

    fn finish_canceled(&self, mut session: SyncSession) -> SyncReport {
        warn!("sync {} canceled — staged pages discarded", session.session_id);
        session.cancel();
        self.emit(SyncEvent::Canceled);
        SyncReport {
            session,
            operations: Vec::new(),
            new_orders_count: 0,
            new_ops_count: 0,
        }
    }

    fn finish_failed(&self, mut session: SyncSession, failure: SyncFailure) -> SyncReport {
        warn!("sync {} failed: {}", session.session_id, failure.message);
        self.emit(SyncEvent::Failed {
            message: failure.message.clone(),
        });
        session.fail(failure);
        SyncReport {
            session,
            operations: Vec::new(),
            new_orders_count: 0,
            new_ops_count: 0,
        }
    }

    fn emit(&self, event: SyncEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event);
        }
    }
}

/// Token-manager failures: auth problems require re-login; anything else
/// (a refresh call lost to the network) is a transport failure.
fn auth_or_transport_failure(e: &anyhow::Error) -> SyncFailure {
    let is_auth = matches!(
        e.downcast_ref::<OpxError>(),
        Some(OpxError::NotAuthenticated | OpxError::TokenExpired),
    ) || classify_anyhow(e) == ErrorCategory::Auth;

    if is_auth {
        SyncFailure {
            code: FailureCode::TokenExpired,
            message: format!("{e:#}"),
            needs_reauth: true,
            suggested_wait_secs: None,
        }
    } else {
        SyncFailure {
            code: FailureCode::Transport,
            message: format!("{e:#}"),
            needs_reauth: false,
            suggested_wait_secs: None,
        }
    }
}

/// Page-fetch failures after the retry budget, mapped by taxonomy.
fn fetch_failure(e: &anyhow::Error) -> SyncFailure {
    let message = format!("{e:#}");
    match classify_anyhow(e) {
        ErrorCategory::Auth => SyncFailure {
            code: FailureCode::TokenExpired,
            message,
            needs_reauth: true,
            suggested_wait_secs: None,
        },
        ErrorCategory::RateLimit => SyncFailure {
            code: FailureCode::RateLimited,
            suggested_wait_secs: Some(
                suggested_wait_secs(&message).unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS),
            ),
            message,
            needs_reauth: false,
        },
        ErrorCategory::Transient | ErrorCategory::Permanent => SyncFailure {
            code: FailureCode::Transport,
            message,
            needs_reauth: false,
            suggested_wait_secs: None,
        },
    }
}
