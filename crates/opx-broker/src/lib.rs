//! # opx-broker
//!
//! Broker transport layer: authentication, token lifecycle, and paginated
//! operation listings against the remote venue.
//!
//! The venue is consumed through the [`BrokerTransport`] trait so the sync
//! orchestrator can run against the REST implementation or a mock. The
//! lifecycle is: `login()` → paged `list_operations()` calls (token kept
//! fresh by the [`token::TokenManager`]) → the session simply lapses.
//!
//! | Operation         | Method | Path             | Error prefixes            |
//! |-------------------|--------|------------------|---------------------------|
//! | `login`           | POST   | `/auth/login`    | `AUTH_FAILED`             |
//! | `list_operations` | GET    | `/v1/operations` | `AUTH_REQUIRED`, `RATE_LIMITED`, `SERVER_ERROR` |
//! | `refresh_token`   | POST   | `/auth/refresh`  | `AUTH_REQUIRED`           |

pub mod api;
pub mod rest;
pub mod token;

use anyhow::Result;
use async_trait::async_trait;

use self::api::{ListOperationsRequest, OperationsPage};
use self::token::BrokerAuth;

/// Trait implemented by broker transports.
///
/// All methods take `&self`; implementations hold no request-scoped
/// mutable state, so a single client value can serve a whole sync run.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Authenticate and obtain a bearer session.
    ///
    /// Fails with an `AUTH_FAILED`-prefixed error on bad credentials;
    /// connection-level failures surface with network/timeout wording.
    async fn login(&self, username: &str, password: &str) -> Result<BrokerAuth>;

    /// Fetch one page of executed operations.
    ///
    /// Pagination is cursor-based: pass the `next_page_token` of the prior
    /// response until it comes back `None`.
    async fn list_operations(&self, req: &ListOperationsRequest) -> Result<OperationsPage>;

    /// Exchange a live token for a fresh one.
    ///
    /// Only valid while the current session is alive — the venue rejects
    /// refresh attempts with an expired token.
    async fn refresh_token(&self, token: &str) -> Result<BrokerAuth>;
}
