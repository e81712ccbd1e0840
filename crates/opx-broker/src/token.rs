//! Bearer-token lifecycle management.
//!
//! The venue's sessions are short-lived; the [`TokenManager`] refreshes a
//! token proactively inside a configurable window before expiry. Refresh is
//! proactive only: a token that is already past expiry cannot be exchanged
//! (the venue requires a live session), so that case surfaces as
//! `TOKEN_EXPIRED` for the caller to re-login.

use anyhow::{Context, Result};
use opx_core::error::OpxError;
use opx_core::time_util::now_ms;
use tracing::info;

use crate::BrokerTransport;

/// Default proactive-refresh window before expiry.
pub const DEFAULT_REFRESH_THRESHOLD_MS: u64 = 60_000;

/// An authenticated broker session.
///
/// Replaced wholesale on refresh — never edited in place.
#[derive(Debug, Clone)]
pub struct BrokerAuth {
    pub token: String,
    /// Session expiry (ms since epoch).
    pub expiry: u64,
    pub account_id: Option<String>,
    pub display_name: Option<String>,
}

/// Tracks token expiry and performs proactive refresh.
#[derive(Debug, Clone)]
pub struct TokenManager {
    threshold_ms: u64,
}

impl Default for TokenManager {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_THRESHOLD_MS)
    }
}

impl TokenManager {
    /// `threshold_ms` is the proactive-refresh window before expiry.
    pub fn new(threshold_ms: u64) -> Self {
        Self { threshold_ms }
    }

    /// Whether the token is inside the refresh window.
    pub fn needs_refresh(&self, auth: &BrokerAuth) -> bool {
        self.needs_refresh_at(auth, now_ms())
    }

    pub(crate) fn needs_refresh_at(&self, auth: &BrokerAuth, now: u64) -> bool {
        now >= auth.expiry.saturating_sub(self.threshold_ms)
    }

    /// Whether the token is still alive.
    pub fn is_valid(&self, auth: &BrokerAuth) -> bool {
        Self::is_valid_at(auth, now_ms())
    }

    pub(crate) fn is_valid_at(auth: &BrokerAuth, now: u64) -> bool {
        now < auth.expiry
    }

    /// Return a token guaranteed usable for the next request, refreshing
    /// proactively when inside the window.
    ///
    /// Fails with [`OpxError::NotAuthenticated`] when no session is
    /// present, and with [`OpxError::TokenExpired`] when the session is
    /// already dead. On refresh, `account_id`/`display_name` survive the
    /// swap and `on_refreshed` observes the new session (persistence
    /// side effect).
    pub async fn ensure_valid<F>(
        &self,
        transport: &dyn BrokerTransport,
        auth: &mut Option<BrokerAuth>,
        mut on_refreshed: F,
    ) -> Result<String>
    where
        F: FnMut(&BrokerAuth),
    {
        let current = auth.as_ref().ok_or(OpxError::NotAuthenticated)?;
        let now = now_ms();

        if !Self::is_valid_at(current, now) {
            return Err(OpxError::TokenExpired.into());
        }
        if !self.needs_refresh_at(current, now) {
            return Ok(current.token.clone());
        }

        let mut refreshed = transport
            .refresh_token(&current.token)
            .await
            .context("proactive token refresh failed")?;
        if refreshed.account_id.is_none() {
            refreshed.account_id = current.account_id.clone();
        }
        if refreshed.display_name.is_none() {
            refreshed.display_name = current.display_name.clone();
        }
        info!("broker token refreshed, new expiry {}", refreshed.expiry);

        on_refreshed(&refreshed);
        let token = refreshed.token.clone();
        *auth = Some(refreshed);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use opx_core::error::{ErrorCategory, classify_anyhow};

    use crate::api::{ListOperationsRequest, OperationsPage};

    use super::*;

    fn auth_expiring_at(expiry: u64) -> BrokerAuth {
        BrokerAuth {
            token: "tok-1".into(),
            expiry,
            account_id: Some("acc-9".into()),
            display_name: Some("Cuenta Comitente".into()),
        }
    }

    struct FixedRefresh;

    #[async_trait]
    impl BrokerTransport for FixedRefresh {
        async fn login(&self, _: &str, _: &str) -> Result<BrokerAuth> {
            unreachable!("login is not exercised here")
        }

        async fn list_operations(&self, _: &ListOperationsRequest) -> Result<OperationsPage> {
            unreachable!("listing is not exercised here")
        }

        async fn refresh_token(&self, token: &str) -> Result<BrokerAuth> {
            assert_eq!(token, "tok-1");
            Ok(BrokerAuth {
                token: "tok-2".into(),
                expiry: now_ms() + 3_600_000,
                account_id: None,
                display_name: None,
            })
        }
    }

    #[test]
    fn refresh_window_edges() {
        let mgr = TokenManager::default();
        let auth = auth_expiring_at(1_000_000);
        assert!(!mgr.needs_refresh_at(&auth, 939_999));
        assert!(mgr.needs_refresh_at(&auth, 940_000));
        assert!(TokenManager::is_valid_at(&auth, 999_999));
        assert!(!TokenManager::is_valid_at(&auth, 1_000_000));
    }

    #[tokio::test]
    async fn missing_session_is_not_authenticated() {
        let mgr = TokenManager::default();
        let mut auth = None;
        let err = mgr
            .ensure_valid(&FixedRefresh, &mut auth, |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("NOT_AUTHENTICATED"));
        assert_eq!(classify_anyhow(&err), ErrorCategory::Auth);
    }

    #[tokio::test]
    async fn dead_token_is_never_silently_refreshed() {
        let mgr = TokenManager::default();
        let mut auth = Some(auth_expiring_at(now_ms().saturating_sub(1)));
        let err = mgr
            .ensure_valid(&FixedRefresh, &mut auth, |_| {})
            .await
            .unwrap_err();
        assert!(err.to_string().contains("TOKEN_EXPIRED"));
    }

    #[tokio::test]
    async fn proactive_refresh_preserves_account_fields() {
        let mgr = TokenManager::default();
        // Inside the 60s window but not yet expired.
        let mut auth = Some(auth_expiring_at(now_ms() + 30_000));
        let mut observed = None;
        let token = mgr
            .ensure_valid(&FixedRefresh, &mut auth, |a| observed = Some(a.clone()))
            .await
            .unwrap();
        assert_eq!(token, "tok-2");
        let new_auth = auth.unwrap();
        assert_eq!(new_auth.account_id.as_deref(), Some("acc-9"));
        assert_eq!(new_auth.display_name.as_deref(), Some("Cuenta Comitente"));
        assert_eq!(observed.unwrap().token, "tok-2");
    }

    #[tokio::test]
    async fn healthy_token_passes_through_unchanged() {
        let mgr = TokenManager::default();
        let mut auth = Some(auth_expiring_at(now_ms() + 3_600_000));
        let token = mgr
            .ensure_valid(&FixedRefresh, &mut auth, |_| {
                panic!("no refresh expected for a healthy token")
            })
            .await
            .unwrap();
        assert_eq!(token, "tok-1");
    }
}
