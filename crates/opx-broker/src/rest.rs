//! REST implementation of the broker transport.
//!
//! An explicit client value constructed with its base URL and injected
//! into the orchestrator — no module-level token or URL state. Errors are
//! surfaced as [`OpxError`] values carrying the HTTP status and the
//! venue's message prefix, which is exactly what the error taxonomy
//! pattern-matches.

use anyhow::Result;
use async_trait::async_trait;
use opx_core::config::BrokerSection;
use opx_core::error::OpxError;
use tracing::debug;
use url::Url;

use crate::api::{AuthResponse, ListOperationsRequest, OperationsPage};
use crate::token::BrokerAuth;

/// Connection settings for the REST transport.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Validated base URL without a trailing slash.
    pub base_url: String,
    pub page_size: u32,
    pub account_id: Option<String>,
}

impl BrokerConfig {
    /// Validate and normalize the base URL.
    pub fn new(base_url: &str, page_size: u32, account_id: Option<String>) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| OpxError::Config(format!("invalid broker base_url {base_url:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(OpxError::Config(format!(
                "broker base_url must be http(s), got {:?}",
                parsed.scheme(),
            ))
            .into());
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
            account_id,
        })
    }

    pub fn from_section(section: &BrokerSection) -> Result<Self> {
        Self::new(
            &section.base_url,
            section.effective_page_size(),
            section.account_id.clone(),
        )
    }
}

/// REST broker client.
pub struct RestBroker {
    http: reqwest::Client,
    config: BrokerConfig,
}

impl RestBroker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }
}

/// Map a connection-level failure to a transport error whose wording the
/// taxonomy recognizes as transient.
fn transport_error(e: reqwest::Error) -> OpxError {
    if e.is_timeout() {
        OpxError::Transport(format!("request timeout: {e}"))
    } else {
        OpxError::Transport(format!("network error: {e}"))
    }
}

/// Map a non-success login status to the venue's error vocabulary.
fn login_error(status: u16, body: &str) -> OpxError {
    let message = match status {
        401 | 403 => format!("AUTH_FAILED: invalid credentials ({})", snippet(body)),
        s if s >= 500 => format!("SERVER_ERROR: login failed with {s} ({})", snippet(body)),
        s => format!("login rejected with {s} ({})", snippet(body)),
    };
    OpxError::Api { status, message }
}

/// Map a non-success listing/refresh status to the venue's error
/// vocabulary. The status itself rides along for the taxonomy.
fn list_error(status: u16, body: &str, retry_after_secs: Option<u64>) -> OpxError {
    let message = match status {
        401 | 403 => format!("AUTH_REQUIRED: session rejected ({})", snippet(body)),
        429 => match retry_after_secs {
            Some(secs) => format!("RATE_LIMITED: venue throttled the request retry_after={secs}"),
            None => "RATE_LIMITED: venue throttled the request".to_string(),
        },
        s if s >= 500 => format!("SERVER_ERROR: venue returned {s} ({})", snippet(body)),
        s => format!("request rejected with {s} ({})", snippet(body)),
    };
    OpxError::Api { status, message }
}

/// First line of a response body, truncated for log hygiene.
fn snippet(body: &str) -> &str {
    let line = body.lines().next().unwrap_or("");
    match line.char_indices().nth(160) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

fn auth_from_response(resp: AuthResponse) -> BrokerAuth {
    BrokerAuth {
        token: resp.token,
        expiry: resp.expiry,
        account_id: resp.account_id,
        display_name: resp.display_name,
    }
}

#[async_trait]
impl crate::BrokerTransport for RestBroker {
    async fn login(&self, username: &str, password: &str) -> Result<BrokerAuth> {
        let url = self.endpoint("/auth/login");
        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(login_error(status, &body).into());
        }

        let parsed: AuthResponse = resp
            .json()
            .await
            .map_err(|e| OpxError::Parse(format!("login response: {e}")))?;
        debug!("logged in, session expiry {}", parsed.expiry);
        Ok(auth_from_response(parsed))
    }

    async fn list_operations(&self, req: &ListOperationsRequest) -> Result<OperationsPage> {
        let url = self.endpoint("/v1/operations");
        let mut query: Vec<(&str, String)> = vec![("pageSize", req.page_size.to_string())];
        if let Some(ref date) = req.date {
            query.push(("date", date.clone()));
        }
        if let Some(ref token) = req.page_token {
            query.push(("pageToken", token.clone()));
        }
        if let Some(ref account) = req.account_id {
            query.push(("accountId", account.clone()));
        }

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&req.token)
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            let body = resp.text().await.unwrap_or_default();
            return Err(list_error(status, &body, retry_after).into());
        }

        let page: OperationsPage = resp
            .json()
            .await
            .map_err(|e| OpxError::Parse(format!("operations page: {e}")))?;
        debug!(
            "fetched page: {} rows, next_token={}",
            page.operations.len(),
            page.next_page_token.is_some(),
        );
        Ok(page)
    }

    async fn refresh_token(&self, token: &str) -> Result<BrokerAuth> {
        let url = self.endpoint("/auth/refresh");
        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(list_error(status, &body, None).into());
        }

        let parsed: AuthResponse = resp
            .json()
            .await
            .map_err(|e| OpxError::Parse(format!("refresh response: {e}")))?;
        Ok(auth_from_response(parsed))
    }
}
