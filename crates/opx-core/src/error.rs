//! Typed error definitions and the broker error taxonomy.
//!
//! [`OpxError`] covers domain-specific failures; all variants implement
//! `std::error::Error` via `thiserror` and integrate with `anyhow::Result`.
//!
//! The taxonomy ([`classify`] / [`should_retry`]) drives the retry policy:
//! the HTTP status, when present, takes precedence over message patterns,
//! and unknown errors are treated as permanent so they are never retried.

use thiserror::Error;

/// Domain-specific errors for the operations gateway.
#[derive(Debug, Error)]
pub enum OpxError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// No broker session is present; the caller must log in first.
    #[error("NOT_AUTHENTICATED: no broker session")]
    NotAuthenticated,

    /// The broker session is past its expiry. Refresh is proactive only —
    /// a dead token is never silently exchanged.
    #[error("TOKEN_EXPIRED: broker session expired, log in again")]
    TokenExpired,

    /// An HTTP error response from the broker API. The message carries the
    /// venue's prefix (`AUTH_REQUIRED`, `RATE_LIMITED`, `SERVER_ERROR`).
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Connection-level transport failure (DNS, refused, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),
}

impl OpxError {
    /// HTTP status for API errors, `None` otherwise.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Retry-policy category of a broker error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credentials problem — surface for re-login, never retry.
    Auth,
    /// Venue throttling — retry after backoff.
    RateLimit,
    /// Network/server hiccup — retry after backoff.
    Transient,
    /// Anything else — surface to the caller, never retry.
    Permanent,
}

/// Classify an error by HTTP status (when available) and message.
///
/// The status takes precedence over message matching. Message substrings
/// are matched case-insensitively. Unknown errors map to
/// [`ErrorCategory::Permanent`] — retrying them would mask real faults.
pub fn classify(status: Option<u16>, message: &str) -> ErrorCategory {
    match status {
        Some(401) | Some(403) => return ErrorCategory::Auth,
        Some(429) => return ErrorCategory::RateLimit,
        Some(s) if s >= 500 => return ErrorCategory::Transient,
        Some(s) if (400..500).contains(&s) => return ErrorCategory::Permanent,
        _ => {}
    }

    let lower = message.to_lowercase();
    if lower.contains("auth_failed")
        || lower.contains("auth_required")
        || lower.contains("token_expired")
    {
        ErrorCategory::Auth
    } else if lower.contains("rate_limited") {
        ErrorCategory::RateLimit
    } else if lower.contains("timeout")
        || lower.contains("network")
        || lower.contains("econnrefused")
        || lower.contains("server_error")
    {
        ErrorCategory::Transient
    } else {
        ErrorCategory::Permanent
    }
}

/// Classify an `anyhow::Error`, pulling the HTTP status out of an
/// [`OpxError::Api`] anywhere in the chain and matching the rendered
/// context chain otherwise.
pub fn classify_anyhow(err: &anyhow::Error) -> ErrorCategory {
    let status = err.downcast_ref::<OpxError>().and_then(OpxError::status_code);
    classify(status, &format!("{err:#}"))
}

/// Whether an error of this category should be retried.
pub fn should_retry(category: ErrorCategory) -> bool {
    matches!(category, ErrorCategory::Transient | ErrorCategory::RateLimit)
}

/// Extract a suggested wait (seconds) from a rate-limit message.
///
/// The venue appends `retry_after=<secs>` when it supplies one.
pub fn suggested_wait_secs(message: &str) -> Option<u64> {
    let idx = message.find("retry_after=")?;
    let rest = &message[idx + "retry_after=".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
