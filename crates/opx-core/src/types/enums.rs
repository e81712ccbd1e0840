//! Enumerations used throughout the operations gateway.
//!
//! Serde representations match the wire/config vocabulary of the broker
//! venue and the fee tables (lowercase identifiers, Spanish role names for
//! caución operations).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Operation identity
// ---------------------------------------------------------------------------

/// Buy or sell side of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Instrument category of a normalized operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperationCategory {
    #[default]
    Equity,
    Bond,
    Cedear,
    Letra,
    Option,
    /// Collateralized lending (repo). The only category the fee engine
    /// computes settlement breakdowns for.
    Caucion,
    Other,
}

/// Call/put flag for option operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

/// Where a normalized operation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Csv,
    Broker,
}

// ---------------------------------------------------------------------------
// Repo (caución) vocabulary
// ---------------------------------------------------------------------------

/// Role of the account in a caución: lender places funds, borrower takes
/// them against collateral. Only the borrower pays guarantee expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoRole {
    /// Lender side (places funds).
    Colocadora,
    /// Borrower side (takes funds against collateral).
    Tomadora,
}

impl std::fmt::Display for RepoRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Colocadora => write!(f, "colocadora"),
            Self::Tomadora => write!(f, "tomadora"),
        }
    }
}

/// Lifecycle status of a fee breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakdownStatus {
    /// Staged but not yet computed.
    Pending,
    /// Fully computed.
    Ok,
    /// Blocked on bad data or incomplete configuration.
    Error,
}

// ---------------------------------------------------------------------------
// Sync lifecycle
// ---------------------------------------------------------------------------

/// Terminal and non-terminal states of a sync session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    Idle,
    InProgress,
    Success,
    Failed,
    Canceled,
}

impl SyncStatus {
    /// Whether this state ends the session.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Canceled)
    }
}

/// Which entry point started the sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Full fetch of the requested date range.
    Daily,
    /// Incremental fetch of operations newer than the last successful sync.
    Refresh,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}
