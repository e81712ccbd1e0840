//! Canonical operation records produced by the normalization adapters.
//!
//! An [`Operation`] is immutable once created: the fee and aggregation
//! stages derive new values (breakdowns, settlement totals) instead of
//! mutating identity fields.

use serde::{Deserialize, Serialize};

use super::enums::{OperationCategory, OptionType, RepoRole, Side, SourceKind};

// ---------------------------------------------------------------------------
// Operation — post-normalization execution record
// ---------------------------------------------------------------------------

/// A single normalized trade execution (one fill).
///
/// Both the CSV adapter and the broker sync produce this shape; downstream
/// stages never care which.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Unique row identifier (venue execution id or synthesized).
    pub id: String,
    /// Order this fill belongs to. One order may produce several fills.
    pub order_id: String,
    /// Instrument ticker (e.g. `"GGAL"`, `"AL30"`).
    pub symbol: String,
    /// Buy or sell.
    pub side: Side,
    /// Executed quantity. Always positive.
    pub quantity: f64,
    /// Execution price. Non-negative.
    pub price: f64,
    /// Execution timestamp (ms since epoch).
    pub trade_timestamp: u64,
    /// Instrument category.
    pub category: OperationCategory,
    /// Call/put flag, options only.
    pub option_type: Option<OptionType>,
    /// Expiration label, options only (venue format, e.g. `"FEB26"`).
    pub expiration: Option<String>,
    /// Which adapter produced this row.
    pub source: SourceKind,
}

impl Operation {
    /// Notional value of the fill (price × quantity).
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

// ---------------------------------------------------------------------------
// Repo operation — collateralized lending execution
// ---------------------------------------------------------------------------

/// Instrument descriptor for a repo operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInstrument {
    /// ISO 10962 classification code. Repo instruments carry an `RP` or
    /// `FR` prefix; everything else is rejected by the fee engine filter.
    pub cfi_code: String,
    /// Venue display name (e.g. `"USD CAUCION 7D"`). Used as the tenor
    /// fallback when `tenor_days` is absent.
    pub display_name: String,
    /// Loan duration in days, when the venue provides it explicitly.
    pub tenor_days: Option<i64>,
}

/// A normalized caución (repo) execution.
///
/// Extends the operation shape with the lending-specific figures the fee
/// engine consumes. `base_amount` is the venue's settled figure
/// (principal plus accrued interest); reconciliation checks it against the
/// recomputed expectation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoOperation {
    /// Unique row identifier.
    pub id: String,
    /// Instrument ticker / venue symbol.
    pub symbol: String,
    /// Capital placed or taken.
    pub principal_amount: f64,
    /// Venue base amount (principal + accrued interest at maturity).
    pub base_amount: f64,
    /// Annualized nominal rate, in percent (e.g. `0.8` = 0.8 % TNA).
    pub price_tna: f64,
    /// Lender or borrower side.
    pub role: RepoRole,
    /// Settlement currency code (e.g. `"ARS"`, `"USD"`).
    pub currency: String,
    /// Instrument descriptor.
    pub instrument: RepoInstrument,
    /// Which adapter produced this row.
    pub source: SourceKind,
}
