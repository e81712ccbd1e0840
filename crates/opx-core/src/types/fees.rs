//! Fee breakdown records for repo (caución) settlement.
//!
//! A [`FeeBreakdown`] is produced per repo operation by the fee engine and
//! recomputed (never mutated) when rows are aggregated. Presentation layers
//! must treat it as read-only and round for display using the attached
//! [`Rounding`] descriptor — internal figures stay at full float precision.

use serde::{Deserialize, Serialize};

use super::enums::{BreakdownStatus, RepoRole};

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Machine-readable warning codes attached to a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    /// Tenor could not be resolved or is non-positive. Blocking.
    RepoTenorInvalid,
    /// A required fee rate for the `(currency, role)` pair is missing or
    /// zero. Blocking.
    RepoConfigIncomplete,
    /// Base amount does not reconcile with principal + accrued interest.
    /// Non-blocking data-quality flag.
    RepoBaseAmountMismatch,
    /// Aggregated rows carry different tenors. Non-blocking.
    RepoTenorMismatch,
}

/// A warning row rendered inline next to the operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownWarning {
    pub code: WarningCode,
    /// Human-readable description.
    pub message: String,
    /// Names of the missing rates, for [`WarningCode::RepoConfigIncomplete`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_rates: Vec<String>,
    /// Reconciliation difference, for
    /// [`WarningCode::RepoBaseAmountMismatch`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<f64>,
}

impl BreakdownWarning {
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            missing_rates: Vec::new(),
            diff: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rounding descriptor
// ---------------------------------------------------------------------------

/// How a monetary value should be rounded for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundingMode {
    /// Round half away from zero (the venue's statement convention).
    HalfUp,
    /// Truncate toward zero.
    Down,
}

/// Display rounding descriptor carried by every breakdown.
///
/// Computation never applies this; only presentation layers do.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rounding {
    /// Number of display decimals.
    pub decimals: u8,
    pub mode: RoundingMode,
}

impl Default for Rounding {
    fn default() -> Self {
        Self {
            decimals: 2,
            mode: RoundingMode::HalfUp,
        }
    }
}

impl Rounding {
    /// Round `value` for display according to this descriptor.
    pub fn apply(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.decimals as i32);
        match self.mode {
            RoundingMode::HalfUp => (value * factor).round() / factor,
            RoundingMode::Down => (value * factor).trunc() / factor,
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Result of checking the venue base amount against principal + interest.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Reconciliation {
    pub reconciles: bool,
    /// `actual − expected`.
    pub diff: f64,
    /// Principal + accrued interest.
    pub expected: f64,
    /// Venue base amount.
    pub actual: f64,
    /// Tolerance band the check used.
    pub tolerance: f64,
}

impl Reconciliation {
    /// Compare `actual` against `expected` within `tolerance`.
    pub fn check(expected: f64, actual: f64, tolerance: f64) -> Self {
        let diff = actual - expected;
        Self {
            reconciles: diff.abs() <= tolerance,
            diff,
            expected,
            actual,
            tolerance,
        }
    }
}

// ---------------------------------------------------------------------------
// FeeBreakdown
// ---------------------------------------------------------------------------

/// Full fee and settlement breakdown for one repo operation (or an
/// aggregate of several sharing the same instrument and settlement key).
///
/// Serialize-only: breakdowns are derived values, recomputed rather than
/// loaded.
#[derive(Debug, Clone, Serialize)]
pub struct FeeBreakdown {
    /// Loan tenor in days. `None` on an aggregate whose members disagree.
    pub tenor_days: Option<i64>,
    /// Lender or borrower side. Determines the settlement sign and the
    /// guarantee-expense applicability.
    pub role: RepoRole,
    pub principal_amount: f64,
    pub base_amount: f64,
    pub accrued_interest: f64,
    /// Exchange lending-facilitation fee (annualized rate).
    pub arancel_amount: f64,
    /// Market-rights fee (literal daily rate).
    pub derechos_mercado_amount: f64,
    /// Guarantee/collateral-maintenance expense (borrower only).
    pub gastos_garantia_amount: f64,
    /// VAT over the three expense components.
    pub iva_amount: f64,
    /// Sum of arancel + derechos + gastos + IVA.
    pub total_expenses: f64,
    /// `base_amount + total_expenses` for tomadora,
    /// `base_amount − total_expenses` for colocadora.
    pub net_settlement: f64,
    pub reconciliation: Reconciliation,
    pub status: BreakdownStatus,
    /// True when the computation was blocked (bad tenor, missing rates).
    pub blocked: bool,
    pub warnings: Vec<BreakdownWarning>,
    /// Which path produced this breakdown: `"repo"`,
    /// `"repo-tenor-invalid"`, `"repo-config-error"`, `"repo-aggregate"`,
    /// `"repo-pending"`.
    pub source: &'static str,
    /// Display rounding descriptor.
    pub rounding: Rounding,
}

impl FeeBreakdown {
    /// A staged breakdown awaiting computation. Money fields zeroed except
    /// the pass-through base amount.
    pub fn pending(role: RepoRole, base_amount: f64) -> Self {
        Self {
            tenor_days: None,
            role,
            principal_amount: 0.0,
            base_amount,
            accrued_interest: 0.0,
            arancel_amount: 0.0,
            derechos_mercado_amount: 0.0,
            gastos_garantia_amount: 0.0,
            iva_amount: 0.0,
            total_expenses: 0.0,
            net_settlement: base_amount,
            reconciliation: Reconciliation::check(0.0, 0.0, 0.0),
            status: BreakdownStatus::Pending,
            blocked: false,
            warnings: Vec::new(),
            source: "repo-pending",
            rounding: Rounding::default(),
        }
    }

    /// Whether this breakdown carries a warning with the given code.
    pub fn has_warning(&self, code: WarningCode) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }
}
