//! Repo (caución) fee and settlement computation.
//!
//! One [`FeeBreakdown`] per repo operation. Bad data and incomplete
//! configuration produce *blocked, zero-cost* breakdowns rather than
//! errors, so a whole batch renders with per-row warnings instead of
//! aborting. Reconciliation mismatches are soft flags and never stop the
//! computation.
//!
//! Formula shapes differ on purpose: the arancel is an annualized rate
//! (divided by 365), while derechos de mercado and gastos de garantía are
//! literal daily rates multiplied by the tenor directly.

use opx_core::config::RepoFeeConfig;
use opx_core::{
    BreakdownStatus, BreakdownWarning, FeeBreakdown, Reconciliation, RepoOperation, RepoRole,
    Rounding, WarningCode,
};
use tracing::warn;

use crate::tenor::parse_tenor_days;

const DAYS_PER_YEAR: f64 = 365.0;

/// Whether a CFI code identifies a collateralized-lending instrument.
pub fn is_repo_instrument(cfi_code: &str) -> bool {
    let code = cfi_code.trim_start().as_bytes();
    matches!(code.get(..2), Some(prefix)
        if prefix.eq_ignore_ascii_case(b"RP") || prefix.eq_ignore_ascii_case(b"FR"))
}

/// Resolve the tenor: the explicit field wins; the display name is the
/// fallback. An explicit non-positive value is kept as-is so it blocks
/// downstream instead of silently re-parsing.
fn resolve_tenor_days(op: &RepoOperation) -> i64 {
    op.instrument
        .tenor_days
        .unwrap_or_else(|| parse_tenor_days(&op.instrument.display_name))
}

/// Net settlement from the venue base amount and the expense total.
///
/// The borrower pays the expenses on top; the lender receives net of them.
pub(crate) fn settle(role: RepoRole, base_amount: f64, total_expenses: f64) -> f64 {
    match role {
        RepoRole::Tomadora => base_amount + total_expenses,
        RepoRole::Colocadora => base_amount - total_expenses,
    }
}

/// Compute the full fee breakdown for a repo operation.
///
/// Returns `None` when the instrument is not a repo at all (CFI prefix
/// mismatch) — that is "not applicable", not an error.
pub fn compute_breakdown(op: &RepoOperation, config: &RepoFeeConfig) -> Option<FeeBreakdown> {
    if !is_repo_instrument(&op.instrument.cfi_code) {
        return None;
    }

    let rounding = config.rounding();
    let tolerance = config.effective_tolerance();

    let tenor_days = resolve_tenor_days(op);
    if tenor_days <= 0 {
        warn!(
            "repo {}: unresolvable tenor from {:?}",
            op.id, op.instrument.display_name,
        );
        return Some(blocked_tenor(op, rounding, tolerance));
    }

    let rates = match config.resolve(&op.currency, op.role) {
        Ok(rates) => rates,
        Err(missing) => {
            warn!(
                "repo {}: incomplete fee config for {}/{}: {}",
                op.id,
                op.currency,
                op.role,
                missing.join(", "),
            );
            return Some(blocked_config(op, tenor_days, missing, rounding, tolerance));
        }
    };

    let tenor = tenor_days as f64;
    let accrued_interest = if op.principal_amount > 0.0 && op.price_tna > 0.0 {
        op.principal_amount * (op.price_tna / 100.0) * (tenor / DAYS_PER_YEAR)
    } else {
        0.0
    };

    let expected = op.principal_amount + accrued_interest;
    let reconciliation = Reconciliation::check(expected, op.base_amount, tolerance);
    let mut warnings = Vec::new();
    if !reconciliation.reconciles {
        warn!(
            "repo {}: base amount {} differs from principal+interest {} by {:+.4}",
            op.id, op.base_amount, expected, reconciliation.diff,
        );
        let mut warning = BreakdownWarning::new(
            WarningCode::RepoBaseAmountMismatch,
            format!(
                "base amount {:.2} does not match principal + accrued interest {:.2}",
                op.base_amount, expected,
            ),
        );
        warning.diff = Some(reconciliation.diff);
        warnings.push(warning);
    }

    let base = op.base_amount;
    let arancel_amount = base * (rates.arancel_pct / 100.0) * (tenor / DAYS_PER_YEAR);
    // Daily rates: percent per day × days, no annualization.
    let derechos_mercado_amount = base * (rates.derechos_daily_pct / 100.0) * tenor;
    let gastos_garantia_amount = match op.role {
        RepoRole::Tomadora => base * (rates.gastos_daily_pct / 100.0) * tenor,
        RepoRole::Colocadora => 0.0,
    };
    // VAT applies to the expense components only, never to principal or
    // interest.
    let iva_amount =
        (arancel_amount + derechos_mercado_amount + gastos_garantia_amount) * rates.iva_rate;
    let total_expenses =
        arancel_amount + derechos_mercado_amount + gastos_garantia_amount + iva_amount;

    Some(FeeBreakdown {
        tenor_days: Some(tenor_days),
        role: op.role,
        principal_amount: op.principal_amount,
        base_amount: base,
        accrued_interest,
        arancel_amount,
        derechos_mercado_amount,
        gastos_garantia_amount,
        iva_amount,
        total_expenses,
        net_settlement: settle(op.role, base, total_expenses),
        reconciliation,
        status: BreakdownStatus::Ok,
        blocked: false,
        warnings,
        source: "repo",
        rounding,
    })
}

/// Blocked breakdown: tenor missing or non-positive. Money fields zeroed,
/// base amount passed through.
fn blocked_tenor(op: &RepoOperation, rounding: Rounding, tolerance: f64) -> FeeBreakdown {
    FeeBreakdown {
        tenor_days: None,
        role: op.role,
        principal_amount: 0.0,
        base_amount: op.base_amount,
        accrued_interest: 0.0,
        arancel_amount: 0.0,
        derechos_mercado_amount: 0.0,
        gastos_garantia_amount: 0.0,
        iva_amount: 0.0,
        total_expenses: 0.0,
        net_settlement: 0.0,
        reconciliation: Reconciliation::check(0.0, 0.0, tolerance),
        status: BreakdownStatus::Error,
        blocked: true,
        warnings: vec![BreakdownWarning::new(
            WarningCode::RepoTenorInvalid,
            format!(
                "tenor could not be resolved from {:?}; expected an explicit tenor or an <N>D token",
                op.instrument.display_name,
            ),
        )],
        source: "repo-tenor-invalid",
        rounding,
    }
}

/// Blocked breakdown: a required rate for `(currency, role)` is missing.
/// Expenses zeroed, settlement collapses to the base amount.
fn blocked_config(
    op: &RepoOperation,
    tenor_days: i64,
    missing: Vec<String>,
    rounding: Rounding,
    tolerance: f64,
) -> FeeBreakdown {
    let mut warning = BreakdownWarning::new(
        WarningCode::RepoConfigIncomplete,
        format!(
            "fee configuration for {}/{} is incomplete: {}",
            op.currency,
            op.role,
            missing.join(", "),
        ),
    );
    warning.missing_rates = missing;

    FeeBreakdown {
        tenor_days: Some(tenor_days),
        role: op.role,
        principal_amount: op.principal_amount,
        base_amount: op.base_amount,
        accrued_interest: 0.0,
        arancel_amount: 0.0,
        derechos_mercado_amount: 0.0,
        gastos_garantia_amount: 0.0,
        iva_amount: 0.0,
        total_expenses: 0.0,
        net_settlement: op.base_amount,
        reconciliation: Reconciliation::check(0.0, 0.0, tolerance),
        status: BreakdownStatus::Error,
        blocked: true,
        warnings: vec![warning],
        source: "repo-config-error",
        rounding,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use opx_core::{RepoInstrument, SourceKind};

    use super::*;

    fn rates(v: f64) -> HashMap<String, f64> {
        HashMap::from([("ARS".to_string(), v)])
    }

    fn config() -> RepoFeeConfig {
        RepoFeeConfig {
            arancel_caucion_colocadora: rates(1.5),
            arancel_caucion_tomadora: rates(4.5),
            derechos_de_mercado_daily_rate: rates(0.0045),
            gastos_garantia_daily_rate: rates(0.0045),
            iva_repo_rate: 0.21,
            reconcile_tolerance: None,
            display_decimals: None,
        }
    }

    fn repo_op(role: RepoRole, principal: f64, base: f64, tna: f64, display: &str) -> RepoOperation {
        RepoOperation {
            id: "rep-1".into(),
            symbol: "CAUC".into(),
            principal_amount: principal,
            base_amount: base,
            price_tna: tna,
            role,
            currency: "ARS".into(),
            instrument: RepoInstrument {
                cfi_code: "RPXXXX".into(),
                display_name: display.into(),
                tenor_days: None,
            },
            source: SourceKind::Broker,
        }
    }

    #[test]
    fn non_repo_cfi_is_not_applicable() {
        let mut op = repo_op(RepoRole::Colocadora, 1000.0, 1000.1, 0.8, "ARS CAUCION 1D");
        op.instrument.cfi_code = "ESVUFR".into();
        assert!(compute_breakdown(&op, &config()).is_none());

        op.instrument.cfi_code = "FRXXXX".into();
        assert!(compute_breakdown(&op, &config()).is_some());
    }

    #[test]
    fn accrued_interest_reconciles_within_tolerance() {
        let op = repo_op(RepoRole::Colocadora, 81700.0, 81701.79, 0.8, "ARS CAUCION 1D");
        let b = compute_breakdown(&op, &config()).unwrap();
        assert_eq!(b.status, BreakdownStatus::Ok);
        assert!((b.accrued_interest - 1.79).abs() < 0.01);
        assert!(b.reconciliation.reconciles);
        assert!(b.warnings.is_empty());
    }

    #[test]
    fn base_mismatch_warns_but_does_not_block() {
        let op = repo_op(RepoRole::Colocadora, 81700.0, 81950.0, 0.8, "ARS CAUCION 1D");
        let b = compute_breakdown(&op, &config()).unwrap();
        assert_eq!(b.status, BreakdownStatus::Ok);
        assert!(!b.blocked);
        assert!(!b.reconciliation.reconciles);
        assert!(b.has_warning(WarningCode::RepoBaseAmountMismatch));
        let warning = &b.warnings[0];
        assert!(warning.diff.unwrap() > 0.0);
        // Expenses were still computed.
        assert!(b.total_expenses > 0.0);
    }

    #[test]
    fn guarantee_expense_is_borrower_only() {
        let lender = repo_op(RepoRole::Colocadora, 81700.0, 81701.79, 0.8, "ARS CAUCION 1D");
        let borrower = repo_op(RepoRole::Tomadora, 81700.0, 81701.79, 0.8, "ARS CAUCION 1D");
        let bl = compute_breakdown(&lender, &config()).unwrap();
        let bb = compute_breakdown(&borrower, &config()).unwrap();
        assert_eq!(bl.gastos_garantia_amount, 0.0);
        assert!(bb.gastos_garantia_amount > 0.0);
    }

    #[test]
    fn net_settlement_sign_depends_on_role() {
        let lender = repo_op(RepoRole::Colocadora, 81700.0, 81701.79, 0.8, "ARS CAUCION 1D");
        let borrower = repo_op(RepoRole::Tomadora, 81700.0, 81701.79, 0.8, "ARS CAUCION 1D");
        let bl = compute_breakdown(&lender, &config()).unwrap();
        let bb = compute_breakdown(&borrower, &config()).unwrap();
        assert!(bl.total_expenses > 0.0);
        assert!(bl.net_settlement < bl.base_amount);
        assert!(bb.net_settlement > bb.base_amount);
    }

    #[test]
    fn component_formulas_and_total() {
        let op = repo_op(RepoRole::Tomadora, 100_000.0, 100_019.18, 7.0, "ARS CAUCION 7D");
        let cfg = config();
        let b = compute_breakdown(&op, &cfg).unwrap();

        let base = 100_019.18f64;
        let arancel = base * (4.5 / 100.0) * (7.0 / 365.0);
        let derechos = base * (0.0045 / 100.0) * 7.0;
        let gastos = base * (0.0045 / 100.0) * 7.0;
        let iva = (arancel + derechos + gastos) * 0.21;

        assert!((b.arancel_amount - arancel).abs() < 1e-9);
        assert!((b.derechos_mercado_amount - derechos).abs() < 1e-9);
        assert!((b.gastos_garantia_amount - gastos).abs() < 1e-9);
        assert!((b.iva_amount - iva).abs() < 1e-9);
        assert!((b.total_expenses - (arancel + derechos + gastos + iva)).abs() < 1e-9);
        assert!((b.net_settlement - (base + b.total_expenses)).abs() < 1e-9);
    }

    #[test]
    fn missing_rate_blocks_with_config_error() {
        let mut cfg = config();
        cfg.derechos_de_mercado_daily_rate.clear();
        let op = repo_op(RepoRole::Colocadora, 81700.0, 81701.79, 0.8, "ARS CAUCION 1D");
        let b = compute_breakdown(&op, &cfg).unwrap();

        assert_eq!(b.status, BreakdownStatus::Error);
        assert_eq!(b.source, "repo-config-error");
        assert!(b.blocked);
        assert_eq!(b.total_expenses, 0.0);
        assert_eq!(b.net_settlement, b.base_amount);
        assert!(b.has_warning(WarningCode::RepoConfigIncomplete));
        assert_eq!(
            b.warnings[0].missing_rates,
            vec!["derechos_de_mercado_daily_rate (ARS)"],
        );
    }

    #[test]
    fn unresolvable_tenor_blocks_with_zeroed_money() {
        let op = repo_op(RepoRole::Tomadora, 81700.0, 81701.79, 0.8, "no tenor here");
        let b = compute_breakdown(&op, &config()).unwrap();

        assert_eq!(b.status, BreakdownStatus::Error);
        assert_eq!(b.source, "repo-tenor-invalid");
        assert!(b.blocked);
        assert_eq!(b.tenor_days, None);
        assert_eq!(b.base_amount, 81701.79);
        assert_eq!(b.principal_amount, 0.0);
        assert_eq!(b.total_expenses, 0.0);
        assert_eq!(b.net_settlement, 0.0);
        assert!(b.has_warning(WarningCode::RepoTenorInvalid));
        assert_eq!(b.warnings.len(), 1);
    }

    #[test]
    fn explicit_non_positive_tenor_does_not_fall_back_to_parsing() {
        let mut op = repo_op(RepoRole::Tomadora, 81700.0, 81701.79, 0.8, "ARS CAUCION 7D");
        op.instrument.tenor_days = Some(0);
        let b = compute_breakdown(&op, &config()).unwrap();
        assert_eq!(b.source, "repo-tenor-invalid");
    }

    #[test]
    fn zero_rate_factors_zero_the_interest() {
        let op = repo_op(RepoRole::Colocadora, 81700.0, 81700.0, 0.0, "ARS CAUCION 1D");
        let b = compute_breakdown(&op, &config()).unwrap();
        assert_eq!(b.accrued_interest, 0.0);
        assert!(b.reconciliation.reconciles);
    }
}
