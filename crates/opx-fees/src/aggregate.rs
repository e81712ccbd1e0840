//! Aggregation of repo breakdowns grouped by instrument and settlement.
//!
//! A pure reduction: the seven numeric components are folded into
//! immutable sums, then a single finalization step recomputes the derived
//! fields (total expenses, net settlement, reconciliation) from those
//! sums at full precision. Display rounding never enters the aggregation.

use opx_core::{
    BreakdownStatus, BreakdownWarning, FeeBreakdown, Reconciliation, WarningCode,
};

use crate::repo::settle;

/// Immutable component sums produced by the fold.
#[derive(Debug, Clone, Copy, Default)]
struct ComponentSums {
    principal: f64,
    base: f64,
    interest: f64,
    arancel: f64,
    derechos: f64,
    gastos: f64,
    iva: f64,
}

impl ComponentSums {
    fn add(self, b: &FeeBreakdown) -> Self {
        Self {
            principal: self.principal + b.principal_amount,
            base: self.base + b.base_amount,
            interest: self.interest + b.accrued_interest,
            arancel: self.arancel + b.arancel_amount,
            derechos: self.derechos + b.derechos_mercado_amount,
            gastos: self.gastos + b.gastos_garantia_amount,
            iva: self.iva + b.iva_amount,
        }
    }
}

/// Combine breakdowns that share a grouping key into one settlement total.
///
/// Returns `None` on an empty slice. Status resolution: any `Error`
/// member forces `Error`, else any `Pending` forces `Pending`, else `Ok`.
/// Grouped rows share one instrument and settlement side, so the role is
/// taken from the first member.
pub fn aggregate_breakdowns(items: &[FeeBreakdown]) -> Option<FeeBreakdown> {
    let first = items.first()?;
    let role = first.role;
    let rounding = first.rounding;
    let tolerance = first.reconciliation.tolerance;

    let sums = items.iter().fold(ComponentSums::default(), ComponentSums::add);

    let tenor_days = first.tenor_days;
    let tenor_mismatch = items.iter().any(|b| b.tenor_days != tenor_days);

    let status = if items.iter().any(|b| b.status == BreakdownStatus::Error) {
        BreakdownStatus::Error
    } else if items.iter().any(|b| b.status == BreakdownStatus::Pending) {
        BreakdownStatus::Pending
    } else {
        BreakdownStatus::Ok
    };
    let blocked = items.iter().any(|b| b.blocked);

    // Carry member warnings forward (deduplicated), then flag the tenor
    // mismatch itself.
    let mut warnings: Vec<BreakdownWarning> = Vec::new();
    for member in items {
        for w in &member.warnings {
            if !warnings.iter().any(|seen| seen.code == w.code && seen.message == w.message) {
                warnings.push(w.clone());
            }
        }
    }
    if tenor_mismatch {
        warnings.push(BreakdownWarning::new(
            WarningCode::RepoTenorMismatch,
            "aggregated rows carry different tenors; the combined tenor is undefined",
        ));
    }

    let total_expenses = sums.arancel + sums.derechos + sums.gastos + sums.iva;

    Some(FeeBreakdown {
        tenor_days: if tenor_mismatch { None } else { tenor_days },
        role,
        principal_amount: sums.principal,
        base_amount: sums.base,
        accrued_interest: sums.interest,
        arancel_amount: sums.arancel,
        derechos_mercado_amount: sums.derechos,
        gastos_garantia_amount: sums.gastos,
        iva_amount: sums.iva,
        total_expenses,
        net_settlement: settle(role, sums.base, total_expenses),
        reconciliation: Reconciliation::check(
            sums.principal + sums.interest,
            sums.base,
            tolerance,
        ),
        status,
        blocked,
        warnings,
        source: "repo-aggregate",
        rounding,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use opx_core::config::RepoFeeConfig;
    use opx_core::{RepoInstrument, RepoOperation, RepoRole, SourceKind};

    use crate::repo::compute_breakdown;

    use super::*;

    fn config() -> RepoFeeConfig {
        let rates = |v: f64| HashMap::from([("ARS".to_string(), v)]);
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

    fn repo_op(id: &str, role: RepoRole, principal: f64, tna: f64, display: &str) -> RepoOperation {
        let tenor = crate::tenor::parse_tenor_days(display).max(1) as f64;
        let base = principal + principal * (tna / 100.0) * (tenor / 365.0);
        RepoOperation {
            id: id.into(),
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
    fn empty_group_aggregates_to_none() {
        assert!(aggregate_breakdowns(&[]).is_none());
    }

    #[test]
    fn aggregate_matches_single_combined_breakdown() {
        let cfg = config();
        let a = compute_breakdown(&repo_op("a", RepoRole::Tomadora, 50_000.0, 7.0, "ARS CAUCION 7D"), &cfg).unwrap();
        let b = compute_breakdown(&repo_op("b", RepoRole::Tomadora, 30_000.0, 7.0, "ARS CAUCION 7D"), &cfg).unwrap();
        let agg = aggregate_breakdowns(&[a.clone(), b.clone()]).unwrap();

        // A single operation over the combined amounts.
        let mut combined = repo_op("c", RepoRole::Tomadora, 80_000.0, 7.0, "ARS CAUCION 7D");
        combined.base_amount = a.base_amount + b.base_amount;
        let single = compute_breakdown(&combined, &cfg).unwrap();

        assert!((agg.accrued_interest - single.accrued_interest).abs() < 0.01);
        assert!((agg.arancel_amount - single.arancel_amount).abs() < 0.01);
        assert!((agg.derechos_mercado_amount - single.derechos_mercado_amount).abs() < 0.01);
        assert!((agg.gastos_garantia_amount - single.gastos_garantia_amount).abs() < 0.01);
        assert!((agg.iva_amount - single.iva_amount).abs() < 0.01);
        assert!((agg.total_expenses - single.total_expenses).abs() < 0.01);
        assert!((agg.net_settlement - single.net_settlement).abs() < 0.01);
        assert_eq!(agg.tenor_days, Some(7));
        assert_eq!(agg.status, BreakdownStatus::Ok);
        assert!(agg.reconciliation.reconciles);
        assert_eq!(agg.source, "repo-aggregate");
    }

    #[test]
    fn tenor_mismatch_clears_tenor_and_warns_without_blocking() {
        let cfg = config();
        let a = compute_breakdown(&repo_op("a", RepoRole::Colocadora, 50_000.0, 7.0, "ARS CAUCION 7D"), &cfg).unwrap();
        let b = compute_breakdown(&repo_op("b", RepoRole::Colocadora, 30_000.0, 7.0, "ARS CAUCION 1D"), &cfg).unwrap();
        let agg = aggregate_breakdowns(&[a, b]).unwrap();

        assert_eq!(agg.tenor_days, None);
        assert!(agg.has_warning(WarningCode::RepoTenorMismatch));
        assert_eq!(agg.status, BreakdownStatus::Ok);
        assert!(!agg.blocked);
    }

    #[test]
    fn error_member_forces_error_status() {
        let cfg = config();
        let ok = compute_breakdown(&repo_op("a", RepoRole::Tomadora, 50_000.0, 7.0, "ARS CAUCION 7D"), &cfg).unwrap();
        let bad = compute_breakdown(&repo_op("b", RepoRole::Tomadora, 30_000.0, 7.0, "no tenor"), &cfg).unwrap();
        let agg = aggregate_breakdowns(&[ok, bad]).unwrap();

        assert_eq!(agg.status, BreakdownStatus::Error);
        assert!(agg.blocked);
        // The member's warning rides along.
        assert!(agg.has_warning(WarningCode::RepoTenorInvalid));
    }

    #[test]
    fn pending_member_forces_pending_status() {
        let cfg = config();
        let ok = compute_breakdown(&repo_op("a", RepoRole::Tomadora, 50_000.0, 7.0, "ARS CAUCION 7D"), &cfg).unwrap();
        let pending = FeeBreakdown::pending(RepoRole::Tomadora, 1000.0);
        let agg = aggregate_breakdowns(&[ok, pending]).unwrap();
        assert_eq!(agg.status, BreakdownStatus::Pending);
    }

    #[test]
    fn lender_aggregate_settles_below_base() {
        let cfg = config();
        let a = compute_breakdown(&repo_op("a", RepoRole::Colocadora, 50_000.0, 7.0, "ARS CAUCION 7D"), &cfg).unwrap();
        let b = compute_breakdown(&repo_op("b", RepoRole::Colocadora, 30_000.0, 7.0, "ARS CAUCION 7D"), &cfg).unwrap();
        let agg = aggregate_breakdowns(&[a, b]).unwrap();
        assert!(agg.total_expenses > 0.0);
        assert!(agg.net_settlement < agg.base_amount);
        assert_eq!(agg.gastos_garantia_amount, 0.0);
    }
}
