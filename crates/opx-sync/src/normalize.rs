//! Venue row → canonical operation normalization.
//!
//! Rows that fail the basic guards (unknown side, non-positive quantity,
//! negative price) are dropped with a warning rather than failing the
//! page — one malformed row must not abort a sync.

use opx_broker::api::BrokerOperationRow;
use opx_core::{
    Operation, OperationCategory, OptionType, RepoInstrument, RepoOperation, RepoRole, Side,
    SourceKind,
};
use tracing::warn;

fn parse_side(raw: &str) -> Option<Side> {
    match raw.to_ascii_uppercase().as_str() {
        "BUY" => Some(Side::Buy),
        "SELL" => Some(Side::Sell),
        _ => None,
    }
}

fn parse_category(raw: Option<&str>) -> OperationCategory {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("acciones") => OperationCategory::Equity,
        Some("bonos") => OperationCategory::Bond,
        Some("cedears") => OperationCategory::Cedear,
        Some("letras") => OperationCategory::Letra,
        Some("opciones") => OperationCategory::Option,
        Some("cauciones") => OperationCategory::Caucion,
        _ => OperationCategory::Other,
    }
}

fn parse_option_type(raw: Option<&str>) -> Option<OptionType> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("call") => Some(OptionType::Call),
        Some("put") => Some(OptionType::Put),
        _ => None,
    }
}

fn parse_role(raw: &str) -> Option<RepoRole> {
    match raw.to_ascii_lowercase().as_str() {
        "colocadora" => Some(RepoRole::Colocadora),
        "tomadora" => Some(RepoRole::Tomadora),
        _ => None,
    }
}

/// Normalize a venue row into a canonical [`Operation`].
///
/// Returns `None` (and logs) when the row fails a guard.
pub fn normalize_row(row: &BrokerOperationRow) -> Option<Operation> {
    let Some(side) = parse_side(&row.side) else {
        warn!("dropping row {}: unknown side {:?}", row.id, row.side);
        return None;
    };
    if row.quantity <= 0.0 {
        warn!("dropping row {}: non-positive quantity {}", row.id, row.quantity);
        return None;
    }
    if row.price < 0.0 {
        warn!("dropping row {}: negative price {}", row.id, row.price);
        return None;
    }

    Some(Operation {
        id: row.id.clone(),
        order_id: row.order_id.clone(),
        symbol: row.symbol.clone(),
        side,
        quantity: row.quantity,
        price: row.price,
        trade_timestamp: row.trade_timestamp,
        category: parse_category(row.category.as_deref()),
        option_type: parse_option_type(row.option_type.as_deref()),
        expiration: row.expiration.clone(),
        source: SourceKind::Broker,
    })
}

/// Normalize a venue row into a [`RepoOperation`], when it carries the
/// caución figures.
///
/// Rows without the repo extras (instrument code, principal, base, rate,
/// role, currency) return `None` — they are ordinary operations.
pub fn normalize_repo_row(row: &BrokerOperationRow) -> Option<RepoOperation> {
    let cfi_code = row.cfi_code.clone()?;
    let principal_amount = row.principal_amount?;
    let base_amount = row.base_amount?;
    let price_tna = row.price_tna?;
    let role = parse_role(row.role.as_deref()?)?;
    let currency = row.currency.clone()?;

    Some(RepoOperation {
        id: row.id.clone(),
        symbol: row.symbol.clone(),
        principal_amount,
        base_amount,
        price_tna,
        role,
        currency,
        instrument: RepoInstrument {
            cfi_code,
            display_name: row.display_name.clone().unwrap_or_else(|| row.symbol.clone()),
            tenor_days: row.tenor_days,
        },
        source: SourceKind::Broker,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> BrokerOperationRow {
        serde_json::from_str(
            r#"{
                "id": "ex-1",
                "orderId": "ord-1",
                "symbol": "GGAL",
                "side": "buy",
                "quantity": 100,
                "price": 10.5,
                "tradeTimestamp": 1700000000000,
                "category": "ACCIONES"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn normalizes_side_and_category_case_insensitively() {
        let op = normalize_row(&row()).unwrap();
        assert_eq!(op.side, Side::Buy);
        assert_eq!(op.category, OperationCategory::Equity);
        assert_eq!(op.source, SourceKind::Broker);
    }

    #[test]
    fn drops_bad_rows() {
        let mut bad_side = row();
        bad_side.side = "HOLD".into();
        assert!(normalize_row(&bad_side).is_none());

        let mut zero_qty = row();
        zero_qty.quantity = 0.0;
        assert!(normalize_row(&zero_qty).is_none());

        let mut negative_price = row();
        negative_price.price = -1.0;
        assert!(normalize_row(&negative_price).is_none());
    }

    #[test]
    fn repo_row_requires_the_caucion_extras() {
        let plain = row();
        assert!(normalize_repo_row(&plain).is_none());

        let mut repo = row();
        repo.cfi_code = Some("RPXXXX".into());
        repo.principal_amount = Some(81700.0);
        repo.base_amount = Some(81701.79);
        repo.price_tna = Some(0.8);
        repo.role = Some("TOMADORA".into());
        repo.currency = Some("ARS".into());
        let op = normalize_repo_row(&repo).unwrap();
        assert_eq!(op.role, RepoRole::Tomadora);
        // Display name falls back to the symbol.
        assert_eq!(op.instrument.display_name, "GGAL");
    }
}
