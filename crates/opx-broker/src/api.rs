//! Wire types for the venue's REST API.
//!
//! The venue serializes field names in camelCase; rows carry the generic
//! execution fields plus the repo-specific figures when the instrument is
//! a caución.

use serde::Deserialize;

/// Parameters for one page of the operations listing.
#[derive(Debug, Clone, Default)]
pub struct ListOperationsRequest {
    /// Bearer token for the session.
    pub token: String,
    /// Trade date filter (`YYYY-MM-DD`), venue-local.
    pub date: Option<String>,
    /// Cursor from the prior page's `next_page_token`.
    pub page_token: Option<String>,
    /// Venue account to scope the listing to.
    pub account_id: Option<String>,
    /// Rows per page.
    pub page_size: u32,
}

/// One page of the operations listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsPage {
    pub operations: Vec<BrokerOperationRow>,
    /// Cursor for the next page; absent on the last page.
    pub next_page_token: Option<String>,
    /// Venue's estimate of the total row count, when provided.
    pub estimated_total: Option<u64>,
}

/// A raw execution row as the venue reports it.
///
/// Normalization (in the sync crate) maps this onto the canonical
/// [`Operation`](opx_core::Operation) / [`RepoOperation`](opx_core::RepoOperation)
/// shapes and drops rows that fail the basic guards.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerOperationRow {
    /// Venue execution id.
    pub id: String,
    /// Order the fill belongs to.
    pub order_id: String,
    pub symbol: String,
    /// `"BUY"` / `"SELL"`.
    pub side: String,
    pub quantity: f64,
    pub price: f64,
    /// Execution timestamp (ms since epoch).
    pub trade_timestamp: u64,
    /// Venue category label (e.g. `"acciones"`, `"cauciones"`).
    pub category: Option<String>,
    /// `"call"` / `"put"`, options only.
    pub option_type: Option<String>,
    /// Expiration label, options only.
    pub expiration: Option<String>,

    // --- repo (caución) extras ---
    /// ISO 10962 code (`RP…`/`FR…` for repo instruments).
    pub cfi_code: Option<String>,
    /// Venue display name (tenor fallback, e.g. `"USD CAUCION 7D"`).
    pub display_name: Option<String>,
    pub principal_amount: Option<f64>,
    pub base_amount: Option<f64>,
    /// Annualized nominal rate, percent.
    pub price_tna: Option<f64>,
    /// `"colocadora"` / `"tomadora"`.
    pub role: Option<String>,
    pub currency: Option<String>,
    pub tenor_days: Option<i64>,
}

/// Venue auth endpoint response (login and refresh share the shape).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    /// Session expiry (ms since epoch).
    pub expiry: u64,
    pub account_id: Option<String>,
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_page_parses_camel_case() {
        let json = r#"{
            "operations": [{
                "id": "ex-1",
                "orderId": "ord-1",
                "symbol": "GGAL",
                "side": "BUY",
                "quantity": 100,
                "price": 10.5,
                "tradeTimestamp": 1700000000000,
                "category": "acciones"
            }],
            "nextPageToken": "p2",
            "estimatedTotal": 12
        }"#;
        let page: OperationsPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.operations.len(), 1);
        assert_eq!(page.operations[0].order_id, "ord-1");
        assert_eq!(page.next_page_token.as_deref(), Some("p2"));
        assert_eq!(page.estimated_total, Some(12));
    }

    #[test]
    fn repo_row_carries_caucion_fields() {
        let json = r#"{
            "id": "ex-2",
            "orderId": "ord-2",
            "symbol": "CAUC7D",
            "side": "SELL",
            "quantity": 1,
            "price": 0,
            "tradeTimestamp": 1700000000000,
            "category": "cauciones",
            "cfiCode": "RPXXXX",
            "displayName": "USD CAUCION 7D",
            "principalAmount": 81700,
            "baseAmount": 81701.79,
            "priceTna": 0.8,
            "role": "colocadora",
            "currency": "USD"
        }"#;
        let row: BrokerOperationRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.cfi_code.as_deref(), Some("RPXXXX"));
        assert_eq!(row.principal_amount, Some(81700.0));
        assert_eq!(row.tenor_days, None);
    }
}
