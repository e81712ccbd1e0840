//! Partial-fill consolidation.
//!
//! Venues report one row per execution, so a single order filled in three
//! slices arrives as three operations. For display and fee purposes the
//! rows collapse into one operation per `order id + symbol + side` group
//! with the volume-weighted average price.

use ahash::AHashMap;

use crate::types::Operation;

/// Collapse partial fills into one operation per order/symbol/side group.
///
/// Quantity is summed, price is the VWAP over the group, the timestamp is
/// the latest fill's, and identity fields come from the first fill seen.
/// Groups keep their first-seen order; operations with distinct keys pass
/// through untouched.
pub fn vwap_consolidate(operations: &[Operation]) -> Vec<Operation> {
    // Group index: key → position in `result`.
    let mut index: AHashMap<(String, String, String), usize> = AHashMap::new();
    let mut result: Vec<Operation> = Vec::new();
    // Running Σ price·qty per result slot, for the final VWAP pass.
    let mut notionals: Vec<f64> = Vec::new();

    for op in operations {
        let key = (
            op.order_id.clone(),
            op.symbol.clone(),
            op.side.to_string(),
        );
        match index.get(&key) {
            Some(&slot) => {
                let acc = &mut result[slot];
                acc.quantity += op.quantity;
                acc.trade_timestamp = acc.trade_timestamp.max(op.trade_timestamp);
                notionals[slot] += op.price * op.quantity;
            }
            None => {
                index.insert(key, result.len());
                notionals.push(op.price * op.quantity);
                result.push(op.clone());
            }
        }
    }

    for (slot, acc) in result.iter_mut().enumerate() {
        if acc.quantity > 0.0 {
            acc.price = notionals[slot] / acc.quantity;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use crate::types::{OperationCategory, Side, SourceKind};

    use super::*;

    fn fill(id: &str, order_id: &str, side: Side, qty: f64, price: f64, ts: u64) -> Operation {
        Operation {
            id: id.into(),
            order_id: order_id.into(),
            symbol: "GGAL".into(),
            side,
            quantity: qty,
            price,
            trade_timestamp: ts,
            category: OperationCategory::Equity,
            option_type: None,
            expiration: None,
            source: SourceKind::Broker,
        }
    }

    #[test]
    fn vwap_over_two_fills() {
        let ops = vec![
            fill("1", "o1", Side::Buy, 100.0, 10.0, 1000),
            fill("2", "o1", Side::Buy, 50.0, 13.0, 1005),
        ];
        let merged = vwap_consolidate(&ops);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].quantity, 150.0);
        assert!((merged[0].price - 11.0).abs() < 1e-9);
        assert_eq!(merged[0].trade_timestamp, 1005);
        // Identity comes from the first fill.
        assert_eq!(merged[0].id, "1");
    }

    #[test]
    fn opposite_sides_stay_separate() {
        let ops = vec![
            fill("1", "o1", Side::Buy, 100.0, 10.0, 1000),
            fill("2", "o1", Side::Sell, 100.0, 10.5, 1001),
        ];
        let merged = vwap_consolidate(&ops);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn group_order_is_first_seen() {
        let ops = vec![
            fill("1", "o2", Side::Buy, 10.0, 1.0, 1000),
            fill("2", "o1", Side::Buy, 10.0, 1.0, 1001),
            fill("3", "o2", Side::Buy, 10.0, 1.0, 1002),
        ];
        let merged = vwap_consolidate(&ops);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].order_id, "o2");
        assert_eq!(merged[0].quantity, 20.0);
        assert_eq!(merged[1].order_id, "o1");
    }
}
