//! Operation deduplication and batch merging.
//!
//! Broker pages and repeated sync runs deliver the same fills more than
//! once. The pool in this module filters candidates by a composite
//! identity key so that only the first occurrence of each execution is
//! accepted, and [`merge_batch`] folds an accepted batch into a baseline
//! set while counting new orders vs. new fill rows separately.
//!
//! The key covers order id, symbol, timestamp, price and quantity —
//! robust to the venue re-submitting partial fills of the same order with
//! distinct prices or quantities.

use ahash::AHashSet;

use crate::types::Operation;

/// Hash the composite identity of an operation with xxHash64.
///
/// Prices and quantities are rendered through their shortest-roundtrip
/// `Display` form, so equal values always hash equally.
#[inline]
pub fn operation_key(op: &Operation) -> u64 {
    let raw = format!(
        "{}|{}|{}|{}|{}",
        op.order_id, op.symbol, op.trade_timestamp, op.price, op.quantity,
    );
    xxhash_rust::xxh64::xxh64(raw.as_bytes(), 0)
}

// ---------------------------------------------------------------------------
// OperationDedup — stateful pool for one sync invocation
// ---------------------------------------------------------------------------

/// Dedup pool seeded from an existing operation set.
///
/// Not thread-safe; each sync invocation owns its own instance.
pub struct OperationDedup {
    seen: AHashSet<u64>,
    order_ids: AHashSet<String>,
}

impl OperationDedup {
    pub fn new() -> Self {
        Self {
            seen: AHashSet::new(),
            order_ids: AHashSet::new(),
        }
    }

    /// Seed the pool with every operation already present.
    pub fn seeded(baseline: &[Operation]) -> Self {
        let mut pool = Self::new();
        for op in baseline {
            pool.insert(op);
        }
        pool
    }

    /// Record `op` if unseen. Returns `true` when the operation is new.
    #[inline]
    pub fn insert(&mut self, op: &Operation) -> bool {
        if self.seen.insert(operation_key(op)) {
            self.order_ids.insert(op.order_id.clone());
            true
        } else {
            false
        }
    }

    /// Whether an order identifier is already represented in the pool.
    pub fn has_order(&self, order_id: &str) -> bool {
        self.order_ids.contains(order_id)
    }

    /// Number of distinct operations recorded.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl Default for OperationDedup {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// merge_batch — pure baseline ∪ candidates
// ---------------------------------------------------------------------------

/// Result of merging a candidate batch into a baseline.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Baseline in original order, accepted candidates appended.
    pub merged: Vec<Operation>,
    /// Distinct order identifiers not present in the baseline.
    pub new_orders_count: usize,
    /// Accepted candidate rows (a single order may contribute several
    /// partial-fill rows).
    pub new_ops_count: usize,
}

/// Merge `candidates` into `baseline`, dropping rows already represented.
///
/// Idempotent: merging the same candidates against the post-merge result
/// accepts nothing.
pub fn merge_batch(baseline: &[Operation], candidates: &[Operation]) -> MergeOutcome {
    let mut pool = OperationDedup::seeded(baseline);
    let baseline_orders: AHashSet<&str> =
        baseline.iter().map(|op| op.order_id.as_str()).collect();

    let mut merged: Vec<Operation> = baseline.to_vec();
    let mut new_orders: AHashSet<&str> = AHashSet::new();
    let mut new_ops_count = 0usize;

    for op in candidates {
        if pool.insert(op) {
            if !baseline_orders.contains(op.order_id.as_str()) {
                new_orders.insert(op.order_id.as_str());
            }
            merged.push(op.clone());
            new_ops_count += 1;
        }
    }

    MergeOutcome {
        merged,
        new_orders_count: new_orders.len(),
        new_ops_count,
    }
}
