//! # opx-fees
//!
//! Fee and settlement computation for repo (caución) operations.
//!
//! - **Tenor parsing** (`tenor`) — `<N>D` extraction from display names
//! - **Repo engine** (`repo`) — per-operation fee breakdown with
//!   reconciliation and configuration-completeness checks
//! - **Aggregation** (`aggregate`) — pure fold of grouped breakdowns into
//!   one settlement total
//!
//! Everything here is a pure function over its inputs: no I/O, no shared
//! mutable state, freely parallel across distinct operations. The rate
//! configuration is read-only during a pass.

pub mod aggregate;
pub mod repo;
pub mod tenor;

pub use aggregate::aggregate_breakdowns;
pub use repo::{compute_breakdown, is_repo_instrument};
pub use tenor::parse_tenor_days;
