//! # opx-core
//!
//! Core crate for the operations gateway, providing:
//!
//! - **Types** (`types`) — enums, operation records, fee breakdown structs
//! - **Configuration** (`config`) — JSON config + repo fee rate tables
//! - **Error types** (`error`) — `OpxError` via thiserror + the broker
//!   error taxonomy driving the retry policy
//! - **Retry** (`retry`) — fixed-schedule backoff executor
//! - **Deduplication** (`dedup`) — composite-key dedup pool and batch merge
//! - **Consolidation** (`consolidate`) — VWAP partial-fill consolidation
//! - **Time utilities** (`time_util`) — epoch-ms timestamps
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod consolidate;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod retry;
pub mod time_util;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
