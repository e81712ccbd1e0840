//! Shared data types for the operations gateway.

pub mod enums;
pub mod fees;
pub mod operation;

pub use enums::*;
pub use fees::*;
pub use operation::*;
