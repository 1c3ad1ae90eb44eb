//! Argus Core Domain
//!
//! Pure domain types for the Argus live-subscription scheduler.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    MarketSnapshot, PositionEvent, ScanEntry, ScanResult, Slot, Tier,
};
pub use values::{CycleId, LogicalTime, Price, Quantity, Score, SymbolId, Timestamp};
