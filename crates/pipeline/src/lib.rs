//! Argus Pipeline
//!
//! Feeds the live subscription list. Each cycle:
//!
//! ```text
//! SlotAllocator::snapshot()
//!         │ admitted symbols
//!         ▼
//! ┌──────────────────────────────────────────────┐
//! │ (1) fetch   fan-out per symbol, bounded      │
//! │             timeout, joined before (2)       │
//! │ (2) persist single writer, sequential        │
//! │ (3) signal  FreshData broadcast              │
//! └──────────────────────────────────────────────┘
//!         │
//!         ▼
//! scanners / analysis read through MarketStoreReader
//! ```
//!
//! Cycles never overlap: a cycle holds the writer for its whole duration, so
//! every consumer read that follows a `FreshData` signal observes the most
//! recent write. A symbol that fails to fetch or persist is simply missing
//! from that cycle's signal.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod store;

// Re-export main types
pub use config::PipelineConfig;
pub use coordinator::{CycleFailure, CycleReport, FailureReason, FreshData, PipelineCoordinator};
pub use error::{PipelineError, Result};
pub use store::{InMemoryMarketStore, InMemoryStoreReader, InMemoryStoreWriter};
