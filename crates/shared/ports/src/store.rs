use argus_core::{CycleId, MarketSnapshot, SymbolId};
use async_trait::async_trait;

use crate::error::StoreError;

/// Write side of the persistence store
///
/// Exactly one writer exists and it is held by the pipeline coordinator.
/// Writes take `&mut self` and implementations are not `Clone`.
#[async_trait]
pub trait MarketStoreWriter: Send {
    /// Durably persist a snapshot produced by `cycle`
    async fn persist(&mut self, cycle: CycleId, snapshot: MarketSnapshot)
    -> Result<(), StoreError>;
}

/// Read side of the persistence store, handed to every other component
pub trait MarketStoreReader: Send + Sync {
    /// Latest persisted snapshot for a symbol
    fn latest(&self, symbol_id: &SymbolId) -> Option<MarketSnapshot>;

    /// Cycle that wrote the latest snapshot for a symbol
    fn written_in(&self, symbol_id: &SymbolId) -> Option<CycleId>;

    /// Most recent cycle that persisted anything
    fn last_cycle(&self) -> Option<CycleId>;
}
