//! In-memory persistence store
//!
//! [`InMemoryMarketStore::open`] hands out exactly one writer (kept by the
//! pipeline coordinator) and a cloneable reader for everyone else.

use argus_core::{CycleId, MarketSnapshot, SymbolId};
use argus_ports::{MarketStoreReader, MarketStoreWriter, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone)]
struct StoredSnapshot {
    snapshot: MarketSnapshot,
    cycle: CycleId,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: DashMap<SymbolId, StoredSnapshot>,
    /// 0 until the first write (cycles start at 1)
    last_cycle: AtomicU64,
}

/// Factory for the writer/reader pair
pub struct InMemoryMarketStore;

impl InMemoryMarketStore {
    pub fn open() -> (InMemoryStoreWriter, InMemoryStoreReader) {
        let inner = Arc::new(StoreInner::default());
        (
            InMemoryStoreWriter {
                inner: Arc::clone(&inner),
            },
            InMemoryStoreReader { inner },
        )
    }
}

/// The only write handle; deliberately not `Clone`
#[derive(Debug)]
pub struct InMemoryStoreWriter {
    inner: Arc<StoreInner>,
}

#[async_trait]
impl MarketStoreWriter for InMemoryStoreWriter {
    async fn persist(
        &mut self,
        cycle: CycleId,
        snapshot: MarketSnapshot,
    ) -> Result<(), StoreError> {
        if let Some(existing) = self.inner.records.get(&snapshot.symbol_id)
            && existing.cycle > cycle
        {
            return Err(StoreError::Write(format!(
                "{} already written by newer cycle {}",
                snapshot.symbol_id, existing.cycle
            )));
        }

        self.inner.records.insert(
            snapshot.symbol_id.clone(),
            StoredSnapshot { snapshot, cycle },
        );
        self.inner.last_cycle.fetch_max(cycle, Ordering::SeqCst);
        Ok(())
    }
}

/// Shared read handle
#[derive(Debug, Clone)]
pub struct InMemoryStoreReader {
    inner: Arc<StoreInner>,
}

impl InMemoryStoreReader {
    pub fn len(&self) -> usize {
        self.inner.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.is_empty()
    }
}

impl MarketStoreReader for InMemoryStoreReader {
    fn latest(&self, symbol_id: &SymbolId) -> Option<MarketSnapshot> {
        self.inner
            .records
            .get(symbol_id)
            .map(|r| r.snapshot.clone())
    }

    fn written_in(&self, symbol_id: &SymbolId) -> Option<CycleId> {
        self.inner.records.get(symbol_id).map(|r| r.cycle)
    }

    fn last_cycle(&self) -> Option<CycleId> {
        match self.inner.last_cycle.load(Ordering::SeqCst) {
            0 => None,
            cycle => Some(cycle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn snapshot(id: &str, price: rust_decimal::Decimal) -> MarketSnapshot {
        MarketSnapshot::new(id.into(), price, dec!(10), dec!(0), Utc::now())
    }

    #[tokio::test]
    async fn test_reader_sees_writes() {
        let (mut writer, reader) = InMemoryMarketStore::open();
        assert!(reader.is_empty());
        assert_eq!(reader.last_cycle(), None);

        writer.persist(1, snapshot("A", dec!(100))).await.unwrap();
        writer.persist(2, snapshot("A", dec!(101))).await.unwrap();

        let id = SymbolId::from("A");
        assert_eq!(reader.latest(&id).unwrap().last_price, dec!(101));
        assert_eq!(reader.written_in(&id), Some(2));
        assert_eq!(reader.last_cycle(), Some(2));
        assert_eq!(reader.latest(&"B".into()), None);
    }

    #[tokio::test]
    async fn test_older_cycle_cannot_overwrite() {
        let (mut writer, reader) = InMemoryMarketStore::open();
        writer.persist(5, snapshot("A", dec!(1))).await.unwrap();

        let err = writer.persist(4, snapshot("A", dec!(2))).await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        assert_eq!(reader.latest(&"A".into()).unwrap().last_price, dec!(1));
    }
}
