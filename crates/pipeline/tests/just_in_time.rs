//! Pipeline Integration Tests
//!
//! Verifies the just-in-time ordering contract:
//! 1. Only admitted symbols are fetched
//! 2. Fresh signals follow persistence
//! 3. Cycles never overlap
//! 4. Failed or timed-out symbols are omitted without aborting the cycle

use argus_allocator::{AllocatorConfig, SlotAllocator};
use argus_clock::SimulationClock;
use argus_core::{CycleId, MarketSnapshot, SymbolId, Tier};
use argus_pipeline::{
    FailureReason, InMemoryMarketStore, InMemoryStoreWriter, PipelineConfig, PipelineCoordinator,
};
use argus_ports::{FetchError, MarketDataFeed, MarketStoreReader, MarketStoreWriter, StoreError};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

type EventLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Respond,
    Fail,
    Hang,
    Delay(u64),
}

struct ScriptedFeed {
    behaviors: HashMap<SymbolId, Behavior>,
    log: EventLog,
}

impl ScriptedFeed {
    fn new(log: EventLog) -> Self {
        Self {
            behaviors: HashMap::new(),
            log,
        }
    }

    fn with(mut self, symbol: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(symbol.into(), behavior);
        self
    }
}

#[async_trait]
impl MarketDataFeed for ScriptedFeed {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn sync_subscriptions(&self, symbols: &[SymbolId]) -> Result<(), FetchError> {
        self.log.lock().push(format!("sync:{}", symbols.len()));
        Ok(())
    }

    async fn fetch(&self, symbol_id: &SymbolId) -> Result<MarketSnapshot, FetchError> {
        self.log.lock().push(format!("fetch:{}", symbol_id));
        match self
            .behaviors
            .get(symbol_id)
            .copied()
            .unwrap_or(Behavior::Respond)
        {
            Behavior::Respond => {}
            Behavior::Fail => return Err(FetchError::Unavailable("scripted".into())),
            Behavior::Hang => tokio::time::sleep(Duration::from_secs(3600)).await,
            Behavior::Delay(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
        Ok(MarketSnapshot::new(
            symbol_id.clone(),
            dec!(100),
            dec!(1000),
            dec!(0.5),
            Utc::now(),
        ))
    }
}

/// Wraps the real writer and records every persist
struct RecordingWriter {
    inner: InMemoryStoreWriter,
    log: EventLog,
    reject: Option<SymbolId>,
}

#[async_trait]
impl MarketStoreWriter for RecordingWriter {
    async fn persist(
        &mut self,
        cycle: CycleId,
        snapshot: MarketSnapshot,
    ) -> Result<(), StoreError> {
        if self.reject.as_ref() == Some(&snapshot.symbol_id) {
            return Err(StoreError::Write("disk full".into()));
        }
        self.log
            .lock()
            .push(format!("persist:{}:{}", cycle, snapshot.symbol_id));
        self.inner.persist(cycle, snapshot).await
    }
}

struct Harness {
    allocator: Arc<SlotAllocator>,
    coordinator: Arc<PipelineCoordinator>,
    reader: Arc<dyn MarketStoreReader>,
    log: EventLog,
}

fn harness(
    symbols: &[&str],
    feed: impl FnOnce(EventLog) -> ScriptedFeed,
    reject: Option<&str>,
) -> Harness {
    let log: EventLog = Arc::new(Mutex::new(Vec::new()));
    let allocator = Arc::new(SlotAllocator::new(AllocatorConfig::default()));
    for s in symbols {
        allocator.admit(&SymbolId::from(*s), Tier::Surge, 1.0).unwrap();
    }

    let (writer, reader) = InMemoryMarketStore::open();
    let writer = RecordingWriter {
        inner: writer,
        log: Arc::clone(&log),
        reject: reject.map(SymbolId::from),
    };
    let clock = SimulationClock::at(Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap());

    let coordinator = PipelineCoordinator::new(
        PipelineConfig {
            fetch_timeout_ms: 500,
            max_in_flight: 4,
        },
        Arc::clone(&allocator),
        Arc::new(feed(Arc::clone(&log))),
        Box::new(writer),
        Arc::new(clock),
    );

    Harness {
        allocator,
        coordinator: Arc::new(coordinator),
        reader: Arc::new(reader),
        log,
    }
}

#[tokio::test]
async fn test_only_admitted_symbols_are_fetched() {
    let _ = env_logger::try_init();
    let h = harness(&["A", "B"], ScriptedFeed::new, None);

    let report = h.coordinator.run_cycle().await.unwrap();
    assert_eq!(report.cycle_id, 1);
    assert_eq!(report.fresh, vec![SymbolId::from("A"), SymbolId::from("B")]);
    assert!(report.failed.is_empty());

    let fetched: Vec<String> = h
        .log
        .lock()
        .iter()
        .filter(|e| e.starts_with("fetch:"))
        .cloned()
        .collect();
    assert_eq!(fetched.len(), 2);
    assert!(h.reader.latest(&"C".into()).is_none());
}

#[tokio::test]
async fn test_fresh_signal_follows_persistence() {
    let h = harness(&["A", "B", "C"], ScriptedFeed::new, None);
    let mut fresh_rx = h.coordinator.subscribe_fresh();

    let report = h.coordinator.run_cycle().await.unwrap();
    let signal = fresh_rx.recv().await.unwrap();

    assert_eq!(signal.cycle_id, report.cycle_id);
    assert_eq!(signal.symbols, report.fresh);
    for symbol in &signal.symbols {
        // Every signalled symbol is readable with data from this very cycle
        assert_eq!(h.reader.written_in(symbol), Some(signal.cycle_id));
    }
    assert_eq!(h.reader.last_cycle(), Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_cycles_never_overlap() {
    let h = harness(
        &["A", "B"],
        |log| {
            ScriptedFeed::new(log)
                .with("A", Behavior::Delay(100))
                .with("B", Behavior::Delay(50))
        },
        None,
    );

    let c1 = Arc::clone(&h.coordinator);
    let c2 = Arc::clone(&h.coordinator);
    let (r1, r2) = tokio::join!(c1.run_cycle(), c2.run_cycle());
    let mut ids = vec![r1.unwrap().cycle_id, r2.unwrap().cycle_id];
    ids.sort();
    assert_eq!(ids, vec![1, 2]);

    let log = h.log.lock().clone();
    let second_sync = log
        .iter()
        .enumerate()
        .filter(|(_, e)| e.starts_with("sync:"))
        .map(|(i, _)| i)
        .nth(1)
        .unwrap();
    let last_persist_of_first = log
        .iter()
        .rposition(|e| e.starts_with("persist:1:"))
        .unwrap();
    assert!(
        last_persist_of_first < second_sync,
        "cycle 2 began before cycle 1 finished: {:?}",
        log
    );
}

#[tokio::test(start_paused = true)]
async fn test_failed_and_timed_out_symbols_are_omitted() {
    let h = harness(
        &["A", "B", "C", "D"],
        |log| {
            ScriptedFeed::new(log)
                .with("B", Behavior::Fail)
                .with("C", Behavior::Hang)
        },
        Some("D"),
    );

    let report = h.coordinator.run_cycle().await.unwrap();

    assert_eq!(report.fresh, vec![SymbolId::from("A")]);
    assert_eq!(report.failed.len(), 3);

    let reason_of = |id: &str| {
        report
            .failed
            .iter()
            .find(|f| f.symbol_id == SymbolId::from(id))
            .map(|f| f.reason.clone())
            .unwrap()
    };
    assert!(matches!(reason_of("B"), FailureReason::Fetch(FetchError::Unavailable(_))));
    assert_eq!(reason_of("C"), FailureReason::Fetch(FetchError::Timeout));
    assert!(matches!(reason_of("D"), FailureReason::Persist(_)));

    assert!(h.reader.latest(&"C".into()).is_none());
    assert!(h.reader.latest(&"A".into()).is_some());
}

#[tokio::test]
async fn test_released_symbol_not_fetched_next_cycle() {
    let h = harness(&["A", "B"], ScriptedFeed::new, None);
    h.coordinator.run_cycle().await.unwrap();

    h.allocator.release(&"B".into()).unwrap();
    let report = h.coordinator.run_cycle().await.unwrap();

    assert_eq!(report.requested, vec![SymbolId::from("A")]);
    assert_eq!(report.cycle_id, 2);
    // Stale data for B stays readable but is not refreshed
    assert_eq!(h.reader.written_in(&"B".into()), Some(1));
    assert_eq!(h.reader.written_in(&"A".into()), Some(2));
}
