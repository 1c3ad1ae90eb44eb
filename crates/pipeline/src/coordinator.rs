//! Pipeline Coordinator
//!
//! Sequences fetch → persist → signal over the allocator's admitted set.

use argus_allocator::SlotAllocator;
use argus_core::{CycleId, MarketSnapshot, SymbolId, Timestamp};
use argus_ports::{Clock, FetchError, MarketDataFeed, MarketStoreWriter, StoreError};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore, broadcast};
use tokio::task::JoinSet;

use crate::config::PipelineConfig;
use crate::error::Result;

/// Signal emitted once a cycle's data is durably persisted
#[derive(Debug, Clone, PartialEq)]
pub struct FreshData {
    pub cycle_id: CycleId,
    /// Symbols fetched and persisted in this cycle
    pub symbols: Vec<SymbolId>,
    pub completed_at: Timestamp,
}

/// Why a symbol is missing from a cycle's fresh set
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    Fetch(FetchError),
    Persist(StoreError),
    /// Feed answered with data for another symbol
    Mismatch(SymbolId),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Fetch(e) => write!(f, "fetch: {}", e),
            FailureReason::Persist(e) => write!(f, "persist: {}", e),
            FailureReason::Mismatch(other) => write!(f, "feed returned {}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleFailure {
    pub symbol_id: SymbolId,
    pub reason: FailureReason,
}

/// Outcome of one pipeline cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    /// Admitted set at cycle start
    pub requested: Vec<SymbolId>,
    pub fresh: Vec<SymbolId>,
    pub failed: Vec<CycleFailure>,
    pub completed_at: Timestamp,
}

impl CycleReport {
    pub fn is_fresh(&self, symbol_id: &SymbolId) -> bool {
        self.fresh.contains(symbol_id)
    }
}

/// Writer plus the cycle counter it guards
struct WriterSlot {
    writer: Box<dyn MarketStoreWriter>,
    last_cycle: CycleId,
}

/// Runs strictly sequential fetch → persist → signal cycles
///
/// Holds the only store writer. Concurrent callers of [`run_cycle`] queue on
/// the writer lock, so cycles never overlap.
///
/// [`run_cycle`]: PipelineCoordinator::run_cycle
pub struct PipelineCoordinator {
    config: PipelineConfig,
    allocator: Arc<SlotAllocator>,
    feed: Arc<dyn MarketDataFeed>,
    clock: Arc<dyn Clock>,
    writer: Mutex<WriterSlot>,
    fresh_tx: broadcast::Sender<FreshData>,
}

impl PipelineCoordinator {
    pub fn new(
        config: PipelineConfig,
        allocator: Arc<SlotAllocator>,
        feed: Arc<dyn MarketDataFeed>,
        writer: Box<dyn MarketStoreWriter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (fresh_tx, _) = broadcast::channel(256);
        Self {
            config,
            allocator,
            feed,
            clock,
            writer: Mutex::new(WriterSlot {
                writer,
                last_cycle: 0,
            }),
            fresh_tx,
        }
    }

    /// Subscribe to fresh-data signals
    pub fn subscribe_fresh(&self) -> broadcast::Receiver<FreshData> {
        self.fresh_tx.subscribe()
    }

    /// Run one full cycle over the current admitted set
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut slot = self.writer.lock().await;
        slot.last_cycle += 1;
        let cycle_id = slot.last_cycle;

        let requested = self.allocator.symbols()?;
        debug!(
            "[PIPE] Cycle {} started: {} symbols",
            cycle_id,
            requested.len()
        );

        if let Err(e) = self.feed.sync_subscriptions(&requested).await {
            warn!(
                "[PIPE] Cycle {}: subscription sync with {} failed: {}",
                cycle_id,
                self.feed.name(),
                e
            );
        }

        let (fetched, mut failed) = self.fetch_all(cycle_id, &requested).await;

        let mut fresh = Vec::with_capacity(fetched.len());
        for (symbol_id, snapshot) in fetched {
            match slot.writer.persist(cycle_id, snapshot).await {
                Ok(()) => fresh.push(symbol_id),
                Err(e) => {
                    warn!("[PIPE] Cycle {}: persist {} failed: {}", cycle_id, symbol_id, e);
                    failed.push(CycleFailure {
                        symbol_id,
                        reason: FailureReason::Persist(e),
                    });
                }
            }
        }

        let completed_at = self.clock.now();
        // Still holding the writer: the next cycle cannot fetch before this signal
        let _ = self.fresh_tx.send(FreshData {
            cycle_id,
            symbols: fresh.clone(),
            completed_at,
        });

        if failed.is_empty() {
            debug!("[PIPE] Cycle {} complete: {} fresh", cycle_id, fresh.len());
        } else {
            info!(
                "[PIPE] Cycle {} complete: {} fresh, {} failed",
                cycle_id,
                fresh.len(),
                failed.len()
            );
        }

        Ok(CycleReport {
            cycle_id,
            requested,
            fresh,
            failed,
            completed_at,
        })
    }

    /// Fan out fetches and join them all
    ///
    /// Results come back ordered by symbol so persistence order is stable.
    async fn fetch_all(
        &self,
        cycle_id: CycleId,
        symbols: &[SymbolId],
    ) -> (Vec<(SymbolId, MarketSnapshot)>, Vec<CycleFailure>) {
        let permits = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let timeout = self.config.fetch_timeout();
        let mut tasks = JoinSet::new();

        for symbol_id in symbols.iter().cloned() {
            let feed = Arc::clone(&self.feed);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                let outcome = match tokio::time::timeout(timeout, feed.fetch(&symbol_id)).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout),
                };
                (symbol_id, outcome)
            });
        }

        let mut fetched = Vec::with_capacity(symbols.len());
        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((symbol_id, Ok(snapshot))) if snapshot.symbol_id == symbol_id => {
                    fetched.push((symbol_id, snapshot));
                }
                Ok((symbol_id, Ok(snapshot))) => {
                    warn!(
                        "[PIPE] Cycle {}: asked for {}, feed returned {}",
                        cycle_id, symbol_id, snapshot.symbol_id
                    );
                    failed.push(CycleFailure {
                        symbol_id,
                        reason: FailureReason::Mismatch(snapshot.symbol_id),
                    });
                }
                Ok((symbol_id, Err(e))) => {
                    warn!("[PIPE] Cycle {}: fetch {} failed: {}", cycle_id, symbol_id, e);
                    failed.push(CycleFailure {
                        symbol_id,
                        reason: FailureReason::Fetch(e),
                    });
                }
                Err(e) => {
                    error!("[PIPE] Cycle {}: fetch task aborted: {}", cycle_id, e);
                }
            }
        }

        fetched.sort_by(|a, b| a.0.cmp(&b.0));
        failed.sort_by(|a, b| a.symbol_id.cmp(&b.symbol_id));
        (fetched, failed)
    }
}

impl fmt::Debug for PipelineCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineCoordinator")
            .field("config", &self.config)
            .field("feed", &self.feed.name())
            .finish()
    }
}
