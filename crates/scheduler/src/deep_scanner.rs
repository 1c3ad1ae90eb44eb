//! Deep Scanner
//!
//! Once per session, before the open: score the whole tracked universe with
//! the expensive model, rank it, and make the top N the `Shortlisted` tier.

use argus_allocator::{Admission, Release, SlotAllocator};
use argus_core::{ScanResult, Score, SymbolId, Tier};
use argus_ports::{MarketStoreReader, Scorer, ScorerKind, UniverseSource};
use log::{debug, info, warn};
use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ScanError;
use crate::scoring::score_all;

/// Deep scanner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepScannerConfig {
    /// Size of the `Shortlisted` tier
    pub shortlist_size: usize,
    /// Symbols scoring below this never make the shortlist
    pub min_score: Option<Score>,
    /// Per-symbol scoring timeout (ms)
    pub score_timeout_ms: u64,
    /// Concurrent scoring calls
    pub max_in_flight: usize,
}

impl Default for DeepScannerConfig {
    fn default() -> Self {
        Self {
            shortlist_size: 20,
            min_score: None,
            score_timeout_ms: 5_000,
            max_in_flight: 16,
        }
    }
}

impl DeepScannerConfig {
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.shortlist_size == 0 {
            return Err(ScanError::InvalidConfig(
                "shortlist_size must be positive".to_string(),
            ));
        }
        if self.min_score.is_some_and(|m| !m.is_finite()) {
            return Err(ScanError::InvalidConfig(
                "min_score must be finite".to_string(),
            ));
        }
        Ok(())
    }

    pub fn score_timeout(&self) -> Duration {
        Duration::from_millis(self.score_timeout_ms)
    }
}

/// Ranking key: higher score first, then lower symbol
#[derive(Debug, Clone, PartialEq)]
struct Rank {
    score: Score,
    symbol_id: SymbolId,
}

impl Eq for Rank {}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.symbol_id.cmp(&self.symbol_id))
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// What one deep scan did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepScanReport {
    pub result: ScanResult,
    /// New top N, best first
    pub shortlist: Vec<SymbolId>,
    /// Newly admitted or upgraded into `Shortlisted`
    pub promoted: Vec<SymbolId>,
    /// Pushed out to make room
    pub evicted: Vec<SymbolId>,
    /// Made the shortlist but found no room
    pub rejected: Vec<SymbolId>,
    /// Previous `Shortlisted` symbols released
    pub demoted: Vec<SymbolId>,
    /// Already at `Shortlisted` or `Held`; also previous entries with no score
    pub retained: Vec<SymbolId>,
    pub unavailable: Vec<SymbolId>,
}

impl fmt::Display for DeepScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scored={} shortlist={} promoted={} evicted={} rejected={} demoted={} retained={} unavailable={}",
            self.result.len(),
            self.shortlist.len(),
            self.promoted.len(),
            self.evicted.len(),
            self.rejected.len(),
            self.demoted.len(),
            self.retained.len(),
            self.unavailable.len()
        )
    }
}

pub struct DeepScanner {
    config: DeepScannerConfig,
    scorer: Arc<dyn Scorer>,
    allocator: Arc<SlotAllocator>,
    universe: Arc<dyn UniverseSource>,
    store: Arc<dyn MarketStoreReader>,
}

impl DeepScanner {
    pub fn new(
        config: DeepScannerConfig,
        scorer: Arc<dyn Scorer>,
        allocator: Arc<SlotAllocator>,
        universe: Arc<dyn UniverseSource>,
        store: Arc<dyn MarketStoreReader>,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        if scorer.kind() != ScorerKind::Deep {
            warn!(
                "[DEEP] Scorer {} is a {} model",
                scorer.name(),
                scorer.kind()
            );
        }
        Ok(Self {
            config,
            scorer,
            allocator,
            universe,
            store,
        })
    }

    pub fn config(&self) -> &DeepScannerConfig {
        &self.config
    }

    /// Score the universe and rebuild the `Shortlisted` tier
    pub async fn scan(&self) -> Result<DeepScanReport, ScanError> {
        let mut seen = HashSet::new();
        let universe: Vec<SymbolId> = self
            .universe
            .tracked_universe()
            .into_iter()
            .filter(|s| seen.insert(s.clone()))
            .collect();
        info!(
            "[DEEP] Scoring {} symbols with {}",
            universe.len(),
            self.scorer.name()
        );

        let scored = score_all(
            &self.scorer,
            &self.store,
            &universe,
            self.config.score_timeout(),
            self.config.max_in_flight,
        )
        .await;

        let mut report = DeepScanReport::default();
        for (symbol_id, e) in scored.unavailable {
            debug!("[DEEP] No score for {}: {}", symbol_id, e);
            report.unavailable.push(symbol_id);
        }

        let mut queue = PriorityQueue::new();
        for (symbol_id, score) in scored.scores {
            if self.config.min_score.is_some_and(|floor| score < floor) {
                report.result.insert(symbol_id, score, None);
                continue;
            }
            queue.push(symbol_id.clone(), Rank { score, symbol_id });
        }

        let mut ranked: Vec<(SymbolId, Score)> = Vec::new();
        while ranked.len() < self.config.shortlist_size {
            let Some((symbol_id, rank)) = queue.pop() else {
                break;
            };
            report
                .result
                .insert(symbol_id.clone(), rank.score, Some(Tier::Shortlisted));
            ranked.push((symbol_id, rank.score));
        }
        for (symbol_id, rank) in queue.into_iter() {
            report.result.insert(symbol_id, rank.score, None);
        }
        report.shortlist = ranked.iter().map(|(s, _)| s.clone()).collect();

        self.demote_stale(&mut report)?;
        for (symbol_id, score) in ranked {
            self.promote(symbol_id, score, &mut report)?;
        }

        info!("[DEEP] Scan: {}", report);
        Ok(report)
    }

    /// Release previous shortlist entries that fell out of the top N
    fn demote_stale(&self, report: &mut DeepScanReport) -> Result<(), ScanError> {
        let previous: Vec<SymbolId> = self
            .allocator
            .snapshot()?
            .into_iter()
            .filter(|slot| slot.tier == Tier::Shortlisted)
            .map(|slot| slot.symbol_id)
            .collect();

        for symbol_id in previous {
            if report.shortlist.contains(&symbol_id) {
                continue;
            }
            if report.unavailable.contains(&symbol_id) {
                debug!("[DEEP] Keeping {}: no score this session", symbol_id);
                report.retained.push(symbol_id);
                continue;
            }
            match self.allocator.release_if_tier(&symbol_id, Tier::Shortlisted)? {
                Release::Released(_) => report.demoted.push(symbol_id),
                Release::TierMismatch(_) => report.retained.push(symbol_id),
                Release::NotFound => {}
            }
        }
        Ok(())
    }

    fn promote(
        &self,
        symbol_id: SymbolId,
        score: Score,
        report: &mut DeepScanReport,
    ) -> Result<(), ScanError> {
        // Never cannibalise the shortlist: without a free slot or a Surge
        // occupant, a Shortlisted admit would evict another Shortlisted one
        if self.allocator.tier_of(&symbol_id).is_none() && !self.has_room()? {
            warn!("[DEEP] No room for {} (score {:.4})", symbol_id, score);
            report.rejected.push(symbol_id);
            return Ok(());
        }

        match self.allocator.admit(&symbol_id, Tier::Shortlisted, score)? {
            Admission::Admitted | Admission::Upgraded { .. } => report.promoted.push(symbol_id),
            Admission::Evicted(victim) => {
                report.promoted.push(symbol_id);
                report.evicted.push(victim);
            }
            Admission::Refreshed => report.retained.push(symbol_id),
            Admission::Rejected(_) => {
                warn!("[DEEP] No room for {} (score {:.4})", symbol_id, score);
                report.rejected.push(symbol_id);
            }
        }
        Ok(())
    }

    fn has_room(&self) -> Result<bool, ScanError> {
        if self.allocator.free_slots() > 0 {
            return Ok(true);
        }
        Ok(self
            .allocator
            .snapshot()?
            .iter()
            .any(|slot| slot.tier == Tier::Surge))
    }
}

impl fmt::Debug for DeepScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepScanner")
            .field("config", &self.config)
            .field("scorer", &self.scorer.name())
            .finish()
    }
}
