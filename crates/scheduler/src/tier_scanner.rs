//! Tier Scanner
//!
//! Fast-layer re-evaluation, run on the controller's cadence and on
//! preemption. Only ever moves symbols in and out of `Surge`; `Held` and
//! `Shortlisted` occupants are left alone.

use argus_allocator::{Admission, Release, SlotAllocator};
use argus_core::{ScanResult, Score, SymbolId, Tier};
use argus_ports::{MarketStoreReader, Scorer, ScorerKind, UniverseSource};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ScanError;
use crate::scoring::score_all;

/// Tier scanner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierScannerConfig {
    /// Unadmitted symbols at or above this score are promoted to `Surge`
    pub promotion_threshold: Score,
    /// `Surge` symbols below this score are released
    pub demotion_threshold: Score,
    /// Bound on the candidate set of one run
    pub max_candidates: usize,
    /// Per-symbol scoring timeout (ms)
    pub score_timeout_ms: u64,
    /// Concurrent scoring calls
    pub max_in_flight: usize,
}

impl Default for TierScannerConfig {
    fn default() -> Self {
        Self {
            promotion_threshold: 0.7,
            demotion_threshold: 0.4,
            max_candidates: 60,
            score_timeout_ms: 500,
            max_in_flight: 8,
        }
    }
}

impl TierScannerConfig {
    pub fn validate(&self) -> Result<(), ScanError> {
        if !self.promotion_threshold.is_finite() || !self.demotion_threshold.is_finite() {
            return Err(ScanError::InvalidConfig(
                "thresholds must be finite".to_string(),
            ));
        }
        if self.demotion_threshold > self.promotion_threshold {
            return Err(ScanError::InvalidConfig(format!(
                "demotion threshold {} above promotion threshold {}",
                self.demotion_threshold, self.promotion_threshold
            )));
        }
        if self.max_candidates == 0 {
            return Err(ScanError::InvalidConfig(
                "max_candidates must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn score_timeout(&self) -> Duration {
        Duration::from_millis(self.score_timeout_ms)
    }
}

/// What one tier scan did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierScanReport {
    pub result: ScanResult,
    /// Admitted into `Surge`
    pub promoted: Vec<SymbolId>,
    /// Pushed out to make room for promotions
    pub evicted: Vec<SymbolId>,
    /// Qualified but refused: capacity exhausted
    pub rejected: Vec<SymbolId>,
    /// Released from `Surge`
    pub demoted: Vec<SymbolId>,
    /// Kept in `Surge` with a new score
    pub refreshed: Vec<SymbolId>,
    /// Candidates at a more important tier, left untouched
    pub skipped: Vec<SymbolId>,
    /// No score this run; previous tier kept
    pub unavailable: Vec<SymbolId>,
    /// Candidates dropped by the `max_candidates` bound
    pub truncated: usize,
}

impl TierScanReport {
    /// Whether the run changed the admitted set
    pub fn changed(&self) -> bool {
        !(self.promoted.is_empty() && self.demoted.is_empty())
    }
}

impl fmt::Display for TierScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scored={} promoted={} evicted={} rejected={} demoted={} refreshed={} unavailable={}",
            self.result.len(),
            self.promoted.len(),
            self.evicted.len(),
            self.rejected.len(),
            self.demoted.len(),
            self.refreshed.len(),
            self.unavailable.len()
        )
    }
}

pub struct TierScanner {
    config: TierScannerConfig,
    scorer: Arc<dyn Scorer>,
    allocator: Arc<SlotAllocator>,
    universe: Arc<dyn UniverseSource>,
    store: Arc<dyn MarketStoreReader>,
}

impl TierScanner {
    pub fn new(
        config: TierScannerConfig,
        scorer: Arc<dyn Scorer>,
        allocator: Arc<SlotAllocator>,
        universe: Arc<dyn UniverseSource>,
        store: Arc<dyn MarketStoreReader>,
    ) -> Result<Self, ScanError> {
        config.validate()?;
        if scorer.kind() != ScorerKind::Fast {
            warn!(
                "[TIER] Scorer {} is a {} model",
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

    pub fn config(&self) -> &TierScannerConfig {
        &self.config
    }

    /// Run one scan
    ///
    /// `extra` symbols (from preemption signals) lead the candidate set,
    /// followed by current `Surge` occupants and the watch list.
    pub async fn scan(&self, extra: &[SymbolId]) -> Result<TierScanReport, ScanError> {
        self.scan_with_stale(extra, &[]).await
    }

    /// Run one scan, leaving `stale` symbols untouched
    ///
    /// `stale` holds the symbols whose data failed to refresh this cycle.
    /// They are reported as unavailable and keep their tier and score.
    pub async fn scan_with_stale(
        &self,
        extra: &[SymbolId],
        stale: &[SymbolId],
    ) -> Result<TierScanReport, ScanError> {
        let mut report = TierScanReport::default();
        let candidates = self.candidates(extra, stale, &mut report)?;

        let scored = score_all(
            &self.scorer,
            &self.store,
            &candidates,
            self.config.score_timeout(),
            self.config.max_in_flight,
        )
        .await;

        for (symbol_id, e) in scored.unavailable {
            warn!("[TIER] No score for {}, keeping its tier: {}", symbol_id, e);
            report.unavailable.push(symbol_id);
        }

        let mut scores = scored.scores;
        // Demotions first so promotions see the freed capacity
        for (symbol_id, score) in &scores {
            if *score >= self.config.demotion_threshold
                || self.allocator.tier_of(symbol_id) != Some(Tier::Surge)
            {
                continue;
            }
            match self.allocator.release_if_tier(symbol_id, Tier::Surge)? {
                Release::Released(_) => {
                    debug!("[TIER] Demoted {} (score {:.4})", symbol_id, score);
                    report.result.insert(symbol_id.clone(), *score, None);
                    report.demoted.push(symbol_id.clone());
                }
                Release::TierMismatch(tier) => {
                    report.result.insert(symbol_id.clone(), *score, Some(tier));
                    report.skipped.push(symbol_id.clone());
                }
                Release::NotFound => {
                    report.result.insert(symbol_id.clone(), *score, None);
                }
            }
        }

        scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        for (symbol_id, score) in scores {
            if report.result.get(&symbol_id).is_some() {
                continue;
            }
            self.apply(symbol_id, score, &mut report)?;
        }

        if report.changed() {
            info!("[TIER] Scan: {}", report);
        } else {
            debug!("[TIER] Scan: {}", report);
        }
        Ok(report)
    }

    fn candidates(
        &self,
        extra: &[SymbolId],
        stale: &[SymbolId],
        report: &mut TierScanReport,
    ) -> Result<Vec<SymbolId>, ScanError> {
        let slots = self.allocator.snapshot()?;
        let surge = slots
            .iter()
            .filter(|s| s.tier == Tier::Surge)
            .map(|s| s.symbol_id.clone());

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for symbol_id in extra
            .iter()
            .cloned()
            .chain(surge)
            .chain(self.universe.watch_list())
        {
            if !seen.insert(symbol_id.clone()) {
                continue;
            }
            match slots.iter().find(|s| s.symbol_id == symbol_id) {
                Some(slot) if slot.tier != Tier::Surge => report.skipped.push(symbol_id),
                _ if stale.contains(&symbol_id) => {
                    debug!("[TIER] {} has no fresh data, keeping its tier", symbol_id);
                    report.unavailable.push(symbol_id);
                }
                _ => candidates.push(symbol_id),
            }
        }

        if candidates.len() > self.config.max_candidates {
            report.truncated = candidates.len() - self.config.max_candidates;
            debug!(
                "[TIER] Candidate set bounded to {} ({} dropped)",
                self.config.max_candidates, report.truncated
            );
            candidates.truncate(self.config.max_candidates);
        }
        Ok(candidates)
    }

    fn apply(
        &self,
        symbol_id: SymbolId,
        score: Score,
        report: &mut TierScanReport,
    ) -> Result<(), ScanError> {
        match self.allocator.tier_of(&symbol_id) {
            Some(Tier::Surge) => {
                self.allocator.admit(&symbol_id, Tier::Surge, score)?;
                report.result.insert(symbol_id.clone(), score, Some(Tier::Surge));
                report.refreshed.push(symbol_id);
            }
            Some(tier) => {
                report.result.insert(symbol_id.clone(), score, Some(tier));
                if !report.skipped.contains(&symbol_id) {
                    report.skipped.push(symbol_id);
                }
            }
            None if score >= self.config.promotion_threshold => {
                match self.allocator.admit(&symbol_id, Tier::Surge, score)? {
                    Admission::Admitted => {
                        debug!("[TIER] Promoted {} (score {:.4})", symbol_id, score);
                        report.promoted.push(symbol_id.clone());
                    }
                    Admission::Evicted(victim) => {
                        debug!(
                            "[TIER] Promoted {} (score {:.4}), evicting {}",
                            symbol_id, score, victim
                        );
                        report.promoted.push(symbol_id.clone());
                        report.evicted.push(victim);
                    }
                    Admission::Rejected(_) => {
                        debug!("[TIER] No room for {} (score {:.4})", symbol_id, score);
                        report.result.insert(symbol_id.clone(), score, None);
                        report.rejected.push(symbol_id);
                        return Ok(());
                    }
                    Admission::Refreshed | Admission::Upgraded { .. } => {
                        report.refreshed.push(symbol_id.clone());
                    }
                }
                report.result.insert(symbol_id, score, Some(Tier::Surge));
            }
            None => {
                report.result.insert(symbol_id, score, None);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for TierScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TierScanner")
            .field("config", &self.config)
            .field("scorer", &self.scorer.name())
            .finish()
    }
}
