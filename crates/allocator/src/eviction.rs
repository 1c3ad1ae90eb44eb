//! Eviction Policy
//!
//! Pure victim selection for a full pool. Candidates are occupants whose tier
//! is of equal or lower importance than the requesting tier. Among
//! candidates, the preferred victim is:
//!
//! 1. the least important tier,
//! 2. then the lowest score,
//! 3. then the oldest subscription (configurable, see [`TieBreak`]).
//!
//! `Held` occupants only become candidates for a `Held` request; the same
//! ordering then applies to them uniformly.

use argus_core::{Slot, SymbolId, Tier};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Order among occupants with equal tier and equal score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreak {
    /// Evict the longest-subscribed occupant first
    #[default]
    OldestFirst,
    /// Evict the most recently subscribed occupant first
    NewestFirst,
}

/// Picks a victim from a full pool
pub trait EvictionPolicy: Send + Sync {
    /// Policy name for logging
    fn name(&self) -> &str;

    /// Victim for a `requesting`-tier admission, or `None` when no occupant yields
    fn select_victim(&self, occupants: &[Slot], requesting: Tier) -> Option<SymbolId>;
}

/// Default three-key ordering
#[derive(Debug, Clone, Copy, Default)]
pub struct RankedEviction {
    tie_break: TieBreak,
}

impl RankedEviction {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// `Less` when `a` is the preferred victim over `b`
    fn victim_order(&self, a: &Slot, b: &Slot) -> Ordering {
        b.tier
            .priority()
            .cmp(&a.tier.priority())
            .then_with(|| a.score.total_cmp(&b.score))
            .then_with(|| match self.tie_break {
                TieBreak::OldestFirst => a.subscribed_at.cmp(&b.subscribed_at),
                TieBreak::NewestFirst => b.subscribed_at.cmp(&a.subscribed_at),
            })
            .then_with(|| a.symbol_id.cmp(&b.symbol_id))
    }

    /// All candidates for `requesting`, preferred victim first
    pub fn rank<'a>(&self, occupants: &'a [Slot], requesting: Tier) -> Vec<&'a Slot> {
        let mut candidates: Vec<&Slot> = occupants
            .iter()
            .filter(|slot| slot.tier.yields_to(requesting))
            .collect();
        candidates.sort_by(|a, b| self.victim_order(a, b));
        candidates
    }
}

impl EvictionPolicy for RankedEviction {
    fn name(&self) -> &str {
        "ranked"
    }

    fn select_victim(&self, occupants: &[Slot], requesting: Tier) -> Option<SymbolId> {
        occupants
            .iter()
            .filter(|slot| slot.tier.yields_to(requesting))
            .min_by(|a, b| self.victim_order(a, b))
            .map(|slot| slot.symbol_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::LogicalTime;

    fn slot(id: &str, tier: Tier, score: f64, at: u64) -> Slot {
        Slot::new(id.into(), tier, score, LogicalTime::new(at))
    }

    #[test]
    fn test_less_important_tier_goes_first() {
        let policy = RankedEviction::default();
        let occupants = vec![
            slot("held", Tier::Held, -5.0, 1),
            slot("short", Tier::Shortlisted, -1.0, 2),
            slot("surge", Tier::Surge, 9.0, 3),
        ];

        assert_eq!(
            policy.select_victim(&occupants, Tier::Held),
            Some("surge".into())
        );
    }

    #[test]
    fn test_lowest_score_within_tier() {
        let policy = RankedEviction::default();
        let occupants = vec![
            slot("a", Tier::Surge, 0.7, 1),
            slot("b", Tier::Surge, 0.2, 2),
            slot("c", Tier::Surge, 0.5, 3),
        ];

        assert_eq!(
            policy.select_victim(&occupants, Tier::Surge),
            Some("b".into())
        );
    }

    #[test]
    fn test_tie_break_on_subscription_time() {
        let occupants = vec![
            slot("newer", Tier::Surge, 0.5, 9),
            slot("older", Tier::Surge, 0.5, 4),
        ];

        let oldest = RankedEviction::new(TieBreak::OldestFirst);
        assert_eq!(
            oldest.select_victim(&occupants, Tier::Shortlisted),
            Some("older".into())
        );

        let newest = RankedEviction::new(TieBreak::NewestFirst);
        assert_eq!(
            newest.select_victim(&occupants, Tier::Shortlisted),
            Some("newer".into())
        );
    }

    #[test]
    fn test_more_important_occupants_never_candidates() {
        let policy = RankedEviction::default();
        let occupants = vec![
            slot("held", Tier::Held, 0.1, 1),
            slot("short", Tier::Shortlisted, 0.1, 2),
        ];

        assert_eq!(policy.select_victim(&occupants, Tier::Surge), None);
        assert_eq!(
            policy.select_victim(&occupants, Tier::Shortlisted),
            Some("short".into())
        );
    }

    #[test]
    fn test_all_held_pool_yields_to_held_request() {
        let policy = RankedEviction::default();
        let occupants = vec![
            slot("h1", Tier::Held, 0.3, 5),
            slot("h2", Tier::Held, 0.3, 2),
            slot("h3", Tier::Held, 0.9, 1),
        ];

        assert_eq!(policy.select_victim(&occupants, Tier::Surge), None);
        assert_eq!(
            policy.select_victim(&occupants, Tier::Held),
            Some("h2".into())
        );
    }

    #[test]
    fn test_nan_scores_are_ordered() {
        let policy = RankedEviction::default();
        let occupants = vec![
            slot("nan", Tier::Surge, f64::NAN, 1),
            slot("low", Tier::Surge, -1.0, 2),
        ];

        // Positive NaN sorts above every number under total ordering
        assert_eq!(
            policy.select_victim(&occupants, Tier::Surge),
            Some("low".into())
        );
    }

    #[test]
    fn test_rank_lists_candidates_in_victim_order() {
        let policy = RankedEviction::default();
        let occupants = vec![
            slot("held", Tier::Held, 0.0, 1),
            slot("s1", Tier::Shortlisted, 0.4, 2),
            slot("u1", Tier::Surge, 0.8, 3),
            slot("u2", Tier::Surge, 0.1, 4),
        ];

        let ranked: Vec<&str> = policy
            .rank(&occupants, Tier::Shortlisted)
            .iter()
            .map(|s| s.symbol_id.as_str())
            .collect();
        assert_eq!(ranked, vec!["u2", "u1", "s1"]);
    }
}
