//! Snapshot diffs
//!
//! Admission refusals, evictions and demotions are only observable by
//! comparing successive snapshots; [`SnapshotDiff`] makes that comparison.

use argus_core::{Slot, SymbolId, Tier};
use std::collections::HashMap;
use std::fmt;

/// Difference between two allocator snapshots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDiff {
    /// Present only in the later snapshot
    pub added: Vec<Slot>,
    /// Present only in the earlier snapshot
    pub removed: Vec<Slot>,
    /// Present in both with a different tier: (symbol, before, after)
    pub retiered: Vec<(SymbolId, Tier, Tier)>,
}

impl SnapshotDiff {
    pub fn between(before: &[Slot], after: &[Slot]) -> Self {
        let old: HashMap<&SymbolId, &Slot> = before.iter().map(|s| (&s.symbol_id, s)).collect();
        let new: HashMap<&SymbolId, &Slot> = after.iter().map(|s| (&s.symbol_id, s)).collect();

        let added = after
            .iter()
            .filter(|s| !old.contains_key(&s.symbol_id))
            .cloned()
            .collect();
        let removed = before
            .iter()
            .filter(|s| !new.contains_key(&s.symbol_id))
            .cloned()
            .collect();
        let retiered = after
            .iter()
            .filter_map(|s| {
                old.get(&s.symbol_id)
                    .filter(|prev| prev.tier != s.tier)
                    .map(|prev| (s.symbol_id.clone(), prev.tier, s.tier))
            })
            .collect();

        Self {
            added,
            removed,
            retiered,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.retiered.is_empty()
    }

    /// Added symbols at `tier`
    pub fn added_at(&self, tier: Tier) -> Vec<&SymbolId> {
        self.added
            .iter()
            .filter(|s| s.tier == tier)
            .map(|s| &s.symbol_id)
            .collect()
    }
}

impl fmt::Display for SnapshotDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = |slots: &[Slot]| {
            slots
                .iter()
                .map(|s| format!("{}({})", s.symbol_id, s.tier))
                .collect::<Vec<_>>()
                .join(",")
        };
        write!(
            f,
            "+[{}] -[{}] ~[{}]",
            ids(&self.added),
            ids(&self.removed),
            self.retiered
                .iter()
                .map(|(s, from, to)| format!("{}:{}->{}", s, from, to))
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}
