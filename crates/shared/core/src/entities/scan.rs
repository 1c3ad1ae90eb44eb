use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::Tier;
use crate::values::{Score, SymbolId};

/// One scored symbol and the tier the scanner recommends for it
///
/// `recommended` is `None` when the scanner wants the symbol out of its tier
/// (or never in it).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanEntry {
    pub score: Score,
    pub recommended: Option<Tier>,
}

/// Ephemeral output of a single scanner run
///
/// Produced and consumed within one scheduler tick; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    entries: BTreeMap<SymbolId, ScanEntry>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol_id: SymbolId, score: Score, recommended: Option<Tier>) {
        self.entries.insert(symbol_id, ScanEntry { score, recommended });
    }

    pub fn get(&self, symbol_id: &SymbolId) -> Option<&ScanEntry> {
        self.entries.get(symbol_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SymbolId, &ScanEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Symbols recommended for `tier`
    pub fn recommended_for(&self, tier: Tier) -> Vec<&SymbolId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.recommended == Some(tier))
            .map(|(s, _)| s)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommended_for() {
        let mut result = ScanResult::new();
        result.insert("A".into(), 0.9, Some(Tier::Surge));
        result.insert("B".into(), 0.1, None);
        result.insert("C".into(), 0.8, Some(Tier::Surge));

        let surge = result.recommended_for(Tier::Surge);
        assert_eq!(surge.len(), 2);
        assert_eq!(result.get(&"B".into()).unwrap().recommended, None);
    }
}
