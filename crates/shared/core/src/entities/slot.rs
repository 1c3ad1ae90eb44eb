use serde::{Deserialize, Serialize};

use crate::entities::Tier;
use crate::values::{LogicalTime, Score, SymbolId};

/// One occupied unit of the fixed-capacity subscription pool
///
/// Owned exclusively by the slot allocator; other components only ever see
/// copies taken from a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub symbol_id: SymbolId,
    pub tier: Tier,
    /// Last known score
    pub score: Score,
    /// When the symbol was admitted (reset on re-admission after removal)
    pub subscribed_at: LogicalTime,
    /// When the score was last refreshed
    pub last_scored_at: LogicalTime,
}

impl Slot {
    pub fn new(symbol_id: SymbolId, tier: Tier, score: Score, at: LogicalTime) -> Self {
        Self {
            symbol_id,
            tier,
            score,
            subscribed_at: at,
            last_scored_at: at,
        }
    }

    /// Refresh score without touching tier or subscription time
    pub fn refresh(&mut self, score: Score, at: LogicalTime) {
        self.score = score;
        self.last_scored_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_keeps_subscription_time() {
        let mut slot = Slot::new("A".into(), Tier::Surge, 0.5, LogicalTime::new(3));
        slot.refresh(0.9, LogicalTime::new(7));

        assert_eq!(slot.subscribed_at, LogicalTime::new(3));
        assert_eq!(slot.last_scored_at, LogicalTime::new(7));
        assert_eq!(slot.score, 0.9);
        assert_eq!(slot.tier, Tier::Surge);
    }
}
