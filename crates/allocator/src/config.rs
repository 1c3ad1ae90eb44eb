use serde::{Deserialize, Serialize};

use crate::eviction::TieBreak;

/// Default pool size (concurrent live subscriptions allowed by the feed)
pub const DEFAULT_CAPACITY: usize = 40;

/// Slot allocator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Maximum number of occupied slots
    pub capacity: usize,
    /// Eviction order among same-tier, same-score occupants
    pub tie_break: TieBreak,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            tie_break: TieBreak::OldestFirst,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AllocatorConfig = serde_json::from_str(r#"{"capacity": 12}"#).unwrap();
        assert_eq!(config.capacity, 12);
        assert_eq!(config.tie_break, TieBreak::OldestFirst);

        let config: AllocatorConfig = serde_json::from_str(r#"{"tie_break": "NewestFirst"}"#).unwrap();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert_eq!(config.tie_break, TieBreak::NewestFirst);
    }
}
