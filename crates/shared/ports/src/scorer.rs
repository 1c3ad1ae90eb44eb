use argus_core::{MarketSnapshot, Score, SymbolId};
use async_trait::async_trait;
use std::fmt;

use crate::error::ScoreError;

/// Which scanning layer a scorer serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScorerKind {
    /// Cheap model used by the short-interval tier scan
    Fast,
    /// Expensive model used by the once-per-session full-universe scan
    Deep,
}

impl fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScorerKind::Fast => f.write_str("fast"),
            ScorerKind::Deep => f.write_str("deep"),
        }
    }
}

/// Port for scoring models
///
/// Treated as a black box with bounded latency. `recent` is the latest
/// persisted snapshot for the symbol, if any.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Which layer this model belongs to
    fn kind(&self) -> ScorerKind;

    /// Model name for logging
    fn name(&self) -> &str;

    /// Score a single symbol
    async fn score(
        &self,
        symbol_id: &SymbolId,
        recent: Option<&MarketSnapshot>,
    ) -> Result<Score, ScoreError>;
}
