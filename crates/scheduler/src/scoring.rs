//! Bounded fan-out over a scoring model

use argus_core::{Score, SymbolId};
use argus_ports::{MarketStoreReader, ScoreError, Scorer};
use log::error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Scores gathered from one scanner run
#[derive(Debug, Default)]
pub(crate) struct Scored {
    /// Ordered by symbol
    pub scores: Vec<(SymbolId, Score)>,
    pub unavailable: Vec<(SymbolId, ScoreError)>,
}

/// Score every symbol, each call bounded by `timeout`
///
/// Each symbol is scored against its latest persisted snapshot. Non-finite
/// scores count as unavailable.
pub(crate) async fn score_all(
    scorer: &Arc<dyn Scorer>,
    store: &Arc<dyn MarketStoreReader>,
    symbols: &[SymbolId],
    timeout: Duration,
    max_in_flight: usize,
) -> Scored {
    let permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks = JoinSet::new();

    for symbol_id in symbols.iter().cloned() {
        let scorer = Arc::clone(scorer);
        let permits = Arc::clone(&permits);
        let recent = store.latest(&symbol_id);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let outcome =
                match tokio::time::timeout(timeout, scorer.score(&symbol_id, recent.as_ref())).await
                {
                    Ok(Ok(score)) if !score.is_finite() => Err(ScoreError::Unavailable(format!(
                        "non-finite score {}",
                        score
                    ))),
                    Ok(result) => result,
                    Err(_) => Err(ScoreError::Timeout),
                };
            (symbol_id, outcome)
        });
    }

    let mut scored = Scored::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((symbol_id, Ok(score))) => scored.scores.push((symbol_id, score)),
            Ok((symbol_id, Err(e))) => scored.unavailable.push((symbol_id, e)),
            Err(e) => error!("[SCORE] {} task aborted: {}", scorer.name(), e),
        }
    }

    scored.scores.sort_by(|a, b| a.0.cmp(&b.0));
    scored.unavailable.sort_by(|a, b| a.0.cmp(&b.0));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::MarketSnapshot;
    use argus_ports::ScorerKind;
    use async_trait::async_trait;

    struct FixedStore;

    impl MarketStoreReader for FixedStore {
        fn latest(&self, _symbol_id: &SymbolId) -> Option<MarketSnapshot> {
            None
        }

        fn written_in(&self, _symbol_id: &SymbolId) -> Option<u64> {
            None
        }

        fn last_cycle(&self) -> Option<u64> {
            None
        }
    }

    struct OddScorer;

    #[async_trait]
    impl Scorer for OddScorer {
        fn kind(&self) -> ScorerKind {
            ScorerKind::Fast
        }

        fn name(&self) -> &str {
            "odd"
        }

        async fn score(
            &self,
            symbol_id: &SymbolId,
            _recent: Option<&MarketSnapshot>,
        ) -> Result<Score, ScoreError> {
            match symbol_id.as_str() {
                "SLOW" => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(1.0)
                }
                "NAN" => Ok(f64::NAN),
                "DOWN" => Err(ScoreError::Unavailable("model offline".into())),
                _ => Ok(0.5),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_score_all_partitions_outcomes() {
        let scorer: Arc<dyn Scorer> = Arc::new(OddScorer);
        let store: Arc<dyn MarketStoreReader> = Arc::new(FixedStore);
        let symbols: Vec<SymbolId> = ["OK", "SLOW", "NAN", "DOWN"]
            .into_iter()
            .map(SymbolId::from)
            .collect();

        let scored = score_all(&scorer, &store, &symbols, Duration::from_secs(1), 2).await;

        assert_eq!(scored.scores, vec![(SymbolId::from("OK"), 0.5)]);
        let failed: Vec<&str> = scored.unavailable.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(failed, vec!["DOWN", "NAN", "SLOW"]);
        assert!(
            scored
                .unavailable
                .iter()
                .any(|(s, e)| s.as_str() == "SLOW" && *e == ScoreError::Timeout)
        );
    }
}
