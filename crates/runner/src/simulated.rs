//! Simulated collaborators
//!
//! Stand-ins for the vendor market-data feed and the two scoring models so
//! a whole session can run offline. All randomness comes from one seed.

use argus_core::{MarketSnapshot, Price, Quantity, Score, SymbolId};
use argus_ports::{
    Clock, FetchError, MarketDataFeed, ScoreError, Scorer, ScorerKind, StaticUniverse,
};
use async_trait::async_trait;
use log::{debug, trace};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Build a universe of `size` symbols and draw a watch list from it
pub fn simulated_universe(size: usize, watch_list_size: usize, seed: Option<u64>) -> StaticUniverse {
    let universe: Vec<SymbolId> = (1..=size)
        .map(|n| SymbolId::new(format!("S{:04}", n)))
        .collect();

    let mut rng = seeded(seed);
    let mut watch_list: Vec<SymbolId> = universe
        .choose_multiple(&mut rng, watch_list_size.min(size))
        .cloned()
        .collect();
    watch_list.sort();

    StaticUniverse::new(universe, watch_list)
}

/// Simulated feed configuration
#[derive(Debug, Clone)]
pub struct SimulatedFeedConfig {
    /// Concurrent subscriptions the vendor allows
    pub subscription_limit: usize,
    pub latency: Duration,
    pub failure_rate: f64,
    /// Per-fetch random walk step, as a fraction of price
    pub volatility: f64,
}

impl Default for SimulatedFeedConfig {
    fn default() -> Self {
        Self {
            subscription_limit: argus_allocator::config::DEFAULT_CAPACITY,
            latency: Duration::from_millis(20),
            failure_rate: 0.0,
            volatility: 0.004,
        }
    }
}

#[derive(Debug)]
struct Quote {
    prev_close: Price,
    last_price: Price,
    volume: Quantity,
}

#[derive(Debug)]
struct FeedState {
    quotes: HashMap<SymbolId, Quote>,
    subscribed: HashSet<SymbolId>,
    rng: StdRng,
}

/// Random-walk market data over a fixed universe
pub struct SimulatedFeed {
    config: SimulatedFeedConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<FeedState>,
}

impl SimulatedFeed {
    pub fn new(
        config: SimulatedFeedConfig,
        universe: &[SymbolId],
        clock: Arc<dyn Clock>,
        seed: Option<u64>,
    ) -> Self {
        let mut rng = seeded(seed);
        let quotes = universe
            .iter()
            .map(|symbol_id| {
                let price = Decimal::from(rng.gen_range(1_000..200_000u32));
                (
                    symbol_id.clone(),
                    Quote {
                        prev_close: price,
                        last_price: price,
                        volume: Decimal::ZERO,
                    },
                )
            })
            .collect();

        Self {
            config,
            clock,
            state: Mutex::new(FeedState {
                quotes,
                subscribed: HashSet::new(),
                rng,
            }),
        }
    }

    /// Currently subscribed symbols
    pub fn subscribed(&self) -> usize {
        self.state.lock().subscribed.len()
    }

    /// Advance one quote and build its snapshot
    fn step(&self, symbol_id: &SymbolId) -> Result<MarketSnapshot, FetchError> {
        let mut state = self.state.lock();
        if !state.subscribed.contains(symbol_id) {
            return Err(FetchError::Subscription(format!(
                "{} is not subscribed",
                symbol_id
            )));
        }
        if state.rng.gen_bool(self.config.failure_rate) {
            return Err(FetchError::Unavailable("simulated vendor error".to_string()));
        }

        let step: f64 = state.rng.gen_range(-1.0..1.0) * self.config.volatility;
        let traded = Decimal::from(state.rng.gen_range(100..5_000u32));
        let FeedState { quotes, .. } = &mut *state;
        let quote = quotes
            .get_mut(symbol_id)
            .ok_or_else(|| FetchError::UnknownSymbol(symbol_id.to_string()))?;

        let current = quote.last_price.to_f64().unwrap_or_default();
        let next = Decimal::from_f64_retain(current * (1.0 + step))
            .unwrap_or(quote.last_price)
            .round_dp(2)
            .max(dec!(0.01));
        quote.last_price = next;
        quote.volume += traded;

        let change_pct = if quote.prev_close.is_zero() {
            Decimal::ZERO
        } else {
            ((next - quote.prev_close) / quote.prev_close * dec!(100)).round_dp(4)
        };

        Ok(MarketSnapshot::new(
            symbol_id.clone(),
            next,
            quote.volume,
            change_pct,
            self.clock.now(),
        ))
    }
}

#[async_trait]
impl MarketDataFeed for SimulatedFeed {
    fn name(&self) -> &str {
        "SimulatedFeed"
    }

    async fn sync_subscriptions(&self, symbols: &[SymbolId]) -> Result<(), FetchError> {
        if symbols.len() > self.config.subscription_limit {
            return Err(FetchError::Subscription(format!(
                "{} subscriptions requested, vendor limit is {}",
                symbols.len(),
                self.config.subscription_limit
            )));
        }

        let mut state = self.state.lock();
        let unknown = symbols.iter().find(|s| !state.quotes.contains_key(*s));
        if let Some(symbol_id) = unknown {
            return Err(FetchError::UnknownSymbol(symbol_id.to_string()));
        }
        state.subscribed = symbols.iter().cloned().collect();
        debug!("[FEED] Subscriptions synced: {}", state.subscribed.len());
        Ok(())
    }

    async fn fetch(&self, symbol_id: &SymbolId) -> Result<MarketSnapshot, FetchError> {
        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }
        self.step(symbol_id)
    }
}

/// Seeded stand-in for the fast and deep scoring models
///
/// Every symbol carries a hidden base quality. The deep model reports it
/// with a little noise; the fast model blends it with the momentum of the
/// most recent snapshot.
pub struct SimulatedScorer {
    kind: ScorerKind,
    base: HashMap<SymbolId, Score>,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedScorer {
    pub fn new(kind: ScorerKind, universe: &[SymbolId], failure_rate: f64, seed: Option<u64>) -> Self {
        // Both models share the base draw; only the noise stream differs
        let mut base_rng = seeded(seed);
        let base = universe
            .iter()
            .map(|s| (s.clone(), base_rng.r#gen::<f64>()))
            .collect();
        let noise_seed = seed.map(|s| match kind {
            ScorerKind::Fast => s.wrapping_add(1),
            ScorerKind::Deep => s.wrapping_add(2),
        });

        Self {
            kind,
            base,
            failure_rate,
            rng: Mutex::new(seeded(noise_seed)),
        }
    }

    fn momentum(recent: Option<&MarketSnapshot>) -> f64 {
        // +/-5% maps onto the full [0, 1] range
        recent
            .and_then(|s| s.change_pct.to_f64())
            .map(|pct| (0.5 + pct / 10.0).clamp(0.0, 1.0))
            .unwrap_or(0.5)
    }
}

#[async_trait]
impl Scorer for SimulatedScorer {
    fn kind(&self) -> ScorerKind {
        self.kind
    }

    fn name(&self) -> &str {
        match self.kind {
            ScorerKind::Fast => "simulated-fast",
            ScorerKind::Deep => "simulated-deep",
        }
    }

    async fn score(
        &self,
        symbol_id: &SymbolId,
        recent: Option<&MarketSnapshot>,
    ) -> Result<Score, ScoreError> {
        let base = *self
            .base
            .get(symbol_id)
            .ok_or_else(|| ScoreError::Unavailable(format!("{} not modelled", symbol_id)))?;

        let (failed, noise) = {
            let mut rng = self.rng.lock();
            (rng.gen_bool(self.failure_rate), rng.gen_range(-0.05..0.05))
        };
        if failed {
            return Err(ScoreError::Unavailable("simulated model error".to_string()));
        }

        let score = match self.kind {
            ScorerKind::Deep => base + noise,
            ScorerKind::Fast => 0.5 * base + 0.5 * Self::momentum(recent) + noise,
        };
        trace!("[SCORE] {} {} = {:.3}", self.kind, symbol_id, score);
        Ok(score.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_clock::SimulationClock;
    use argus_ports::UniverseSource;
    use chrono::{TimeZone, Utc};

    fn clock() -> Arc<dyn Clock> {
        Arc::new(SimulationClock::at(
            Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_universe_is_reproducible() {
        let a = simulated_universe(50, 5, Some(3));
        let b = simulated_universe(50, 5, Some(3));

        assert_eq!(a.tracked_universe().len(), 50);
        assert_eq!(a.watch_list().len(), 5);
        assert_eq!(a.watch_list(), b.watch_list());
        assert!(a
            .watch_list()
            .iter()
            .all(|s| a.tracked_universe().contains(s)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_requires_subscription() {
        let universe = simulated_universe(10, 0, Some(1)).tracked_universe();
        let feed = SimulatedFeed::new(SimulatedFeedConfig::default(), &universe, clock(), Some(1));

        let err = feed.fetch(&universe[0]).await.unwrap_err();
        assert!(matches!(err, FetchError::Subscription(_)));

        feed.sync_subscriptions(&universe[..2]).await.unwrap();
        assert_eq!(feed.subscribed(), 2);

        let snapshot = feed.fetch(&universe[0]).await.unwrap();
        assert_eq!(snapshot.symbol_id, universe[0]);
        assert!(snapshot.last_price > Decimal::ZERO);
        assert!(snapshot.volume > Decimal::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_feed_enforces_vendor_limit() {
        let universe = simulated_universe(10, 0, Some(1)).tracked_universe();
        let config = SimulatedFeedConfig {
            subscription_limit: 3,
            ..Default::default()
        };
        let feed = SimulatedFeed::new(config, &universe, clock(), Some(1));

        let err = feed.sync_subscriptions(&universe[..4]).await.unwrap_err();
        assert!(matches!(err, FetchError::Subscription(_)));

        let err = feed
            .sync_subscriptions(&[SymbolId::from("NOPE")])
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::UnknownSymbol("NOPE".to_string()));
    }

    #[tokio::test]
    async fn test_scores_stay_in_unit_range() {
        let universe = simulated_universe(30, 0, Some(9)).tracked_universe();
        let fast = SimulatedScorer::new(ScorerKind::Fast, &universe, 0.0, Some(9));
        let deep = SimulatedScorer::new(ScorerKind::Deep, &universe, 0.0, Some(9));

        for symbol_id in &universe {
            let f = fast.score(symbol_id, None).await.unwrap();
            let d = deep.score(symbol_id, None).await.unwrap();
            assert!((0.0..=1.0).contains(&f));
            assert!((0.0..=1.0).contains(&d));
        }

        let err = deep.score(&SymbolId::from("NOPE"), None).await.unwrap_err();
        assert!(matches!(err, ScoreError::Unavailable(_)));
    }

    #[test]
    fn test_momentum_follows_change() {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
        let up = MarketSnapshot::new("A".into(), dec!(100), dec!(1), dec!(5), at);
        let down = MarketSnapshot::new("A".into(), dec!(100), dec!(1), dec!(-2.5), at);

        assert_eq!(SimulatedScorer::momentum(Some(&up)), 1.0);
        assert_eq!(SimulatedScorer::momentum(Some(&down)), 0.25);
        assert_eq!(SimulatedScorer::momentum(None), 0.5);
    }
}
