//! Event Feed - External signals for a simulated session
//!
//! Stands in for the outside world that pushes into the scheduling loop:
//! - Price surges and execution notices (preemption signals)
//! - Position opens and closes (pin / release `Held` slots)

use argus_core::{PositionEvent, SymbolId};
use argus_scheduler::{PreemptionReason, SessionIngress};
use log::{debug, info};
use rand::Rng;
use rand::rngs::StdRng;
use std::time::Duration;
use tokio::sync::broadcast;

/// One generated external event
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Preempt(PreemptionReason),
    Position(PositionEvent),
}

/// Configuration for event feed simulation
#[derive(Debug, Clone)]
pub struct EventFeedConfig {
    /// Symbols events may name
    pub universe: Vec<SymbolId>,
    /// Share of events that are preemption signals
    pub preemption_share: f64,
    /// Open positions before the feed only closes
    pub max_open_positions: usize,
    /// Mean real-time gap between events
    pub mean_interval: Duration,
}

impl Default for EventFeedConfig {
    fn default() -> Self {
        Self {
            universe: Vec::new(),
            preemption_share: 0.7,
            max_open_positions: 5,
            mean_interval: Duration::from_secs(1),
        }
    }
}

/// Generates simulated external events
pub struct SessionEventFeed {
    config: EventFeedConfig,
    /// Symbols with an open position, in open order
    open_positions: Vec<SymbolId>,
    event_tx: broadcast::Sender<FeedEvent>,
    rng: StdRng,
}

impl SessionEventFeed {
    pub fn new(config: EventFeedConfig) -> Self {
        Self::with_rng(config, rand::SeedableRng::from_entropy())
    }

    /// Create with a specific seed for reproducible simulations
    pub fn with_seed(config: EventFeedConfig, seed: u64) -> Self {
        Self::with_rng(config, rand::SeedableRng::seed_from_u64(seed))
    }

    fn with_rng(config: EventFeedConfig, rng: StdRng) -> Self {
        let (event_tx, _) = broadcast::channel(1000);
        Self {
            config,
            open_positions: Vec::new(),
            event_tx,
            rng,
        }
    }

    /// Subscribe to generated events
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.event_tx.subscribe()
    }

    pub fn open_positions(&self) -> &[SymbolId] {
        &self.open_positions
    }

    /// Generate the next event, or `None` with an empty universe
    pub fn next_event(&mut self) -> Option<FeedEvent> {
        if self.config.universe.is_empty() {
            return None;
        }

        if self.rng.gen_bool(self.config.preemption_share) {
            let reason = if !self.open_positions.is_empty() && self.rng.gen_bool(0.3) {
                let pick = self.rng.gen_range(0..self.open_positions.len());
                PreemptionReason::ExecutionNotice(self.open_positions[pick].clone())
            } else {
                PreemptionReason::PriceSurge(self.pick_symbol())
            };
            return Some(FeedEvent::Preempt(reason));
        }

        let close = !self.open_positions.is_empty()
            && (self.open_positions.len() >= self.config.max_open_positions
                || self.rng.gen_bool(0.5));
        let event = if close {
            let pick = self.rng.gen_range(0..self.open_positions.len());
            PositionEvent::Closed {
                symbol_id: self.open_positions.remove(pick),
            }
        } else {
            let symbol_id = self.pick_symbol();
            if !self.open_positions.contains(&symbol_id) {
                self.open_positions.push(symbol_id.clone());
            }
            PositionEvent::Opened {
                symbol_id,
                score: self.rng.gen_range(0.5..1.0),
            }
        };
        Some(FeedEvent::Position(event))
    }

    fn pick_symbol(&mut self) -> SymbolId {
        let pick = self.rng.gen_range(0..self.config.universe.len());
        self.config.universe[pick].clone()
    }

    /// Generate and broadcast the next event
    pub fn tick(&mut self) -> Option<FeedEvent> {
        let event = self.next_event()?;
        // No subscribers is fine
        let _ = self.event_tx.send(event.clone());
        Some(event)
    }

    /// Push events into the session until it stops listening
    pub async fn run(&mut self, ingress: SessionIngress) {
        let mut sent = 0usize;
        loop {
            let jitter: f64 = self.rng.gen_range(0.5..1.5);
            tokio::time::sleep(self.config.mean_interval.mul_f64(jitter)).await;

            if *ingress.shutdown.borrow() {
                break;
            }
            let Some(event) = self.tick() else {
                break;
            };

            debug!("[EVENT] {:?}", event);
            let delivered = match event {
                FeedEvent::Preempt(reason) => ingress.preemption.request(reason).await.is_ok(),
                FeedEvent::Position(position) => ingress.positions.send(position).await.is_ok(),
            };
            if !delivered {
                break;
            }
            sent += 1;
        }
        info!("[EVENT] Feed stopped after {} events", sent);
    }
}
