//! Bootstrap - Component wiring for one runner
//!
//! Builds every component from a [`RunnerConfig`] in dependency order:
//! - Allocator and the single-writer market store
//! - Simulated feed feeding the pipeline coordinator
//! - Both scanners over the shared allocator and store reader
//! - Controller, input channels and the session loop

use argus_allocator::SlotAllocator;
use argus_pipeline::{InMemoryMarketStore, InMemoryStoreReader, PipelineCoordinator};
use argus_ports::{Clock, ScorerKind, StaticUniverse, UniverseSource};
use argus_scheduler::{
    DeepScanner, ScanError, ScheduleController, ScheduleError, SessionIngress, SessionScheduler,
    SessionWindows, TierScanner, session_channels,
};
use chrono::NaiveDate;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::{ConfigError, RunnerConfig};
use crate::simulated::{SimulatedFeed, SimulatedFeedConfig, SimulatedScorer, simulated_universe};

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("Scanner error: {0}")]
    Scan(#[from] ScanError),
}

/// Pin the configured template to `date`
pub fn session_windows(
    config: &RunnerConfig,
    date: NaiveDate,
) -> Result<SessionWindows, BootstrapError> {
    let offset = config.utc_offset()?;
    Ok(SessionWindows::build(date, offset, &config.session.template)?)
}

/// Fully wired runner, ready to drive sessions
pub struct ArgusBootstrap {
    pub scheduler: SessionScheduler,
    /// Upstream side of the loop's channels
    pub ingress: SessionIngress,
    pub allocator: Arc<SlotAllocator>,
    pub pipeline: Arc<PipelineCoordinator>,
    pub store: InMemoryStoreReader,
    pub universe: Arc<StaticUniverse>,
}

impl ArgusBootstrap {
    /// Wire all components for a session starting on `date`
    pub fn with_config(
        config: &RunnerConfig,
        clock: Arc<dyn Clock>,
        date: NaiveDate,
    ) -> Result<Self, BootstrapError> {
        config.validate()?;
        let sim = &config.simulation;

        let universe = Arc::new(simulated_universe(
            sim.universe_size,
            sim.watch_list_size,
            sim.seed,
        ));
        let tracked = universe.tracked_universe();

        let allocator = Arc::new(SlotAllocator::new(config.allocator.clone()));
        let (writer, store) = InMemoryMarketStore::open();
        let reader = Arc::new(store.clone());

        let feed = Arc::new(SimulatedFeed::new(
            SimulatedFeedConfig {
                subscription_limit: config.allocator.capacity,
                latency: Duration::from_millis(sim.fetch_latency_ms),
                failure_rate: sim.fetch_failure_rate,
                ..Default::default()
            },
            &tracked,
            Arc::clone(&clock),
            sim.seed,
        ));
        let pipeline = Arc::new(PipelineCoordinator::new(
            config.pipeline.clone(),
            Arc::clone(&allocator),
            feed,
            Box::new(writer),
            Arc::clone(&clock),
        ));

        let deep_scanner = DeepScanner::new(
            config.deep_scanner.clone(),
            Arc::new(SimulatedScorer::new(
                ScorerKind::Deep,
                &tracked,
                sim.score_failure_rate,
                sim.seed,
            )),
            Arc::clone(&allocator),
            universe.clone(),
            reader.clone(),
        )?;
        let tier_scanner = TierScanner::new(
            config.tier_scanner.clone(),
            Arc::new(SimulatedScorer::new(
                ScorerKind::Fast,
                &tracked,
                sim.score_failure_rate,
                sim.seed,
            )),
            Arc::clone(&allocator),
            universe.clone(),
            reader,
        )?;

        let windows = session_windows(config, date)?;
        let (ingress, channels) = session_channels(config.session.channel_capacity);
        let scheduler = SessionScheduler::new(
            ScheduleController::new(windows),
            tier_scanner,
            deep_scanner,
            Arc::clone(&pipeline),
            Arc::clone(&allocator),
            clock,
            channels,
        );

        info!(
            "[BOOT] Wired session {} for {}: {} slots, {} tracked, {} watched",
            scheduler.session_id(),
            date,
            allocator.capacity(),
            tracked.len(),
            universe.watch_list().len()
        );

        Ok(Self {
            scheduler,
            ingress,
            allocator,
            pipeline,
            store,
            universe,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_default_config;
    use argus_clock::SimulationClock;
    use argus_scheduler::SessionPhase;
    use chrono::{TimeZone, Utc};

    fn clock() -> Arc<dyn Clock> {
        Arc::new(SimulationClock::at(
            Utc.with_ymd_and_hms(2024, 3, 3, 23, 0, 0).unwrap(),
        ))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn test_session_windows_use_offset() {
        let config = load_default_config().unwrap();
        let windows = session_windows(&config, date()).unwrap();

        // 08:00 at UTC+9 is 23:00 UTC the day before
        assert_eq!(
            windows.session_start(),
            Utc.with_ymd_and_hms(2024, 3, 3, 23, 0, 0).unwrap()
        );
        assert_eq!(windows.windows()[0].phase, SessionPhase::PreOpen);
    }

    #[tokio::test]
    async fn test_bootstrap_wires_components() {
        let config = load_default_config().unwrap();
        let bootstrap = ArgusBootstrap::with_config(&config, clock(), date()).unwrap();

        assert_eq!(bootstrap.allocator.capacity(), config.allocator.capacity);
        assert!(bootstrap.allocator.is_empty());
        assert!(bootstrap.store.is_empty());
        assert_eq!(bootstrap.universe.tracked_universe().len(), 120);
        assert_eq!(bootstrap.scheduler.controller().phase(), SessionPhase::PreOpen);
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_invalid_config() {
        let mut config = load_default_config().unwrap();
        config.tier_scanner.demotion_threshold = 0.9;

        let result = ArgusBootstrap::with_config(&config, clock(), date());
        assert!(matches!(
            result,
            Err(BootstrapError::Config(ConfigError::Scanner(_)))
        ));
    }
}
