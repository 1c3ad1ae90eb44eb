//! Simulation - Multi-session orchestration
//!
//! Ties together:
//! - An accelerated simulation clock
//! - The bootstrapped session loop
//! - The external event feed
//!
//! Between sessions the clock jumps straight to the next pre-open and the
//! loop rolls over; the allocator keeps its pool across the night.

use argus_clock::{SimulationClock, SystemClock};
use argus_core::Slot;
use argus_ports::{Clock, UniverseSource};
use argus_scheduler::{RunKind, SessionError, SessionIngress, SessionSummary};
use chrono::NaiveDate;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::bootstrap::{ArgusBootstrap, BootstrapError, session_windows};
use crate::config::RunnerConfig;
use crate::event_feed::{EventFeedConfig, SessionEventFeed};

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Bootstrap failed: {0}")]
    Bootstrap(#[from] BootstrapError),
    #[error("Session failed: {0}")]
    Session(#[from] SessionError),
}

/// Simulation results
#[derive(Debug, Clone, Default)]
pub struct SimulationResults {
    pub sessions: Vec<SessionSummary>,
    /// Allocator state after the last session
    pub final_snapshot: Vec<Slot>,
    /// Symbols with data in the store
    pub stored_symbols: usize,
    /// A session stopped before `Closed`
    pub stopped_early: bool,
}

impl SimulationResults {
    pub fn total_runs(&self, kind: RunKind) -> usize {
        self.sessions.iter().map(|s| s.count(kind)).sum()
    }

    pub fn total_cycles(&self) -> usize {
        self.sessions.iter().map(|s| s.pipeline_cycles).sum()
    }
}

/// Full accelerated simulation
pub struct SessionSimulation {
    config: RunnerConfig,
    clock: SimulationClock,
    first_date: NaiveDate,
    bootstrap: ArgusBootstrap,
}

impl SessionSimulation {
    pub fn with_config(config: RunnerConfig) -> Result<Self, SimulationError> {
        let offset = config.utc_offset().map_err(BootstrapError::from)?;
        let first_date = config
            .session
            .start_date
            .unwrap_or_else(|| SystemClock::new().now().with_timezone(&offset).date_naive());

        let windows = session_windows(&config, first_date)?;
        let clock = SimulationClock::fast(windows.session_start(), config.simulation.time_scale)
            .with_name("Simulation-Clock");
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let bootstrap = ArgusBootstrap::with_config(&config, shared, first_date)?;

        Ok(Self {
            config,
            clock,
            first_date,
            bootstrap,
        })
    }

    /// Handle for stopping the simulation from outside
    pub fn ingress(&self) -> SessionIngress {
        self.bootstrap.ingress.clone()
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    /// Real-time gap between events for the configured acceleration
    fn event_interval(&self) -> Duration {
        let sim = &self.config.simulation;
        Duration::from_secs(sim.event_interval_secs).div_f64(f64::from(sim.time_scale.max(1)))
    }

    /// Run every configured session back to back
    pub async fn run(&mut self) -> Result<SimulationResults, SimulationError> {
        let sim = &self.config.simulation;
        let feed_config = EventFeedConfig {
            universe: self.bootstrap.universe.tracked_universe(),
            preemption_share: sim.preemption_share,
            mean_interval: self.event_interval(),
            ..Default::default()
        };
        let mut feed = match sim.seed {
            Some(seed) => SessionEventFeed::with_seed(feed_config, seed),
            None => SessionEventFeed::new(feed_config),
        };
        let ingress = self.ingress();
        let feed_handle = tokio::spawn(async move { feed.run(ingress).await });

        let outcome = self.run_sessions().await;

        self.bootstrap.ingress.shutdown();
        feed_handle.abort();
        let sessions = outcome?;

        let results = SimulationResults {
            stopped_early: sessions.iter().any(|s| s.stopped_early),
            final_snapshot: self
                .bootstrap
                .allocator
                .snapshot()
                .map_err(SessionError::from)?,
            stored_symbols: self.bootstrap.store.len(),
            sessions,
        };
        info!(
            "[SIM] Finished {} sessions: {} cycles, {} slots occupied",
            results.sessions.len(),
            results.total_cycles(),
            results.final_snapshot.len()
        );
        Ok(results)
    }

    async fn run_sessions(&mut self) -> Result<Vec<SessionSummary>, SimulationError> {
        let mut sessions = Vec::new();
        let mut date = self.first_date;

        for index in 0..self.config.session.sessions {
            if index > 0 {
                let Some(next) = date.succ_opt() else {
                    warn!("[SIM] No calendar date after {}", date);
                    break;
                };
                date = next;
                let windows = session_windows(&self.config, date)?;
                // Skip the night
                self.clock.set_time(windows.session_start());
                self.bootstrap.scheduler.rollover(windows)?;
            }

            let summary = self.bootstrap.scheduler.run().await?;
            info!(
                "[SIM] Session {} ({}) ended in {}: {} scheduled, {} preempted, {} slots",
                summary.session_id,
                summary.date,
                summary.final_phase,
                summary.count(RunKind::Scheduled),
                summary.count(RunKind::Preempted),
                summary.final_snapshot.len()
            );
            let stopped = summary.stopped_early;
            sessions.push(summary);
            if stopped {
                break;
            }
        }
        Ok(sessions)
    }
}
