//! Runner configuration
//!
//! One JSON document covers every component. Missing sections and fields
//! fall back to their defaults; the embedded `default_config.json` is the
//! reference layout.

use argus_allocator::AllocatorConfig;
use argus_pipeline::PipelineConfig;
use argus_scheduler::{
    DeepScannerConfig, ScanError, ScheduleError, TierScannerConfig, WindowTemplate,
};
use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid UTC offset: {0}s")]
    InvalidOffset(i32),
    #[error("Invalid session template: {0}")]
    Schedule(#[from] ScheduleError),
    #[error("Invalid scanner config: {0}")]
    Scanner(#[from] ScanError),
    #[error("Invalid allocator config: {0}")]
    Allocator(String),
    #[error("Invalid pipeline config: {0}")]
    Pipeline(String),
    #[error("Invalid simulation config: {0}")]
    Simulation(String),
}

/// Session calendar settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Exchange offset from UTC, seconds east
    pub utc_offset_secs: i32,
    /// First session date; defaults to today in the exchange offset
    pub start_date: Option<NaiveDate>,
    /// Consecutive sessions to run
    pub sessions: u32,
    /// Buffer size of the preemption and position channels
    pub channel_capacity: usize,
    pub template: WindowTemplate,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            utc_offset_secs: 9 * 3600,
            start_date: None,
            sessions: 1,
            channel_capacity: 256,
            template: WindowTemplate::default(),
        }
    }
}

/// Simulated collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
    /// Simulated seconds per real second
    pub time_scale: u32,
    /// Tracked universe size
    pub universe_size: usize,
    /// External watch list size
    pub watch_list_size: usize,
    /// Simulated feed latency per fetch (ms)
    pub fetch_latency_ms: u64,
    /// Probability a fetch fails
    pub fetch_failure_rate: f64,
    /// Probability a score call fails
    pub score_failure_rate: f64,
    /// Mean simulated seconds between external events
    pub event_interval_secs: u64,
    /// Share of events that are preemption signals (rest are position events)
    pub preemption_share: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: Some(7),
            time_scale: 600,
            universe_size: 120,
            watch_list_size: 8,
            fetch_latency_ms: 2,
            fetch_failure_rate: 0.02,
            score_failure_rate: 0.01,
            event_interval_secs: 600,
            preemption_share: 0.7,
        }
    }
}

/// Complete runner configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub session: SessionConfig,
    pub allocator: AllocatorConfig,
    pub tier_scanner: TierScannerConfig,
    pub deep_scanner: DeepScannerConfig,
    pub pipeline: PipelineConfig,
    pub simulation: SimulationConfig,
}

/// Load runner configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunnerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<RunnerConfig, ConfigError> {
    let config: RunnerConfig = serde_json::from_str(json)?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<RunnerConfig, ConfigError> {
    let default_config = include_str!("default_config.json");
    load_config_from_str(default_config)
}

impl RunnerConfig {
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.session.utc_offset_secs)
            .ok_or(ConfigError::InvalidOffset(self.session.utc_offset_secs))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.utc_offset()?;
        self.session.template.validate()?;
        self.tier_scanner.validate()?;
        self.deep_scanner.validate()?;

        if self.allocator.capacity == 0 {
            return Err(ConfigError::Allocator("capacity must be positive".to_string()));
        }
        if self.deep_scanner.shortlist_size > self.allocator.capacity {
            return Err(ConfigError::Allocator(format!(
                "shortlist of {} cannot fit {} slots",
                self.deep_scanner.shortlist_size, self.allocator.capacity
            )));
        }
        if self.pipeline.max_in_flight == 0 || self.pipeline.fetch_timeout_ms == 0 {
            return Err(ConfigError::Pipeline(
                "fetch timeout and max_in_flight must be positive".to_string(),
            ));
        }

        let sim = &self.simulation;
        for (name, rate) in [
            ("fetch_failure_rate", sim.fetch_failure_rate),
            ("score_failure_rate", sim.score_failure_rate),
            ("preemption_share", sim.preemption_share),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Simulation(format!("{} {} outside [0, 1]", name, rate)));
            }
        }
        if sim.universe_size == 0 || sim.watch_list_size > sim.universe_size {
            return Err(ConfigError::Simulation(format!(
                "watch list of {} from a universe of {}",
                sim.watch_list_size, sim.universe_size
            )));
        }
        if sim.time_scale == 0 {
            return Err(ConfigError::Simulation("time_scale must be positive".to_string()));
        }
        if sim.event_interval_secs == 0 {
            return Err(ConfigError::Simulation(
                "event_interval_secs must be positive".to_string(),
            ));
        }
        if self.session.sessions == 0 {
            return Err(ConfigError::Simulation("sessions must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_scheduler::SessionPhase;

    #[test]
    fn test_load_default_config() {
        let config = load_default_config().unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.allocator.capacity, 40);
        assert_eq!(config.session.template.windows.len(), 5);
        assert_eq!(config.session.template.windows[0].phase, SessionPhase::PreOpen);
    }

    #[test]
    fn test_default_json_matches_defaults() {
        let config = load_default_config().unwrap();
        assert_eq!(config, RunnerConfig::default());

        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(load_config_from_str(&json).unwrap(), config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = load_config_from_str(r#"{ "allocator": { "capacity": 10 } }"#).unwrap();
        assert_eq!(config.allocator.capacity, 10);
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.session.sessions, 1);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = RunnerConfig::default();
        config.deep_scanner.shortlist_size = 50;
        assert!(matches!(config.validate(), Err(ConfigError::Allocator(_))));

        let mut config = RunnerConfig::default();
        config.session.utc_offset_secs = 30 * 3600;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidOffset(_))));

        let mut config = RunnerConfig::default();
        config.session.template.windows.remove(2);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Schedule(ScheduleError::Gap { .. }))
        ));

        let mut config = RunnerConfig::default();
        config.simulation.fetch_failure_rate = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Simulation(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_config("/nonexistent/argus.json"),
            Err(ConfigError::IoError(_))
        ));
    }
}
