//! Argus Runner - Simulated Scheduling Sessions
//!
//! Wires the scheduler against in-process collaborators:
//!
//! - **Config**: one JSON document for every component
//! - **Simulated**: random-walk market feed and seeded scoring models
//! - **Event Feed**: preemption signals and position events
//! - **Bootstrap**: component wiring for one runner
//! - **Simulation**: accelerated multi-session orchestration
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────┐
//!   │   Event Feed    │  surges, executions, positions
//!   └────────┬────────┘
//!            │ SessionIngress
//!            ▼
//!   ┌─────────────────────────────────────────────┐
//!   │              SessionScheduler               │
//!   │  ScheduleController ─► Deep / Tier scanner  │
//!   └────────┬──────────────────────┬─────────────┘
//!            │ run_cycle            │ admit / release
//!            ▼                      ▼
//!   ┌─────────────────┐    ┌─────────────────┐
//!   │    Pipeline     │───►│  SlotAllocator  │
//!   │   Coordinator   │    └─────────────────┘
//!   └───┬─────────┬───┘
//!       │ fetch   │ persist
//!       ▼         ▼
//!   Simulated   In-memory
//!     Feed        Store  ◄── scanners read
//! ```

pub mod bootstrap;
pub mod config;
pub mod event_feed;
pub mod simulated;
pub mod simulation;

// Re-export main types
pub use bootstrap::{ArgusBootstrap, BootstrapError, session_windows};
pub use config::{
    ConfigError, RunnerConfig, SessionConfig, SimulationConfig, load_config, load_config_from_str,
    load_default_config,
};
pub use event_feed::{EventFeedConfig, FeedEvent, SessionEventFeed};
pub use simulated::{SimulatedFeed, SimulatedFeedConfig, SimulatedScorer, simulated_universe};
pub use simulation::{SessionSimulation, SimulationError, SimulationResults};
