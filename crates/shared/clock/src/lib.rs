//! Argus Clock Infrastructure
//!
//! Provides time abstractions for production and simulation:
//!
//! - [`SystemClock`]: wall-clock UTC time
//! - [`SimulationClock`]: starts at an arbitrary instant (e.g. the pre-open of
//!   a given trading day) and advances with tokio's clock, optionally scaled.
//!   Under `#[tokio::test(start_paused = true)]` it follows tokio's paused
//!   time, so whole sessions run deterministically in milliseconds.
//!
//! ## Usage
//!
//! ```ignore
//! use argus_clock::{SimulationClock, TimeScale};
//!
//! let clock = SimulationClock::at(session_start);
//! clock.set_time_scale(TimeScale::Fast(600)); // 10 simulated minutes per second
//! clock.advance(chrono::Duration::minutes(5)); // jump forward
//! ```

mod simulation;
mod system;

pub use simulation::{SimulationClock, TimeScale};
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use argus_ports::Clock;
