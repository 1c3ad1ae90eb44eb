use argus_core::Timestamp;
use argus_ports::Clock;
use chrono::Duration;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::time::Instant;

/// Time scale modes for simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeScale {
    /// Real-time (1:1 ratio with tokio time)
    #[default]
    Normal,
    /// Accelerated time (multiplier applied to elapsed time)
    Fast(u32),
}

impl TimeScale {
    fn multiplier(&self) -> u32 {
        match self {
            TimeScale::Normal => 1,
            TimeScale::Fast(0) => 1,
            TimeScale::Fast(m) => *m,
        }
    }
}

#[derive(Debug)]
struct ClockState {
    /// Simulated time at the anchor
    simulated_ref: Timestamp,
    /// Tokio instant the reference was taken at
    anchor: Instant,
    scale: TimeScale,
}

impl ClockState {
    fn now(&self) -> Timestamp {
        let elapsed = self.anchor.elapsed() * self.scale.multiplier();
        self.simulated_ref + Duration::from_std(elapsed).unwrap_or_else(|_| Duration::zero())
    }
}

/// Simulated session clock driven by tokio's time source
///
/// Cloning shares the underlying clock.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    inner: Arc<RwLock<ClockState>>,
    name: String,
}

impl SimulationClock {
    /// Create a real-time clock reading `start` right now
    pub fn at(start: Timestamp) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ClockState {
                simulated_ref: start,
                anchor: Instant::now(),
                scale: TimeScale::Normal,
            })),
            name: "SimulationClock".to_string(),
        }
    }

    /// Create an accelerated clock reading `start` right now
    pub fn fast(start: Timestamp, multiplier: u32) -> Self {
        let clock = Self::at(start);
        clock.set_time_scale(TimeScale::Fast(multiplier));
        clock
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Change the time scale, preserving continuity of the simulated time
    pub fn set_time_scale(&self, scale: TimeScale) {
        let mut state = self.inner.write();
        let current = state.now();
        state.simulated_ref = current;
        state.anchor = Instant::now();
        state.scale = scale;
    }

    pub fn time_scale(&self) -> TimeScale {
        self.inner.read().scale
    }

    /// Jump the simulated time forward
    pub fn advance(&self, duration: Duration) {
        let mut state = self.inner.write();
        state.simulated_ref += duration;
    }

    /// Explicitly set the simulated time
    ///
    /// Warning: this can move time backwards. Use only between sessions.
    pub fn set_time(&self, time: Timestamp) {
        let mut state = self.inner.write();
        state.simulated_ref = time;
        state.anchor = Instant::now();
    }
}

impl Clock for SimulationClock {
    fn now(&self) -> Timestamp {
        self.inner.read().now()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn wall_duration_until(&self, deadline: Timestamp) -> std::time::Duration {
        let state = self.inner.read();
        let remaining = (deadline - state.now()).to_std().unwrap_or_default();
        // Round up: a wait that truncates to zero would never reach the deadline
        let nanos = remaining
            .as_nanos()
            .div_ceil(u128::from(state.scale.multiplier()));
        std::time::Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}
