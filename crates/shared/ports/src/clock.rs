use argus_core::Timestamp;

/// Port for time abstraction
///
/// This allows the system to use different time sources:
/// - Real system time for production
/// - Scaled or paused time for simulation and deterministic tests
pub trait Clock: Send + Sync {
    /// Get the current time according to this clock
    fn now(&self) -> Timestamp;

    /// Get the clock's name/identifier for debugging
    fn name(&self) -> &str {
        "Clock"
    }

    /// Real (tokio) time to wait until this clock reads `deadline`
    ///
    /// Zero when the deadline has already passed. Scaled clocks override this.
    fn wall_duration_until(&self, deadline: Timestamp) -> std::time::Duration {
        (deadline - self.now()).to_std().unwrap_or_default()
    }
}
