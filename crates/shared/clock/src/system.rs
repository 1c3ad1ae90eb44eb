use argus_core::Timestamp;
use argus_ports::Clock;
use chrono::Utc;

/// Wall-clock UTC time for live sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn name(&self) -> &str {
        "SystemClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_system_clock_tracks_wall_time() {
        let clock = SystemClock::new();
        let before = Utc::now();
        let now = clock.now();
        assert!(now >= before);
        assert!(now - before < Duration::seconds(1));
    }

    #[test]
    fn test_wait_until_near_deadline() {
        let clock = SystemClock::new();
        let wait = clock.wall_duration_until(clock.now() + Duration::seconds(5));
        assert!(wait <= std::time::Duration::from_secs(5));
        assert!(wait > std::time::Duration::from_secs(4));
    }
}
