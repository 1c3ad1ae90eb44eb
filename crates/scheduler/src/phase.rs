use argus_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading-session phase
///
/// Declaration order is session order: the controller only ever moves to a
/// later variant within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Before the open; the deep scan fires here
    PreOpen,
    /// Opening rush, short scan interval
    HighActivity,
    /// Midday lull, long scan interval
    LowActivity,
    /// Afternoon trend confirmation, medium interval
    TrendConfirm,
    /// Run-up to the close, short interval
    FinalWindow,
    /// Session over, no further scans
    Closed,
}

impl SessionPhase {
    /// Phases that may appear in a window template, in session order
    pub const WINDOWED: [SessionPhase; 5] = [
        SessionPhase::PreOpen,
        SessionPhase::HighActivity,
        SessionPhase::LowActivity,
        SessionPhase::TrendConfirm,
        SessionPhase::FinalWindow,
    ];

    /// Whether the tier scanner runs during this phase
    pub fn is_scanning(&self) -> bool {
        !matches!(self, SessionPhase::PreOpen | SessionPhase::Closed)
    }

    pub fn is_terminal(&self) -> bool {
        *self == SessionPhase::Closed
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::PreOpen => "PreOpen",
            SessionPhase::HighActivity => "HighActivity",
            SessionPhase::LowActivity => "LowActivity",
            SessionPhase::TrendConfirm => "TrendConfirm",
            SessionPhase::FinalWindow => "FinalWindow",
            SessionPhase::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// A forward move of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: SessionPhase,
    pub to: SessionPhase,
    /// Clock reading that observed the move
    pub at: Timestamp,
}

impl fmt::Display for PhaseTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} at {}", self.from, self.to, self.at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order_is_session_order() {
        assert!(SessionPhase::PreOpen < SessionPhase::HighActivity);
        assert!(SessionPhase::FinalWindow < SessionPhase::Closed);
        assert!(SessionPhase::WINDOWED.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_scanning_phases() {
        assert!(!SessionPhase::PreOpen.is_scanning());
        assert!(SessionPhase::LowActivity.is_scanning());
        assert!(!SessionPhase::Closed.is_scanning());
        assert!(SessionPhase::Closed.is_terminal());
    }
}
