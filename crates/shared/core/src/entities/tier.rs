use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority class of an admitted symbol
///
/// Lower priority number = more important:
/// - `Held` (1): an existing committed position
/// - `Shortlisted` (2): produced by the once-per-session deep scan
/// - `Surge` (3): produced by the fast tier scan, first to be evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Held,
    Shortlisted,
    Surge,
}

impl Tier {
    /// All tiers, most important first
    pub const ALL: [Tier; 3] = [Tier::Held, Tier::Shortlisted, Tier::Surge];

    /// Ordinal priority number (1 = most important)
    pub fn priority(&self) -> u8 {
        match self {
            Tier::Held => 1,
            Tier::Shortlisted => 2,
            Tier::Surge => 3,
        }
    }

    /// Strictly more important than `other`
    pub fn outranks(&self, other: Tier) -> bool {
        self.priority() < other.priority()
    }

    /// Whether an occupant of this tier may be evicted for a request of `requesting`
    ///
    /// Only occupants of equal or lower importance are candidates.
    pub fn yields_to(&self, requesting: Tier) -> bool {
        self.priority() >= requesting.priority()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Held => "Held",
            Tier::Shortlisted => "Shortlisted",
            Tier::Surge => "Surge",
        };
        f.write_str(name)
    }
}
