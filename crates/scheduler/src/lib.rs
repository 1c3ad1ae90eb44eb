//! Argus Scheduler
//!
//! Decides *when* the pool is re-evaluated:
//!
//! ```text
//!            clock readings
//!                  │
//!                  ▼
//!      ┌───────────────────────┐      preemption signals
//!      │  ScheduleController   │◄──── (safe points only)
//!      │  PreOpen → ... Closed │
//!      └─────┬───────────┬─────┘
//!   once/day │           │ per-phase interval
//!            ▼           ▼
//!     ┌────────────┐ ┌────────────┐
//!     │DeepScanner │ │TierScanner │◄── pipeline cycle (fresh data)
//!     │Shortlisted │ │   Surge    │
//!     └─────┬──────┘ └─────┬──────┘
//!           └──────┬───────┘
//!                  ▼
//!            SlotAllocator
//! ```
//!
//! | Phase        | Tier scan | Notes                          |
//! |--------------|-----------|--------------------------------|
//! | PreOpen      | none      | deep scan at the fixed trigger |
//! | HighActivity | short     |                                |
//! | LowActivity  | long      |                                |
//! | TrendConfirm | medium    |                                |
//! | FinalWindow  | short     |                                |
//! | Closed       | none      | pool retained                  |

pub mod controller;
pub mod deep_scanner;
pub mod error;
pub mod phase;
pub mod preemption;
mod scoring;
pub mod session;
pub mod tier_scanner;
pub mod window;

// Re-export main types
pub use controller::ScheduleController;
pub use deep_scanner::{DeepScanReport, DeepScanner, DeepScannerConfig};
pub use error::{PreemptionClosed, Result, ScanError, ScheduleError, SessionError};
pub use phase::{PhaseTransition, SessionPhase};
pub use preemption::{
    Preemption, PreemptionReason, PreemptionReceiver, PreemptionSender, preemption_channel,
};
pub use session::{
    RunKind, RunRecord, SessionChannels, SessionIngress, SessionScheduler, SessionSummary,
    session_channels,
};
pub use tier_scanner::{TierScanReport, TierScanner, TierScannerConfig};
pub use window::{ScheduleWindow, SessionWindows, WindowSpec, WindowTemplate};
