//! Argus Slot Allocator
//!
//! Owns the fixed-capacity pool of live-subscription slots. Every symbol that
//! receives a live feed holds exactly one slot, tagged with a priority tier:
//!
//! ```text
//!             admit(symbol, tier, score)
//!                        │
//!                        ▼
//!   ┌──────────────── SlotAllocator ─────────────────┐
//!   │  free slot?  ──yes──► Admitted                 │
//!   │      │no                                       │
//!   │      ▼                                         │
//!   │  EvictionPolicy::select_victim(occupants, tier)│
//!   │      │some                        │none        │
//!   │      ▼                            ▼            │
//!   │  Evicted(victim)      Rejected(CapacityExceeded)│
//!   └────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!     snapshot() ──► pipeline fetch list, scanners
//! ```
//!
//! All operations run under a single lock, so eviction-then-admit is observed
//! as one step and `|slots| ≤ capacity` holds for every reader.
//!
//! ## Tiers
//!
//! | Tier | Source | Eviction |
//! |------|--------|----------|
//! | `Held` | open positions | only for another `Held` on an all-`Held` pool |
//! | `Shortlisted` | deep scan | for `Held`/`Shortlisted` requests |
//! | `Surge` | tier scan | first to go |

pub mod allocator;
pub mod config;
pub mod diff;
pub mod error;
pub mod eviction;

// Re-export main types
pub use allocator::{Admission, AllocationEvent, Rejection, Release, SlotAllocator};
pub use config::AllocatorConfig;
pub use diff::SnapshotDiff;
pub use error::{AllocatorError, Result};
pub use eviction::{EvictionPolicy, RankedEviction, TieBreak};
