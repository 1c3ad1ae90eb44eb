use argus_allocator::AllocatorError;
use argus_pipeline::PipelineError;
use argus_core::Timestamp;
use chrono::NaiveTime;
use thiserror::Error;

use crate::phase::SessionPhase;

/// Invalid session calendars
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Window template is empty")]
    NoWindows,

    #[error("{0} window ends before it starts")]
    EmptyWindow(SessionPhase),

    #[error("{0} window is out of session order")]
    OutOfOrder(SessionPhase),

    #[error("Gap between {before} and {after}")]
    Gap {
        before: SessionPhase,
        after: SessionPhase,
    },

    #[error("{before} and {after} overlap")]
    Overlap {
        before: SessionPhase,
        after: SessionPhase,
    },

    #[error("{0} window needs a positive scan interval")]
    MissingInterval(SessionPhase),

    #[error("Deep scan at {0} is outside the PreOpen window")]
    DeepScanOutsidePreOpen(NaiveTime),

    #[error("Local time {0} does not exist at the session offset")]
    LocalTime(NaiveTime),

    #[error("Next session starts at {next_start}, before the current one ends at {current_end}")]
    RolloverBackwards {
        current_end: Timestamp,
        next_start: Timestamp,
    },
}

/// Scanner failures
///
/// Score timeouts and unavailable scores are reported per symbol, never here.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Allocator error: {0}")]
    Allocator(#[from] AllocatorError),

    #[error("Invalid scanner config: {0}")]
    InvalidConfig(String),
}

/// Fatal scheduling-loop failures
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Allocator error: {0}")]
    Allocator(#[from] AllocatorError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Raised when the scheduling loop no longer listens for preemptions
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Preemption channel closed")]
pub struct PreemptionClosed;

pub type Result<T> = std::result::Result<T, SessionError>;
