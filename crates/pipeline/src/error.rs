//! Pipeline errors
//!
//! Per-symbol fetch and persist failures are not errors at this level; they
//! are reported in the [`CycleReport`](crate::CycleReport). Only a broken
//! allocator aborts a cycle.

use argus_allocator::AllocatorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Allocator error: {0}")]
    Allocator(#[from] AllocatorError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
