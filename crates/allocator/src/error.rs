//! Allocator errors
//!
//! Both variants are fatal: they indicate a concurrency or logic bug, not an
//! environmental failure. A full pool is *not* an error (see
//! [`Rejection::CapacityExceeded`](crate::Rejection)).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocatorError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Allocator halted after invariant violation: {0}")]
    Halted(String),
}

pub type Result<T> = std::result::Result<T, AllocatorError>;
