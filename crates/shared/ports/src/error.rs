use thiserror::Error;

/// Failures of a scoring collaborator
///
/// Always transient from the scheduler's point of view: the symbol keeps its
/// previous tier and is retried on the next scan.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("Score unavailable: {0}")]
    Unavailable(String),

    #[error("Scoring timed out")]
    Timeout,
}

/// Failures fetching market data for one symbol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Fetch timed out")]
    Timeout,

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Feed unavailable: {0}")]
    Unavailable(String),

    #[error("Subscription rejected: {0}")]
    Subscription(String),
}

/// Failures writing to the persistence store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Write failed: {0}")]
    Write(String),

    #[error("Store closed")]
    Closed,
}
