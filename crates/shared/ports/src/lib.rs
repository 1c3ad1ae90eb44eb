//! Argus Ports
//!
//! Port definitions (traits) for the Argus scheduler.
//! These define the boundaries between the scheduling core and its
//! collaborators: time, scoring models, the market-data feed, the
//! persistence store, and the symbol universe.

mod clock;
mod error;
mod market_data;
mod scorer;
mod store;
mod universe;

pub use clock::Clock;
pub use error::{FetchError, ScoreError, StoreError};
pub use market_data::MarketDataFeed;
pub use scorer::{Scorer, ScorerKind};
pub use store::{MarketStoreReader, MarketStoreWriter};
pub use universe::{StaticUniverse, UniverseSource};
