use argus_core::{MarketSnapshot, SymbolId};
use async_trait::async_trait;

use crate::error::FetchError;

/// Port for the live market-data feed
///
/// The allocator's admitted set *is* the subscription request: the pipeline
/// pushes it with `sync_subscriptions` at the start of every cycle, then
/// fetches each symbol's latest update.
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// Feed name for logging
    fn name(&self) -> &str {
        "MarketDataFeed"
    }

    /// Replace the live subscription set
    async fn sync_subscriptions(&self, symbols: &[SymbolId]) -> Result<(), FetchError>;

    /// Latest update for one subscribed symbol
    async fn fetch(&self, symbol_id: &SymbolId) -> Result<MarketSnapshot, FetchError>;
}
