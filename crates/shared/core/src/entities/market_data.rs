use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::values::{Price, Quantity, SymbolId, Timestamp};

/// Latest market data for one symbol, as fetched by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol_id: SymbolId,
    pub last_price: Price,
    /// Accumulated session volume
    pub volume: Quantity,
    /// Change versus previous close, in percent
    pub change_pct: Decimal,
    pub observed_at: Timestamp,
}

impl MarketSnapshot {
    pub fn new(
        symbol_id: SymbolId,
        last_price: Price,
        volume: Quantity,
        change_pct: Decimal,
        observed_at: Timestamp,
    ) -> Self {
        Self {
            symbol_id,
            last_price,
            volume,
            change_pct,
            observed_at,
        }
    }

    /// Traded value (price × volume)
    pub fn turnover(&self) -> Decimal {
        self.last_price * self.volume
    }
}
