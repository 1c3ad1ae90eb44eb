mod market_data;
mod position;
mod scan;
mod slot;
mod tier;

pub use market_data::MarketSnapshot;
pub use position::PositionEvent;
pub use scan::{ScanEntry, ScanResult};
pub use slot::Slot;
pub use tier::Tier;
