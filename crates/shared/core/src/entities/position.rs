use serde::{Deserialize, Serialize};

use crate::values::{Score, SymbolId};

/// External position lifecycle notice
///
/// `Opened` pins the symbol as `Held`; `Closed` (position fully sold)
/// releases its slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PositionEvent {
    Opened { symbol_id: SymbolId, score: Score },
    Closed { symbol_id: SymbolId },
}

impl PositionEvent {
    pub fn symbol_id(&self) -> &SymbolId {
        match self {
            PositionEvent::Opened { symbol_id, .. } | PositionEvent::Closed { symbol_id } => {
                symbol_id
            }
        }
    }
}
