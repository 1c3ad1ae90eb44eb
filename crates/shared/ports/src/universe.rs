use argus_core::SymbolId;

/// Port for the symbol universe
pub trait UniverseSource: Send + Sync {
    /// Every tracked symbol (deep scan input)
    fn tracked_universe(&self) -> Vec<SymbolId>;

    /// External watch list fed into every tier scan
    fn watch_list(&self) -> Vec<SymbolId>;
}

/// Fixed universe and watch list
#[derive(Debug, Clone, Default)]
pub struct StaticUniverse {
    universe: Vec<SymbolId>,
    watch_list: Vec<SymbolId>,
}

impl StaticUniverse {
    pub fn new(universe: Vec<SymbolId>, watch_list: Vec<SymbolId>) -> Self {
        Self {
            universe,
            watch_list,
        }
    }
}

impl UniverseSource for StaticUniverse {
    fn tracked_universe(&self) -> Vec<SymbolId> {
        self.universe.clone()
    }

    fn watch_list(&self) -> Vec<SymbolId> {
        self.watch_list.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_universe() {
        let universe = StaticUniverse::new(
            vec!["A".into(), "B".into(), "C".into()],
            vec!["B".into()],
        );
        assert_eq!(universe.tracked_universe().len(), 3);
        assert_eq!(universe.watch_list(), vec![SymbolId::from("B")]);
    }
}
