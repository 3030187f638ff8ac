//! Arc class table
//!
//! Every road referenced from a partition lands in one of four categories.
//! Roads get a dense index inside their category and the stored index is
//! the size of all earlier categories plus that local index, so the category
//! order below is part of the on-disk contract.

use rustc_hash::FxHashMap;

use crate::error::{NetError, Result};
use crate::road::{RoadDef, RoadId};

/// Entries one table can address.
pub const MAX_ARC_CLASSES: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArcCategory {
    Roundabout,
    Unpaved,
    Ferry,
    Paved,
}

impl ArcCategory {
    pub const ORDER: [ArcCategory; 4] = [
        ArcCategory::Roundabout,
        ArcCategory::Unpaved,
        ArcCategory::Ferry,
        ArcCategory::Paved,
    ];

    pub fn of(def: &RoadDef) -> Self {
        if def.roundabout {
            ArcCategory::Roundabout
        } else if def.ferry {
            ArcCategory::Ferry
        } else if def.paved {
            ArcCategory::Paved
        } else {
            ArcCategory::Unpaved
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Building,
    Frozen,
}

#[derive(Debug, Clone)]
pub struct ArcClassTable {
    state: TableState,
    entries: FxHashMap<RoadId, (ArcCategory, usize)>,
    sizes: [usize; 4],
}

impl Default for ArcClassTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ArcClassTable {
    pub fn new() -> Self {
        Self {
            state: TableState::Building,
            entries: FxHashMap::default(),
            sizes: [0; 4],
        }
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn category_len(&self, category: ArcCategory) -> usize {
        self.sizes[category.slot()]
    }

    /// Add a road; registering the same road again is a no-op.
    pub fn register(&mut self, road: RoadId, def: &RoadDef) -> Result<()> {
        if self.state == TableState::Frozen {
            return Err(NetError::Frozen(road));
        }
        if self.entries.contains_key(&road) {
            return Ok(());
        }
        if self.entries.len() >= MAX_ARC_CLASSES {
            return Err(NetError::CapacityOverflow {
                what: "arc class table",
                limit: MAX_ARC_CLASSES,
            });
        }
        let category = ArcCategory::of(def);
        let local = self.sizes[category.slot()];
        self.sizes[category.slot()] += 1;
        self.entries.insert(road, (category, local));
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.state = TableState::Frozen;
    }

    /// Stored index of `road`. The first call freezes the table.
    pub fn index(&mut self, road: RoadId) -> Result<u8> {
        if self.entries.is_empty() {
            return Err(NetError::EmptyTable);
        }
        self.freeze();
        self.lookup(road)
    }

    /// Stored index of `road` in a frozen table.
    pub fn lookup(&self, road: RoadId) -> Result<u8> {
        if self.state != TableState::Frozen {
            return Err(NetError::NotFrozen);
        }
        let &(category, local) = self.entries.get(&road).ok_or(NetError::UnknownRoad(road))?;
        let preceding: usize = self.sizes[..category.slot()].iter().sum();
        // register caps the table at 256 entries
        Ok((preceding + local) as u8)
    }
}
