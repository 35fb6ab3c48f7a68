use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tillstock_core::{DomainError, DomainResult, Entity, StockLineId, StockTypeId};

/// Input for a new stock line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockLine {
    pub name: String,
    pub location: String,
    /// Display capacity. `None` means "sold from the backroom": such lines
    /// never take part in auto-allocation.
    pub capacity: Option<u32>,
}

/// A sale position (a beer pump, a fridge shelf) stock items go on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    id: StockLineId,
    name: String,
    location: String,
    capacity: Option<u32>,
}

impl StockLine {
    pub fn new(id: StockLineId, input: NewStockLine) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("stock line name cannot be empty"));
        }
        if input.capacity == Some(0) {
            return Err(DomainError::validation(
                "display capacity must be positive or unset",
            ));
        }
        Ok(Self {
            id,
            name,
            location: input.location.trim().to_string(),
            capacity: input.capacity,
        })
    }

    pub fn id_typed(&self) -> StockLineId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn capacity(&self) -> Option<u32> {
        self.capacity
    }

    /// Lines with a display capacity are auto-allocation targets.
    pub fn has_display(&self) -> bool {
        self.capacity.is_some()
    }
}

impl Entity for StockLine {
    type Id = StockLineId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Historical record of which stock types have been put on which lines.
///
/// Entries are only ever added. Auto-allocation routes an item to a line only
/// if its stock type appears here for that line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeLog {
    entries: BTreeSet<(StockLineId, StockTypeId)>,
}

impl TypeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the pair was new.
    pub fn record(&mut self, line: StockLineId, stock_type: StockTypeId) -> bool {
        self.entries.insert((line, stock_type))
    }

    pub fn accepts(&self, line: StockLineId, stock_type: StockTypeId) -> bool {
        self.entries.contains(&(line, stock_type))
    }

    pub fn types_for(&self, line: StockLineId) -> impl Iterator<Item = StockTypeId> + '_ {
        self.entries
            .range((line, StockTypeId::new(0))..=(line, StockTypeId::new(u64::MAX)))
            .map(|(_, t)| *t)
    }

    pub fn merge(&mut self, other: &TypeLog) {
        self.entries.extend(other.entries.iter().copied());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
