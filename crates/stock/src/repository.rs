use chrono::{DateTime, Utc};

use tillstock_core::{DeliveryId, DomainResult, StockItemId, StockLineId};
use tillstock_delivery::FinishCode;

/// One (stock item, stock line) pairing the allocation pass may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AllocationCandidate {
    pub item: StockItemId,
    pub line: StockLineId,
    pub delivery: DeliveryId,
}

/// A stock item currently on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemOnSale {
    pub item: StockItemId,
    pub line: StockLineId,
    pub delivery: DeliveryId,
}

/// What the allocation and purge passes need from storage.
pub trait StockRepository {
    /// Pairs matching the auto-allocation rules, optionally restricted to one
    /// delivery. Order does not matter; the pass sorts them.
    fn allocation_candidates(&self, delivery: Option<DeliveryId>) -> Vec<AllocationCandidate>;

    /// Whether a stock item is already on `line`.
    fn line_occupied(&self, line: StockLineId) -> bool;

    /// Put a stock item on a line.
    fn allocate(&mut self, candidate: AllocationCandidate, at: DateTime<Utc>) -> DomainResult<()>;

    /// Items on display lines with nothing left.
    fn depleted_on_display(&self) -> Vec<ItemOnSale>;

    /// Mark an item finished and take it off its line.
    fn finish(&mut self, item: ItemOnSale, code: FinishCode, at: DateTime<Utc>) -> DomainResult<()>;
}
