//! Stock-on-sale domain module: stock lines, their routing log, the
//! auto-allocation pass and depleted-stock purging.
//!
//! Storage is reached through [`StockRepository`]; the selection rules live
//! here so every backend applies them the same way.

pub mod allocation;
pub mod line;
pub mod purge;
pub mod repository;

pub use allocation::{AllocationReport, auto_allocate, select_candidates};
pub use line::{NewStockLine, StockLine, TypeLog};
pub use purge::{PurgeReport, purge_finished_stock, select_purgeable};
pub use repository::{AllocationCandidate, ItemOnSale, StockRepository};

#[cfg(test)]
pub(crate) mod testing;
