use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillstock_catalogue::UnitDescriptor;
use tillstock_core::{DeliveryId, Entity, StockItemId, StockLineId, StockTypeId};

/// Why a stock item was finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishCode {
    /// Used up on a display line.
    Empty,
}

/// Where a stock item is in its life after intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StockItemState {
    Unallocated,
    OnLine {
        line: StockLineId,
        /// Quantity currently on display, if the line tracks it.
        display_qty: Option<Decimal>,
    },
    Finished {
        at: DateTime<Utc>,
        code: FinishCode,
    },
}

/// One physically countable unit (keg, case, bottle-batch) received on a
/// delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    pub(crate) id: StockItemId,
    pub(crate) delivery: DeliveryId,
    pub(crate) stock_type: StockTypeId,
    pub(crate) unit: UnitDescriptor,
    pub(crate) cost_price: Option<Decimal>,
    pub(crate) best_before: Option<NaiveDate>,
    pub(crate) used: Decimal,
    pub(crate) state: StockItemState,
}

impl StockItem {
    pub fn id_typed(&self) -> StockItemId {
        self.id
    }

    pub fn delivery(&self) -> DeliveryId {
        self.delivery
    }

    pub fn stock_type(&self) -> StockTypeId {
        self.stock_type
    }

    pub fn unit(&self) -> &UnitDescriptor {
        &self.unit
    }

    pub fn cost_price(&self) -> Option<Decimal> {
        self.cost_price
    }

    pub fn best_before(&self) -> Option<NaiveDate> {
        self.best_before
    }

    /// Size less what has been used.
    pub fn remaining(&self) -> Decimal {
        self.unit.size - self.used
    }

    pub fn state(&self) -> &StockItemState {
        &self.state
    }

    pub fn line(&self) -> Option<StockLineId> {
        match self.state {
            StockItemState::OnLine { line, .. } => Some(line),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, StockItemState::Finished { .. })
    }

    pub fn is_unallocated(&self) -> bool {
        matches!(self.state, StockItemState::Unallocated)
    }
}

impl Entity for StockItem {
    type Id = StockItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
