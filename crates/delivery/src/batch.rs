//! Stock item batch creation.
//!
//! Stock items are never created on their own: they are built here against a
//! draft delivery and then added to it with a `DeliveryCommand::AddItems`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use tillstock_catalogue::{StockType, UnitDescriptor};
use tillstock_core::{DomainError, DomainResult, StockItemId, money};

use crate::delivery::Delivery;
use crate::stock_item::{StockItem, StockItemState};

/// What the operator entered on the "new stock item" form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub unit: UnitDescriptor,
    pub quantity: u32,
    /// Cost of the whole batch, ex-VAT. Split evenly across the items.
    pub total_cost: Option<Decimal>,
    pub best_before: Option<NaiveDate>,
    /// Sale price the operator accepted for the stock type, if any.
    pub sale_price: Option<Decimal>,
}

impl BatchRequest {
    pub fn new(unit: UnitDescriptor, quantity: u32) -> Self {
        Self {
            unit,
            quantity,
            total_cost: None,
            best_before: None,
            sale_price: None,
        }
    }

    pub fn with_total_cost(mut self, cost: Decimal) -> Self {
        self.total_cost = Some(cost);
        self
    }

    pub fn with_best_before(mut self, date: NaiveDate) -> Self {
        self.best_before = Some(date);
        self
    }

    pub fn with_sale_price(mut self, price: Decimal) -> Self {
        self.sale_price = Some(price);
        self
    }

    /// Cost of one item, quantised to pennies.
    pub fn unit_cost(&self) -> Option<Decimal> {
        let quantity = Decimal::from(self.quantity.max(1));
        self.total_cost.map(|c| money::quantize(c / quantity))
    }
}

/// Build `quantity` stock items for `delivery`.
///
/// All checks run before anything changes. Once they pass, an accepted sale
/// price that differs from the stock type's current one is written to the
/// stock type (with `now` as the change time), and `next_id` is called once
/// per item for its identifier.
pub fn create_batch(
    delivery: &Delivery,
    stock_type: &mut StockType,
    request: &BatchRequest,
    now: DateTime<Utc>,
    mut next_id: impl FnMut() -> StockItemId,
) -> DomainResult<Vec<StockItem>> {
    delivery.ensure_draft()?;
    if request.quantity == 0 {
        return Err(DomainError::validation(
            "number of items must be a positive whole number",
        ));
    }
    request.unit.ensure_unit(stock_type.unit())?;
    let cost_price = request.unit_cost().map(money::price).transpose()?;
    let sale_price = request.sale_price.map(money::price).transpose()?;

    if let Some(price) = sale_price {
        stock_type.accept_sale_price(price, now)?;
    }

    let items = (0..request.quantity)
        .map(|_| StockItem {
            id: next_id(),
            delivery: delivery.id_typed(),
            stock_type: stock_type.id_typed(),
            unit: request.unit.clone(),
            cost_price,
            best_before: request.best_before,
            used: Decimal::ZERO,
            state: StockItemState::Unallocated,
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        delivery = %delivery.id_typed(),
        stock_type = %stock_type.id_typed(),
        count = items.len(),
        "built stock item batch"
    );
    Ok(items)
}

/// Copy type, size and cost of `source` into a fresh item. Best-before is
/// never copied: each physical unit carries its own.
pub fn duplicate_item(
    delivery: &Delivery,
    source: StockItemId,
    new_id: StockItemId,
) -> DomainResult<StockItem> {
    delivery.ensure_draft()?;
    let existing = delivery.item(source).ok_or_else(|| {
        DomainError::not_found(format!("stock item {source} on delivery {}", delivery.id_typed()))
    })?;

    Ok(StockItem {
        id: new_id,
        delivery: existing.delivery,
        stock_type: existing.stock_type,
        unit: existing.unit.clone(),
        cost_price: existing.cost_price,
        best_before: None,
        used: Decimal::ZERO,
        state: StockItemState::Unallocated,
    })
}
