//! In-memory stock book used by the unit tests.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal_macros::dec;

use tillstock_catalogue::{NewStockType, StockType, UnitDescriptor};
use tillstock_core::{
    DeliveryId, DepartmentId, DomainError, DomainResult, StockItemId, StockLineId, StockTypeId,
    SupplierId, UnitId,
};
use tillstock_delivery::{
    AddItems, AllocateItem, BatchRequest, Confirm, CreateDelivery, Delivery, DeliveryCommand,
    DeliveryDetails, FinishCode, FinishItem, RecordUsage, StockItem, create_batch,
};
use tillstock_events::execute;

use crate::allocation::select_candidates;
use crate::line::{NewStockLine, StockLine, TypeLog};
use crate::purge::select_purgeable;
use crate::repository::{AllocationCandidate, ItemOnSale, StockRepository};

pub(crate) struct MemoryStock {
    pub deliveries: Vec<Delivery>,
    pub lines: Vec<StockLine>,
    pub type_log: TypeLog,
}

impl MemoryStock {
    pub fn new() -> Self {
        Self {
            deliveries: Vec::new(),
            lines: Vec::new(),
            type_log: TypeLog::new(),
        }
    }

    pub fn add_line(&mut self, id: u64, capacity: Option<u32>) {
        let line = StockLine::new(
            StockLineId::new(id),
            NewStockLine {
                name: format!("Line {id}"),
                location: "Bar".to_string(),
                capacity,
            },
        )
        .unwrap();
        self.lines.push(line);
    }

    pub fn route(&mut self, line: u64, stock_type: u64) {
        self.type_log
            .record(StockLineId::new(line), StockTypeId::new(stock_type));
    }

    /// Add a delivery holding one keg per `(item id, stock type id)`.
    pub fn add_delivery(&mut self, id: u64, items: &[(u64, u64)], confirmed: bool) {
        let delivery_id = DeliveryId::new(id);
        let now = Utc::now();
        let mut delivery = Delivery::empty(delivery_id);
        execute(
            &mut delivery,
            &DeliveryCommand::CreateDelivery(CreateDelivery {
                delivery_id,
                details: DeliveryDetails::new(
                    SupplierId::new(1),
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    format!("INV-{id}"),
                )
                .unwrap(),
                occurred_at: now,
            }),
        )
        .unwrap();

        let keg = UnitDescriptor::new("11gal", dec!(88), UnitId::new(1)).unwrap();
        let mut built: Vec<StockItem> = Vec::new();
        for (item_id, stock_type) in items {
            let mut st = StockType::new(
                StockTypeId::new(*stock_type),
                NewStockType {
                    manufacturer: "Acme".to_string(),
                    name: format!("Ale {stock_type}"),
                    unit: UnitId::new(1),
                    department: DepartmentId::new(1),
                    sale_price: None,
                },
                now,
            )
            .unwrap();
            let request = BatchRequest::new(keg.clone(), 1);
            built.extend(
                create_batch(&delivery, &mut st, &request, now, || StockItemId::new(*item_id))
                    .unwrap(),
            );
        }
        if !built.is_empty() {
            execute(
                &mut delivery,
                &DeliveryCommand::AddItems(AddItems {
                    delivery_id,
                    items: built,
                    occurred_at: now,
                }),
            )
            .unwrap();
        }
        if confirmed {
            execute(
                &mut delivery,
                &DeliveryCommand::Confirm(Confirm {
                    delivery_id,
                    occurred_at: now,
                }),
            )
            .unwrap();
        }
        self.deliveries.push(delivery);
    }

    pub fn item(&self, id: u64) -> &StockItem {
        self.deliveries
            .iter()
            .find_map(|d| d.item(StockItemId::new(id)))
            .unwrap()
    }

    fn delivery_of(&mut self, item: StockItemId) -> &mut Delivery {
        self.deliveries
            .iter_mut()
            .find(|d| d.item(item).is_some())
            .unwrap()
    }

    /// Put an item on a line by hand.
    pub fn place(&mut self, item: u64, line: u64) {
        let item = StockItemId::new(item);
        let delivery = self.delivery_of(item);
        let delivery_id = delivery.id_typed();
        execute(
            delivery,
            &DeliveryCommand::AllocateItem(AllocateItem {
                delivery_id,
                item_id: item,
                line: StockLineId::new(line),
                display_qty: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
    }

    /// Record usage of everything left in an item.
    pub fn use_up(&mut self, item: u64) {
        let remaining = self.item(item).remaining();
        let item = StockItemId::new(item);
        let delivery = self.delivery_of(item);
        let delivery_id = delivery.id_typed();
        execute(
            delivery,
            &DeliveryCommand::RecordUsage(RecordUsage {
                delivery_id,
                item_id: item,
                quantity: remaining,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
    }

    fn delivery_mut(&mut self, id: DeliveryId) -> DomainResult<&mut Delivery> {
        self.deliveries
            .iter_mut()
            .find(|d| d.id_typed() == id)
            .ok_or_else(|| DomainError::not_found(format!("delivery {id}")))
    }
}

impl StockRepository for MemoryStock {
    fn allocation_candidates(&self, delivery: Option<DeliveryId>) -> Vec<AllocationCandidate> {
        select_candidates(&self.deliveries, &self.lines, &self.type_log, delivery)
    }

    fn line_occupied(&self, line: StockLineId) -> bool {
        self.deliveries
            .iter()
            .flat_map(|d| d.items())
            .any(|i| i.line() == Some(line))
    }

    fn allocate(&mut self, candidate: AllocationCandidate, at: DateTime<Utc>) -> DomainResult<()> {
        let delivery = self.delivery_mut(candidate.delivery)?;
        execute(
            delivery,
            &DeliveryCommand::AllocateItem(AllocateItem {
                delivery_id: candidate.delivery,
                item_id: candidate.item,
                line: candidate.line,
                display_qty: None,
                occurred_at: at,
            }),
        )?;
        Ok(())
    }

    fn depleted_on_display(&self) -> Vec<ItemOnSale> {
        select_purgeable(&self.deliveries, &self.lines)
    }

    fn finish(&mut self, item: ItemOnSale, code: FinishCode, at: DateTime<Utc>) -> DomainResult<()> {
        let delivery = self.delivery_mut(item.delivery)?;
        execute(
            delivery,
            &DeliveryCommand::FinishItem(FinishItem {
                delivery_id: item.delivery,
                item_id: item.item,
                code,
                occurred_at: at,
            }),
        )?;
        Ok(())
    }
}
