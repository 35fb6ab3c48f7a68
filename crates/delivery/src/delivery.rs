use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillstock_catalogue::UnitDescriptor;
use tillstock_core::{
    Aggregate, AggregateRoot, DeliveryId, DomainError, StockItemId, StockLineId, StockTypeId,
    SupplierId, UnitId,
};
use tillstock_events::Event;

use crate::stock_item::{FinishCode, StockItem, StockItemState};

/// Delivery lifecycle. `Confirmed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Draft,
    Confirmed,
}

/// Validated header of a delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDetails {
    pub supplier: SupplierId,
    pub date: NaiveDate,
    pub document_number: String,
}

impl DeliveryDetails {
    pub fn new(
        supplier: SupplierId,
        date: NaiveDate,
        document_number: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let document_number = document_number.into().trim().to_string();
        if document_number.is_empty() {
            return Err(DomainError::validation(
                "enter a document number before continuing",
            ));
        }
        Ok(Self {
            supplier,
            date,
            document_number,
        })
    }
}

/// Header fields as the operator is filling them in. `None` means "not yet
/// provided".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryDraft {
    pub supplier: Option<SupplierId>,
    pub date: Option<NaiveDate>,
    pub document_number: String,
}

impl DeliveryDraft {
    /// Check every required field; the first missing one is reported.
    pub fn validate(&self) -> Result<DeliveryDetails, DomainError> {
        let supplier = self
            .supplier
            .ok_or_else(|| DomainError::validation("select a supplier before continuing"))?;
        let date = self.date.ok_or_else(|| {
            DomainError::validation("check that the delivery date is correct before continuing")
        })?;
        DeliveryDetails::new(supplier, date, self.document_number.clone())
    }
}

/// Partial header edit. Fields left as `None` are not touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsUpdate {
    pub supplier: Option<SupplierId>,
    pub date: Option<NaiveDate>,
    pub document_number: Option<String>,
}

impl DetailsUpdate {
    pub fn is_empty(&self) -> bool {
        self.supplier.is_none() && self.date.is_none() && self.document_number.is_none()
    }
}

/// Replacement intake data for one stock item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemEdit {
    pub item_id: StockItemId,
    pub stock_type: StockTypeId,
    /// Measurement unit of `stock_type`.
    pub stock_type_unit: UnitId,
    /// New size; required when the stock type's unit differs from the
    /// item's current one, otherwise `None` keeps the current size.
    pub unit: Option<UnitDescriptor>,
    pub cost_price: Option<Decimal>,
    pub best_before: Option<NaiveDate>,
}

/// Cost of a delivery, excluding VAT.
///
/// `known` always sums the items whose cost was entered; `unknown_items`
/// counts the rest. Use [`DeliveryCost::strict`] when a figure is only
/// meaningful if every cost is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryCost {
    pub known: Decimal,
    pub unknown_items: usize,
}

impl DeliveryCost {
    pub fn strict(&self) -> Option<Decimal> {
        (self.unknown_items == 0).then_some(self.known)
    }
}

/// Aggregate root: Delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    id: DeliveryId,
    details: Option<DeliveryDetails>,
    status: DeliveryStatus,
    items: Vec<StockItem>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Delivery {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: DeliveryId) -> Self {
        Self {
            id,
            details: None,
            status: DeliveryStatus::Draft,
            items: Vec::new(),
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> DeliveryId {
        self.id
    }

    pub fn details(&self) -> Option<&DeliveryDetails> {
        self.details.as_ref()
    }

    pub fn supplier(&self) -> Option<SupplierId> {
        self.details.as_ref().map(|d| d.supplier)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.details.as_ref().map(|d| d.date)
    }

    pub fn document_number(&self) -> &str {
        self.details
            .as_ref()
            .map(|d| d.document_number.as_str())
            .unwrap_or("")
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == DeliveryStatus::Confirmed
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn items(&self) -> &[StockItem] {
        &self.items
    }

    pub fn item(&self, item_id: StockItemId) -> Option<&StockItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn total_cost(&self) -> DeliveryCost {
        self.items.iter().fold(
            DeliveryCost {
                known: Decimal::ZERO,
                unknown_items: 0,
            },
            |mut acc, item| {
                match item.cost_price {
                    Some(c) => acc.known += c,
                    None => acc.unknown_items += 1,
                }
                acc
            },
        )
    }
}

impl AggregateRoot for Delivery {
    const KIND: &'static str = "delivery";
    type Id = DeliveryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateDelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDelivery {
    pub delivery_id: DeliveryId,
    pub details: DeliveryDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateDetails (Draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub delivery_id: DeliveryId,
    pub update: DetailsUpdate,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddItems (Draft only). Items come from the batch creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItems {
    pub delivery_id: DeliveryId,
    pub items: Vec<StockItem>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: EditItem (Draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditItem {
    pub delivery_id: DeliveryId,
    pub edit: ItemEdit,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveItem (Draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveItem {
    pub delivery_id: DeliveryId,
    pub item_id: StockItemId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Confirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirm {
    pub delivery_id: DeliveryId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Delete (Draft only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delete {
    pub delivery_id: DeliveryId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AllocateItem (Confirmed only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocateItem {
    pub delivery_id: DeliveryId,
    pub item_id: StockItemId,
    pub line: StockLineId,
    pub display_qty: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordUsage (item must be on a line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUsage {
    pub delivery_id: DeliveryId,
    pub item_id: StockItemId,
    pub quantity: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: FinishItem (item must be on a line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishItem {
    pub delivery_id: DeliveryId,
    pub item_id: StockItemId,
    pub code: FinishCode,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryCommand {
    CreateDelivery(CreateDelivery),
    UpdateDetails(UpdateDetails),
    AddItems(AddItems),
    EditItem(EditItem),
    RemoveItem(RemoveItem),
    Confirm(Confirm),
    Delete(Delete),
    AllocateItem(AllocateItem),
    RecordUsage(RecordUsage),
    FinishItem(FinishItem),
}

impl DeliveryCommand {
    pub fn delivery_id(&self) -> DeliveryId {
        match self {
            DeliveryCommand::CreateDelivery(c) => c.delivery_id,
            DeliveryCommand::UpdateDetails(c) => c.delivery_id,
            DeliveryCommand::AddItems(c) => c.delivery_id,
            DeliveryCommand::EditItem(c) => c.delivery_id,
            DeliveryCommand::RemoveItem(c) => c.delivery_id,
            DeliveryCommand::Confirm(c) => c.delivery_id,
            DeliveryCommand::Delete(c) => c.delivery_id,
            DeliveryCommand::AllocateItem(c) => c.delivery_id,
            DeliveryCommand::RecordUsage(c) => c.delivery_id,
            DeliveryCommand::FinishItem(c) => c.delivery_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryEvent {
    DeliveryCreated {
        delivery_id: DeliveryId,
        details: DeliveryDetails,
        occurred_at: DateTime<Utc>,
    },
    DetailsUpdated {
        delivery_id: DeliveryId,
        details: DeliveryDetails,
        occurred_at: DateTime<Utc>,
    },
    ItemsAdded {
        delivery_id: DeliveryId,
        items: Vec<StockItem>,
        occurred_at: DateTime<Utc>,
    },
    ItemEdited {
        delivery_id: DeliveryId,
        item_id: StockItemId,
        stock_type: StockTypeId,
        unit: UnitDescriptor,
        cost_price: Option<Decimal>,
        best_before: Option<NaiveDate>,
        occurred_at: DateTime<Utc>,
    },
    ItemRemoved {
        delivery_id: DeliveryId,
        item_id: StockItemId,
        occurred_at: DateTime<Utc>,
    },
    DeliveryConfirmed {
        delivery_id: DeliveryId,
        occurred_at: DateTime<Utc>,
    },
    DeliveryDeleted {
        delivery_id: DeliveryId,
        item_ids: Vec<StockItemId>,
        occurred_at: DateTime<Utc>,
    },
    StockItemAllocated {
        delivery_id: DeliveryId,
        item_id: StockItemId,
        line: StockLineId,
        display_qty: Option<Decimal>,
        occurred_at: DateTime<Utc>,
    },
    StockItemUsed {
        delivery_id: DeliveryId,
        item_id: StockItemId,
        quantity: Decimal,
        occurred_at: DateTime<Utc>,
    },
    StockItemFinished {
        delivery_id: DeliveryId,
        item_id: StockItemId,
        code: FinishCode,
        occurred_at: DateTime<Utc>,
    },
}

impl Event for DeliveryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DeliveryEvent::DeliveryCreated { .. } => "delivery.created",
            DeliveryEvent::DetailsUpdated { .. } => "delivery.details_updated",
            DeliveryEvent::ItemsAdded { .. } => "delivery.items_added",
            DeliveryEvent::ItemEdited { .. } => "delivery.item_edited",
            DeliveryEvent::ItemRemoved { .. } => "delivery.item_removed",
            DeliveryEvent::DeliveryConfirmed { .. } => "delivery.confirmed",
            DeliveryEvent::DeliveryDeleted { .. } => "delivery.deleted",
            DeliveryEvent::StockItemAllocated { .. } => "delivery.stock_item_allocated",
            DeliveryEvent::StockItemUsed { .. } => "delivery.stock_item_used",
            DeliveryEvent::StockItemFinished { .. } => "delivery.stock_item_finished",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DeliveryEvent::DeliveryCreated { occurred_at, .. }
            | DeliveryEvent::DetailsUpdated { occurred_at, .. }
            | DeliveryEvent::ItemsAdded { occurred_at, .. }
            | DeliveryEvent::ItemEdited { occurred_at, .. }
            | DeliveryEvent::ItemRemoved { occurred_at, .. }
            | DeliveryEvent::DeliveryConfirmed { occurred_at, .. }
            | DeliveryEvent::DeliveryDeleted { occurred_at, .. }
            | DeliveryEvent::StockItemAllocated { occurred_at, .. }
            | DeliveryEvent::StockItemUsed { occurred_at, .. }
            | DeliveryEvent::StockItemFinished { occurred_at, .. } => *occurred_at,
        }
    }
}

impl Aggregate for Delivery {
    type Command = DeliveryCommand;
    type Event = DeliveryEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            DeliveryEvent::DeliveryCreated {
                delivery_id,
                details,
                ..
            } => {
                self.id = *delivery_id;
                self.details = Some(details.clone());
                self.status = DeliveryStatus::Draft;
                self.items.clear();
                self.created = true;
            }
            DeliveryEvent::DetailsUpdated { details, .. } => {
                self.details = Some(details.clone());
            }
            DeliveryEvent::ItemsAdded { items, .. } => {
                self.items.extend(items.iter().cloned());
            }
            DeliveryEvent::ItemEdited {
                item_id,
                stock_type,
                unit,
                cost_price,
                best_before,
                ..
            } => {
                if let Some(item) = self.item_mut(*item_id) {
                    item.stock_type = *stock_type;
                    item.unit = unit.clone();
                    item.cost_price = *cost_price;
                    item.best_before = *best_before;
                }
            }
            DeliveryEvent::ItemRemoved { item_id, .. } => {
                self.items.retain(|i| i.id != *item_id);
            }
            DeliveryEvent::DeliveryConfirmed { .. } => {
                self.status = DeliveryStatus::Confirmed;
            }
            DeliveryEvent::DeliveryDeleted { .. } => {
                self.items.clear();
                self.deleted = true;
            }
            DeliveryEvent::StockItemAllocated {
                item_id,
                line,
                display_qty,
                ..
            } => {
                if let Some(item) = self.item_mut(*item_id) {
                    item.state = StockItemState::OnLine {
                        line: *line,
                        display_qty: *display_qty,
                    };
                }
            }
            DeliveryEvent::StockItemUsed {
                item_id, quantity, ..
            } => {
                if let Some(item) = self.item_mut(*item_id) {
                    item.used += *quantity;
                    if let StockItemState::OnLine {
                        display_qty: Some(shown),
                        ..
                    } = &mut item.state
                    {
                        *shown = (*shown - *quantity).max(Decimal::ZERO);
                    }
                }
            }
            DeliveryEvent::StockItemFinished {
                item_id,
                code,
                occurred_at,
                ..
            } => {
                if let Some(item) = self.item_mut(*item_id) {
                    item.state = StockItemState::Finished {
                        at: *occurred_at,
                        code: *code,
                    };
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            DeliveryCommand::CreateDelivery(cmd) => self.handle_create(cmd),
            DeliveryCommand::UpdateDetails(cmd) => self.handle_update(cmd),
            DeliveryCommand::AddItems(cmd) => self.handle_add_items(cmd),
            DeliveryCommand::EditItem(cmd) => self.handle_edit_item(cmd),
            DeliveryCommand::RemoveItem(cmd) => self.handle_remove_item(cmd),
            DeliveryCommand::Confirm(cmd) => self.handle_confirm(cmd),
            DeliveryCommand::Delete(cmd) => self.handle_delete(cmd),
            DeliveryCommand::AllocateItem(cmd) => self.handle_allocate(cmd),
            DeliveryCommand::RecordUsage(cmd) => self.handle_usage(cmd),
            DeliveryCommand::FinishItem(cmd) => self.handle_finish(cmd),
        }
    }
}

impl Delivery {
    fn item_mut(&mut self, item_id: StockItemId) -> Option<&mut StockItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    fn ensure_live(&self, delivery_id: DeliveryId) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found(format!("delivery {delivery_id}")));
        }
        if self.id != delivery_id {
            return Err(DomainError::state("delivery_id mismatch"));
        }
        Ok(())
    }

    /// Intake data may only change while the delivery is a draft.
    pub fn ensure_draft(&self) -> Result<(), DomainError> {
        if self.status == DeliveryStatus::Confirmed {
            return Err(DomainError::state(format!(
                "delivery {} is confirmed and can no longer be changed",
                self.id
            )));
        }
        Ok(())
    }

    fn existing_item(&self, item_id: StockItemId) -> Result<&StockItem, DomainError> {
        self.item(item_id).ok_or_else(|| {
            DomainError::not_found(format!("stock item {item_id} on delivery {}", self.id))
        })
    }

    fn handle_create(&self, cmd: &CreateDelivery) -> Result<Vec<DeliveryEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("delivery already exists"));
        }
        if self.id != cmd.delivery_id {
            return Err(DomainError::state("delivery_id mismatch"));
        }
        Ok(vec![DeliveryEvent::DeliveryCreated {
            delivery_id: cmd.delivery_id,
            details: cmd.details.clone(),
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_update(&self, cmd: &UpdateDetails) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_live(cmd.delivery_id)?;
        self.ensure_draft()?;

        let Some(current) = self.details.as_ref() else {
            return Err(DomainError::not_found(format!("delivery {}", self.id)));
        };

        // All supplied fields are validated together before any is applied.
        let details = DeliveryDetails::new(
            cmd.update.supplier.unwrap_or(current.supplier),
            cmd.update.date.unwrap_or(current.date),
            cmd.update
                .document_number
                .clone()
                .unwrap_or_else(|| current.document_number.clone()),
        )?;

        if &details == current {
            return Ok(vec![]);
        }

        Ok(vec![DeliveryEvent::DetailsUpdated {
            delivery_id: cmd.delivery_id,
            details,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_add_items(&self, cmd: &AddItems) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_live(cmd.delivery_id)?;
        self.ensure_draft()?;

        if cmd.items.is_empty() {
            return Err(DomainError::validation("no stock items to add"));
        }
        for (idx, item) in cmd.items.iter().enumerate() {
            if item.delivery != self.id {
                return Err(DomainError::validation(format!(
                    "stock item {} belongs to delivery {}",
                    item.id, item.delivery
                )));
            }
            if self.item(item.id).is_some() || cmd.items[..idx].iter().any(|i| i.id == item.id) {
                return Err(DomainError::conflict(format!(
                    "stock item {} is already on this delivery",
                    item.id
                )));
            }
            if !item.is_unallocated() || !item.used.is_zero() {
                return Err(DomainError::validation(format!(
                    "stock item {} is not fresh stock",
                    item.id
                )));
            }
        }

        Ok(vec![DeliveryEvent::ItemsAdded {
            delivery_id: cmd.delivery_id,
            items: cmd.items.clone(),
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_edit_item(&self, cmd: &EditItem) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_live(cmd.delivery_id)?;
        self.ensure_draft()?;
        let item = self.existing_item(cmd.edit.item_id)?;

        let unit = match &cmd.edit.unit {
            Some(unit) => unit.clone(),
            None if item.unit.unit == cmd.edit.stock_type_unit => item.unit.clone(),
            None => {
                return Err(DomainError::validation(
                    "the item size isn't valid for this type of stock; set a new item size",
                ));
            }
        };
        unit.ensure_unit(cmd.edit.stock_type_unit)?;
        let cost_price = cmd
            .edit
            .cost_price
            .map(tillstock_core::money::price)
            .transpose()?;

        Ok(vec![DeliveryEvent::ItemEdited {
            delivery_id: cmd.delivery_id,
            item_id: cmd.edit.item_id,
            stock_type: cmd.edit.stock_type,
            unit,
            cost_price,
            best_before: cmd.edit.best_before,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_remove_item(&self, cmd: &RemoveItem) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_live(cmd.delivery_id)?;
        self.ensure_draft()?;
        self.existing_item(cmd.item_id)?;

        Ok(vec![DeliveryEvent::ItemRemoved {
            delivery_id: cmd.delivery_id,
            item_id: cmd.item_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_confirm(&self, cmd: &Confirm) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_live(cmd.delivery_id)?;
        if self.is_confirmed() {
            return Err(DomainError::state(format!(
                "delivery {} is already confirmed",
                self.id
            )));
        }
        if self.items.is_empty() {
            return Err(DomainError::EmptyDelivery);
        }

        Ok(vec![DeliveryEvent::DeliveryConfirmed {
            delivery_id: cmd.delivery_id,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_delete(&self, cmd: &Delete) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_live(cmd.delivery_id)?;
        if self.is_confirmed() {
            return Err(DomainError::state(format!(
                "delivery {} is confirmed; confirmed deliveries are permanent records",
                self.id
            )));
        }

        Ok(vec![DeliveryEvent::DeliveryDeleted {
            delivery_id: cmd.delivery_id,
            item_ids: self.items.iter().map(|i| i.id).collect(),
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_allocate(&self, cmd: &AllocateItem) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_live(cmd.delivery_id)?;
        if !self.is_confirmed() {
            return Err(DomainError::state(
                "stock from an unconfirmed delivery cannot be put on sale",
            ));
        }
        let item = self.existing_item(cmd.item_id)?;
        match item.state {
            StockItemState::Unallocated => {}
            StockItemState::OnLine { line, .. } => {
                return Err(DomainError::state(format!(
                    "stock item {} is already on line {line}",
                    item.id
                )));
            }
            StockItemState::Finished { .. } => {
                return Err(DomainError::state(format!(
                    "stock item {} is finished",
                    item.id
                )));
            }
        }

        Ok(vec![DeliveryEvent::StockItemAllocated {
            delivery_id: cmd.delivery_id,
            item_id: cmd.item_id,
            line: cmd.line,
            display_qty: cmd.display_qty,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_usage(&self, cmd: &RecordUsage) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_live(cmd.delivery_id)?;
        let item = self.existing_item(cmd.item_id)?;
        if item.line().is_none() {
            return Err(DomainError::state(format!(
                "stock item {} is not on sale",
                item.id
            )));
        }
        if cmd.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("quantity used must be positive"));
        }
        if cmd.quantity > item.remaining() {
            return Err(DomainError::validation(format!(
                "only {} left in stock item {}",
                item.remaining(),
                item.id
            )));
        }

        Ok(vec![DeliveryEvent::StockItemUsed {
            delivery_id: cmd.delivery_id,
            item_id: cmd.item_id,
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        }])
    }

    fn handle_finish(&self, cmd: &FinishItem) -> Result<Vec<DeliveryEvent>, DomainError> {
        self.ensure_live(cmd.delivery_id)?;
        let item = self.existing_item(cmd.item_id)?;
        if item.line().is_none() {
            return Err(DomainError::state(format!(
                "stock item {} is not on sale",
                item.id
            )));
        }

        Ok(vec![DeliveryEvent::StockItemFinished {
            delivery_id: cmd.delivery_id,
            item_id: cmd.item_id,
            code: cmd.code,
            occurred_at: cmd.occurred_at,
        }])
    }
}
