//! Stock intake service.
//!
//! Every operation takes the operator's [`Session`] explicitly and flushes at
//! the same checkpoints the till does: after each header change, after each
//! item added or removed, and before an identifier is handed back.

use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use tillstock_catalogue::{
    PriceGuessRegistry, PriceSuggestion, Supplier, SupplierDetails, UnitDescriptor,
};
use tillstock_core::{
    Aggregate, DeliveryId, DomainError, DomainResult, StockItemId, StockLineId, StockTypeId,
    SupplierId,
};
use tillstock_delivery::{
    AddItems, AllocateItem, BatchRequest, Confirm, CreateDelivery, Delete, DeliveryCommand,
    DeliveryCost, DeliveryDraft, DeliveryHooks, DetailsUpdate, EditItem, ItemEdit, RecordUsage,
    RemoveItem, UpdateDetails, create_batch, duplicate_item,
};
use tillstock_stock::{AllocationReport, PurgeReport, auto_allocate, purge_finished_stock};

use crate::config::{ConfigError, IntakeConfig};
use crate::database::Database;
use crate::session::Session;

/// Result of asking to confirm a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Confirmed {
        /// Stock items put on sale by the follow-up allocation pass.
        allocated: usize,
        nothing_to_do: bool,
    },
    /// A hook refused; the delivery is still a draft.
    Vetoed { by: String },
}

/// Operator edit of one stock item on a draft delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemEditRequest {
    pub item: StockItemId,
    pub stock_type: StockTypeId,
    /// Required when `stock_type` is measured in a different unit.
    pub unit: Option<UnitDescriptor>,
    pub cost_price: Option<Decimal>,
    pub best_before: Option<NaiveDate>,
    /// Sale price accepted for `stock_type` while editing.
    pub sale_price: Option<Decimal>,
}

#[derive(Debug)]
pub struct DeliveryService {
    config: IntakeConfig,
    hooks: DeliveryHooks,
    prices: PriceGuessRegistry,
}

impl DeliveryService {
    pub fn new(config: IntakeConfig, hooks: DeliveryHooks, prices: PriceGuessRegistry) -> Self {
        Self {
            config,
            hooks,
            prices,
        }
    }

    /// Build the service with the price-guess chain described by `config`.
    pub fn from_config(config: IntakeConfig, hooks: DeliveryHooks) -> Result<Self, ConfigError> {
        let prices = config.price_guesses()?;
        Ok(Self::new(config, hooks, prices))
    }

    /// Process start-up: load configuration, install logging and open the
    /// database.
    pub fn bootstrap(hooks: DeliveryHooks) -> anyhow::Result<(Arc<Database>, Self)> {
        let config = IntakeConfig::load().context("loading intake configuration")?;
        tillstock_observability::init_with(&config.log_filter);
        let service = Self::from_config(config, hooks).context("building price guesses")?;
        tracing::info!(hooks = service.hooks.len(), "stock intake ready");
        Ok((Database::new(), service))
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    pub fn create_supplier(
        &self,
        session: &mut Session,
        details: SupplierDetails,
    ) -> DomainResult<SupplierId> {
        session.ensure_open()?;
        let supplier = Supplier::new(session.database().next_supplier_id(), details)?;
        let id = supplier.id_typed();
        session.put_supplier(supplier)?;
        session.flush()?;
        tracing::info!(supplier = %id, "supplier created");
        Ok(id)
    }

    pub fn update_supplier(
        &self,
        session: &mut Session,
        id: SupplierId,
        details: SupplierDetails,
    ) -> DomainResult<()> {
        let mut supplier = session.supplier(id)?.clone();
        supplier.update(details)?;
        session.put_supplier(supplier)?;
        session.flush()?;
        Ok(())
    }

    /// Persist a new draft delivery and return its identifier.
    pub fn create_delivery(
        &self,
        session: &mut Session,
        draft: &DeliveryDraft,
    ) -> DomainResult<DeliveryId> {
        session.ensure_open()?;
        let details = draft.validate()?;
        session.supplier(details.supplier)?;

        let id = session.database().next_delivery_id();
        session.run(DeliveryCommand::CreateDelivery(CreateDelivery {
            delivery_id: id,
            details,
            occurred_at: Utc::now(),
        }))?;
        session.flush()?;
        tracing::info!(delivery = %id, "delivery created");
        Ok(id)
    }

    pub fn update_delivery(
        &self,
        session: &mut Session,
        id: DeliveryId,
        update: DetailsUpdate,
    ) -> DomainResult<()> {
        if let Some(supplier) = update.supplier {
            session.supplier(supplier)?;
        }
        session.run(DeliveryCommand::UpdateDetails(UpdateDetails {
            delivery_id: id,
            update,
            occurred_at: Utc::now(),
        }))?;
        session.flush()?;
        Ok(())
    }

    /// Receive `request.quantity` items of one stock type. An accepted sale
    /// price is written to the stock type in the same flush.
    pub fn add_batch(
        &self,
        session: &mut Session,
        delivery: DeliveryId,
        stock_type: StockTypeId,
        request: &BatchRequest,
    ) -> DomainResult<Vec<StockItemId>> {
        let now = Utc::now();
        let db = Arc::clone(session.database());
        let original = session.stock_type(stock_type)?.clone();
        let mut updated = original.clone();

        let items = create_batch(session.delivery(delivery)?, &mut updated, request, now, || {
            db.next_stock_item_id()
        })?;
        let ids: Vec<StockItemId> = items.iter().map(|i| i.id_typed()).collect();

        session.run(DeliveryCommand::AddItems(AddItems {
            delivery_id: delivery,
            items,
            occurred_at: now,
        }))?;
        if updated != original {
            session.put_stock_type(updated)?;
        }
        session.flush()?;
        tracing::info!(
            delivery = %delivery,
            stock_type = %stock_type,
            count = ids.len(),
            "stock items received"
        );
        Ok(ids)
    }

    /// Add a copy of an existing item (without its best-before date).
    pub fn duplicate_item(
        &self,
        session: &mut Session,
        delivery: DeliveryId,
        item: StockItemId,
    ) -> DomainResult<StockItemId> {
        let new_id = session.database().next_stock_item_id();
        let copy = duplicate_item(session.delivery(delivery)?, item, new_id)?;
        session.run(DeliveryCommand::AddItems(AddItems {
            delivery_id: delivery,
            items: vec![copy],
            occurred_at: Utc::now(),
        }))?;
        session.flush()?;
        Ok(new_id)
    }

    pub fn edit_item(
        &self,
        session: &mut Session,
        delivery: DeliveryId,
        request: ItemEditRequest,
    ) -> DomainResult<()> {
        let now = Utc::now();
        session.delivery(delivery)?.ensure_draft()?;
        let original = session.stock_type(request.stock_type)?.clone();
        let mut updated = original.clone();
        if let Some(price) = request.sale_price {
            updated.accept_sale_price(price, now)?;
        }

        session.run(DeliveryCommand::EditItem(EditItem {
            delivery_id: delivery,
            edit: ItemEdit {
                item_id: request.item,
                stock_type: request.stock_type,
                stock_type_unit: updated.unit(),
                unit: request.unit,
                cost_price: request.cost_price,
                best_before: request.best_before,
            },
            occurred_at: now,
        }))?;
        if updated != original {
            session.put_stock_type(updated)?;
        }
        session.flush()?;
        Ok(())
    }

    pub fn remove_item(
        &self,
        session: &mut Session,
        delivery: DeliveryId,
        item: StockItemId,
    ) -> DomainResult<()> {
        session.run(DeliveryCommand::RemoveItem(RemoveItem {
            delivery_id: delivery,
            item_id: item,
            occurred_at: Utc::now(),
        }))?;
        session.flush()?;
        Ok(())
    }

    /// Delete a draft delivery together with its items.
    pub fn delete_delivery(&self, session: &mut Session, delivery: DeliveryId) -> DomainResult<()> {
        session.run(DeliveryCommand::Delete(Delete {
            delivery_id: delivery,
            occurred_at: Utc::now(),
        }))?;
        session.flush()?;
        tracing::info!(delivery = %delivery, "delivery deleted");
        Ok(())
    }

    /// Confirm a delivery.
    ///
    /// Hooks may veto first. Once the confirmation is flushed it is permanent:
    /// hooks are then notified and an allocation pass runs for this delivery.
    /// Problems in either of those are logged and never undo the
    /// confirmation.
    pub fn confirm(
        &self,
        session: &mut Session,
        delivery: DeliveryId,
    ) -> DomainResult<ConfirmOutcome> {
        let now = Utc::now();
        let command = DeliveryCommand::Confirm(Confirm {
            delivery_id: delivery,
            occurred_at: now,
        });
        session.ensure_open()?;
        session.delivery(delivery)?.handle(&command)?;

        if let Some(hook) = self.hooks.vetoed_by(delivery) {
            tracing::info!(delivery = %delivery, hook, "confirmation vetoed");
            return Ok(ConfirmOutcome::Vetoed {
                by: hook.to_string(),
            });
        }

        session.run(command)?;
        session.flush()?;
        tracing::info!(delivery = %delivery, "delivery confirmed");

        let failed = self.hooks.notify_confirmed(delivery);
        if failed > 0 {
            tracing::warn!(delivery = %delivery, failed, "some confirmation hooks failed");
        }

        let report = match self.allocate_and_flush(session, Some(delivery)) {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(
                    delivery = %delivery,
                    error = %err,
                    "allocation after confirmation failed"
                );
                session.rollback();
                AllocationReport::default()
            }
        };
        Ok(ConfirmOutcome::Confirmed {
            allocated: report.allocated_count(),
            nothing_to_do: report.nothing_to_do,
        })
    }

    /// Run an allocation pass over all confirmed deliveries, or just one.
    pub fn auto_allocate(
        &self,
        session: &mut Session,
        delivery: Option<DeliveryId>,
    ) -> DomainResult<AllocationReport> {
        self.allocate_and_flush(session, delivery).inspect_err(|_| session.rollback())
    }

    fn allocate_and_flush(
        &self,
        session: &mut Session,
        delivery: Option<DeliveryId>,
    ) -> DomainResult<AllocationReport> {
        session.ensure_open()?;
        let report = auto_allocate(
            session,
            delivery,
            self.config.allocation.notify_on_no_work,
            Utc::now(),
        )?;
        session.flush()?;
        Ok(report)
    }

    /// Put a specific item on a line by hand. The line remembers the stock
    /// type for future allocation passes.
    pub fn assign_item(
        &self,
        session: &mut Session,
        delivery: DeliveryId,
        item: StockItemId,
        line: StockLineId,
        display_qty: Option<Decimal>,
    ) -> DomainResult<()> {
        session.stock_line(line)?;
        let stock_type = session
            .delivery(delivery)?
            .item(item)
            .map(|i| i.stock_type())
            .ok_or_else(|| DomainError::not_found(format!("stock item {item}")))?;

        session.run(DeliveryCommand::AllocateItem(AllocateItem {
            delivery_id: delivery,
            item_id: item,
            line,
            display_qty,
            occurred_at: Utc::now(),
        }))?;
        session.record_route(line, stock_type)?;
        session.flush()?;
        tracing::info!(item = %item, line = %line, "stock item assigned");
        Ok(())
    }

    pub fn record_usage(
        &self,
        session: &mut Session,
        delivery: DeliveryId,
        item: StockItemId,
        quantity: Decimal,
    ) -> DomainResult<()> {
        session.run(DeliveryCommand::RecordUsage(RecordUsage {
            delivery_id: delivery,
            item_id: item,
            quantity,
            occurred_at: Utc::now(),
        }))?;
        session.flush()?;
        Ok(())
    }

    /// Finish every empty item on a display line.
    pub fn purge(&self, session: &mut Session) -> DomainResult<PurgeReport> {
        session.ensure_open()?;
        let report = match purge_finished_stock(session, Utc::now()) {
            Ok(report) => report,
            Err(err) => {
                session.rollback();
                return Err(err);
            }
        };
        session.flush()?;
        if !report.finished.is_empty() {
            tracing::info!(finished = report.finished.len(), "purged empty stock");
        }
        Ok(report)
    }

    pub fn total_cost(&self, session: &Session, delivery: DeliveryId) -> DomainResult<DeliveryCost> {
        Ok(session.delivery(delivery)?.total_cost())
    }

    /// Suggested sale price for a batch still being entered. Any missing
    /// input gives `None`.
    pub fn suggest_price(
        &self,
        session: &Session,
        stock_type: Option<StockTypeId>,
        unit: Option<&UnitDescriptor>,
        whole_cost: Option<Decimal>,
        quantity: Option<u32>,
    ) -> Option<PriceSuggestion> {
        let stock_type = stock_type.and_then(|id| session.stock_type(id).ok());
        self.prices
            .guess_for_batch(stock_type, unit, whole_cost, quantity)
    }

    /// [`suggest_price`](Self::suggest_price) as text for the operator.
    pub fn price_prompt(
        &self,
        session: &Session,
        stock_type: StockTypeId,
        unit: Option<&UnitDescriptor>,
        whole_cost: Option<Decimal>,
        quantity: Option<u32>,
    ) -> Option<String> {
        let suggestion = self.suggest_price(session, Some(stock_type), unit, whole_cost, quantity)?;
        let st = session.stock_type(stock_type).ok()?;
        let item_name = session
            .unit(st.unit())
            .map(|u| u.item_name.as_str())
            .unwrap_or("item");
        Some(suggestion.display(&self.config.currency, item_name))
    }
}
