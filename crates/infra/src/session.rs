//! Per-operator unit of work.
//!
//! A [`Session`] reads from a private copy of the database and collects
//! writes until [`Session::flush`]. A failed flush rolls the session back to
//! the last successful one. Dropping a session discards anything unflushed.

use std::cmp::Reverse;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use tillstock_catalogue::{
    Department, NewStockType, StockType, Supplier, Unit, UnitDescriptor, descriptors_for_unit,
};
use tillstock_core::{
    AggregateRoot, DeliveryId, DepartmentId, DomainError, DomainResult, StockLineId, StockTypeId,
    SupplierId, UnitId,
};
use tillstock_delivery::{
    AllocateItem, Delivery, DeliveryCommand, DeliveryEvent, FinishCode, FinishItem,
};
use tillstock_events::{EventEnvelope, execute};
use tillstock_stock::{
    AllocationCandidate, ItemOnSale, NewStockLine, StockLine, StockRepository, TypeLog,
    select_candidates, select_purgeable,
};

use crate::database::{ChangeSet, Database, JsonEnvelope, Tables};

#[derive(Debug)]
pub struct Session {
    db: Arc<Database>,
    base: Tables,
    working: Tables,
    changes: ChangeSet,
    pending: Vec<JsonEnvelope>,
    open: bool,
}

impl Session {
    pub fn start(db: &Arc<Database>) -> DomainResult<Self> {
        let base = db.snapshot()?;
        Ok(Self {
            db: Arc::clone(db),
            working: base.clone(),
            base,
            changes: ChangeSet::default(),
            pending: Vec::new(),
            open: true,
        })
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn has_unflushed_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub(crate) fn ensure_open(&self) -> DomainResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(DomainError::state("the session has already ended"))
        }
    }

    /// Write pending changes and publish their events. Returns the number of
    /// events published.
    pub fn flush(&mut self) -> DomainResult<usize> {
        self.ensure_open()?;
        if self.changes.is_empty() {
            self.refresh();
            return Ok(0);
        }

        if let Err(err) = self.db.commit(&self.base, &self.working, &self.changes) {
            tracing::warn!(error = %err, "flush rejected, rolling back session");
            self.rollback();
            return Err(err);
        }

        let envelopes = std::mem::take(&mut self.pending);
        self.changes = ChangeSet::default();
        self.refresh();
        let published = self.db.publish(envelopes);
        tracing::debug!(published, "session flushed");
        Ok(published)
    }

    /// Discard everything since the last flush. Identifiers handed out in the
    /// meantime stay used.
    pub fn rollback(&mut self) {
        let discarded = self.pending.len();
        self.pending.clear();
        self.changes = ChangeSet::default();
        self.refresh();
        tracing::debug!(discarded, "session rolled back");
    }

    /// Flush and close. Any later use of the session is a state error.
    pub fn end(&mut self) -> DomainResult<()> {
        self.flush()?;
        self.open = false;
        Ok(())
    }

    fn refresh(&mut self) {
        match self.db.snapshot() {
            Ok(tables) => {
                self.working = tables.clone();
                self.base = tables;
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not re-read database");
                self.working = self.base.clone();
            }
        }
    }

    pub fn delivery(&self, id: DeliveryId) -> DomainResult<&Delivery> {
        self.working
            .deliveries
            .get(&id)
            .filter(|d| !d.is_deleted())
            .ok_or_else(|| DomainError::not_found(format!("delivery {id}")))
    }

    /// Deliveries as the intake list shows them: drafts first, then newest
    /// date, then newest id.
    pub fn deliveries(&self) -> Vec<&Delivery> {
        let mut list: Vec<&Delivery> = self
            .working
            .deliveries
            .values()
            .filter(|d| !d.is_deleted())
            .collect();
        list.sort_by_key(|d| (d.is_confirmed(), Reverse(d.date()), Reverse(d.id_typed())));
        list
    }

    pub fn supplier(&self, id: SupplierId) -> DomainResult<&Supplier> {
        self.working
            .suppliers
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("supplier {id}")))
    }

    /// Suppliers ordered by name.
    pub fn suppliers(&self) -> Vec<&Supplier> {
        let mut list: Vec<&Supplier> = self.working.suppliers.values().collect();
        list.sort_by(|a, b| a.name().cmp(b.name()));
        list
    }

    pub fn unit(&self, id: UnitId) -> DomainResult<&Unit> {
        self.working
            .units
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("unit {id}")))
    }

    pub fn department(&self, id: DepartmentId) -> DomainResult<&Department> {
        self.working
            .departments
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("department {id}")))
    }

    pub fn stock_type(&self, id: StockTypeId) -> DomainResult<&StockType> {
        self.working
            .stock_types
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("stock type {id}")))
    }

    pub fn stock_line(&self, id: StockLineId) -> DomainResult<&StockLine> {
        self.working
            .lines
            .get(&id)
            .ok_or_else(|| DomainError::not_found(format!("stock line {id}")))
    }

    pub fn type_log(&self) -> &TypeLog {
        &self.working.type_log
    }

    /// Item sizes on offer for a stock type, smallest first.
    pub fn unit_descriptors_for(&self, stock_type: StockTypeId) -> DomainResult<Vec<&UnitDescriptor>> {
        let unit = self.stock_type(stock_type)?.unit();
        Ok(descriptors_for_unit(&self.working.unit_descriptors, unit))
    }

    pub fn add_unit(
        &mut self,
        name: impl Into<String>,
        item_name: impl Into<String>,
    ) -> DomainResult<UnitId> {
        self.ensure_open()?;
        let id = self.db.next_unit_id();
        let unit = Unit::new(id, name, item_name)?;
        self.working.units.insert(id, unit);
        self.changes.units.insert(id);
        Ok(id)
    }

    pub fn add_unit_descriptor(&mut self, descriptor: UnitDescriptor) -> DomainResult<()> {
        self.ensure_open()?;
        self.unit(descriptor.unit)?;
        if !self.working.unit_descriptors.contains(&descriptor) {
            self.working.unit_descriptors.push(descriptor.clone());
            self.changes.unit_descriptors.push(descriptor);
        }
        Ok(())
    }

    pub fn add_department(&mut self, description: impl Into<String>) -> DomainResult<DepartmentId> {
        self.ensure_open()?;
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(DomainError::validation("department needs a description"));
        }
        let id = self.db.next_department_id();
        self.working
            .departments
            .insert(id, Department { id, description });
        self.changes.departments.insert(id);
        Ok(id)
    }

    pub fn add_stock_type(&mut self, input: NewStockType) -> DomainResult<StockTypeId> {
        self.ensure_open()?;
        self.unit(input.unit)?;
        self.department(input.department)?;
        let id = self.db.next_stock_type_id();
        let stock_type = StockType::new(id, input, Utc::now())?;
        self.put_stock_type(stock_type)?;
        Ok(id)
    }

    pub fn add_stock_line(&mut self, input: NewStockLine) -> DomainResult<StockLineId> {
        self.ensure_open()?;
        let id = self.db.next_stock_line_id();
        let line = StockLine::new(id, input)?;
        self.working.lines.insert(id, line);
        self.changes.lines.insert(id);
        Ok(id)
    }

    pub(crate) fn put_supplier(&mut self, supplier: Supplier) -> DomainResult<()> {
        self.ensure_open()?;
        let id = supplier.id_typed();
        self.working.suppliers.insert(id, supplier);
        self.changes.suppliers.insert(id);
        Ok(())
    }

    pub(crate) fn put_stock_type(&mut self, stock_type: StockType) -> DomainResult<()> {
        self.ensure_open()?;
        let id = stock_type.id_typed();
        self.working.stock_types.insert(id, stock_type);
        self.changes.stock_types.insert(id);
        Ok(())
    }

    /// Remember that `stock_type` has been sold from `line`.
    pub(crate) fn record_route(&mut self, line: StockLineId, stock_type: StockTypeId) -> DomainResult<()> {
        self.ensure_open()?;
        if self.working.type_log.record(line, stock_type) {
            self.changes.routes.record(line, stock_type);
        }
        Ok(())
    }

    /// Run a command against a delivery in this session. Nothing changes if
    /// the command is rejected.
    pub(crate) fn run(&mut self, command: DeliveryCommand) -> DomainResult<Vec<DeliveryEvent>> {
        self.ensure_open()?;
        let id = command.delivery_id();
        let mut delivery = self
            .working
            .deliveries
            .get(&id)
            .cloned()
            .unwrap_or_else(|| Delivery::empty(id));
        let version = delivery.version();

        let events = execute(&mut delivery, &command)?;
        if events.is_empty() {
            return Ok(events);
        }

        let envelopes = EventEnvelope::for_aggregate::<Delivery>(id.get(), version, events.clone())
            .iter()
            .map(EventEnvelope::encode)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| DomainError::state(format!("could not encode event: {err}")))?;

        self.working.deliveries.insert(id, delivery);
        self.changes.deliveries.insert(id);
        self.pending.extend(envelopes);
        Ok(events)
    }
}

impl StockRepository for Session {
    fn allocation_candidates(&self, delivery: Option<DeliveryId>) -> Vec<AllocationCandidate> {
        select_candidates(
            self.working.deliveries.values(),
            self.working.lines.values(),
            &self.working.type_log,
            delivery,
        )
    }

    fn line_occupied(&self, line: StockLineId) -> bool {
        self.working
            .deliveries
            .values()
            .flat_map(|d| d.items())
            .any(|item| item.line() == Some(line))
    }

    fn allocate(&mut self, candidate: AllocationCandidate, at: DateTime<Utc>) -> DomainResult<()> {
        self.run(DeliveryCommand::AllocateItem(AllocateItem {
            delivery_id: candidate.delivery,
            item_id: candidate.item,
            line: candidate.line,
            display_qty: None,
            occurred_at: at,
        }))?;
        Ok(())
    }

    fn depleted_on_display(&self) -> Vec<ItemOnSale> {
        select_purgeable(self.working.deliveries.values(), self.working.lines.values())
    }

    fn finish(&mut self, item: ItemOnSale, code: FinishCode, at: DateTime<Utc>) -> DomainResult<()> {
        self.run(DeliveryCommand::FinishItem(FinishItem {
            delivery_id: item.delivery,
            item_id: item.item,
            code,
            occurred_at: at,
        }))?;
        Ok(())
    }
}
