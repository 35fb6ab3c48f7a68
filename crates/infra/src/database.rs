//! Shared in-memory store.
//!
//! Sessions take a snapshot, work on a private copy and write back on flush.
//! The store enforces what the individual aggregates cannot see on their
//! own: stale writes, supplier-name uniqueness, one item per display line
//! and never-reused identifiers.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;

use tillstock_catalogue::{Department, StockType, Supplier, Unit, UnitDescriptor};
use tillstock_core::{
    DeliveryId, DepartmentId, DomainError, DomainResult, ExpectedVersion,
    StockItemId, StockLineId, StockTypeId, SupplierId, UnitId,
};
use tillstock_delivery::{Delivery, StockItem};
use tillstock_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use tillstock_stock::{StockLine, TypeLog};

/// Envelope type carried on the bus.
pub type JsonEnvelope = EventEnvelope<JsonValue>;

/// Every table a session can see.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tables {
    pub suppliers: BTreeMap<SupplierId, Supplier>,
    pub units: BTreeMap<UnitId, Unit>,
    pub unit_descriptors: Vec<UnitDescriptor>,
    pub departments: BTreeMap<DepartmentId, Department>,
    pub stock_types: BTreeMap<StockTypeId, StockType>,
    pub lines: BTreeMap<StockLineId, StockLine>,
    pub type_log: TypeLog,
    pub deliveries: BTreeMap<DeliveryId, Delivery>,
}

/// Rows a session has touched since its last flush.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChangeSet {
    pub deliveries: BTreeSet<DeliveryId>,
    pub suppliers: BTreeSet<SupplierId>,
    pub units: BTreeSet<UnitId>,
    pub departments: BTreeSet<DepartmentId>,
    pub stock_types: BTreeSet<StockTypeId>,
    pub lines: BTreeSet<StockLineId>,
    pub unit_descriptors: Vec<UnitDescriptor>,
    pub routes: TypeLog,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
            && self.suppliers.is_empty()
            && self.units.is_empty()
            && self.departments.is_empty()
            && self.stock_types.is_empty()
            && self.lines.is_empty()
            && self.unit_descriptors.is_empty()
            && self.routes.is_empty()
    }
}

#[derive(Debug, Default)]
struct Sequences {
    deliveries: AtomicU64,
    stock_items: AtomicU64,
    suppliers: AtomicU64,
    units: AtomicU64,
    departments: AtomicU64,
    stock_types: AtomicU64,
    lines: AtomicU64,
}

fn next(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

/// In-memory database shared by every session of a process.
#[derive(Debug, Default)]
pub struct Database {
    tables: RwLock<Tables>,
    sequences: Sequences,
    bus: InMemoryEventBus<JsonEnvelope>,
}

impl Database {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Events published by successful flushes, in commit order.
    pub fn subscribe(&self) -> Subscription<JsonEnvelope> {
        self.bus.subscribe()
    }

    // Identifiers come from sequences outside the tables, so a rolled back
    // or deleted row never gives its id back.

    pub fn next_delivery_id(&self) -> DeliveryId {
        DeliveryId::new(next(&self.sequences.deliveries))
    }

    pub fn next_stock_item_id(&self) -> StockItemId {
        StockItemId::new(next(&self.sequences.stock_items))
    }

    pub fn next_supplier_id(&self) -> SupplierId {
        SupplierId::new(next(&self.sequences.suppliers))
    }

    pub fn next_unit_id(&self) -> UnitId {
        UnitId::new(next(&self.sequences.units))
    }

    pub fn next_department_id(&self) -> DepartmentId {
        DepartmentId::new(next(&self.sequences.departments))
    }

    pub fn next_stock_type_id(&self) -> StockTypeId {
        StockTypeId::new(next(&self.sequences.stock_types))
    }

    pub fn next_stock_line_id(&self) -> StockLineId {
        StockLineId::new(next(&self.sequences.lines))
    }

    pub(crate) fn snapshot(&self) -> DomainResult<Tables> {
        self.tables
            .read()
            .map(|t| t.clone())
            .map_err(|_| DomainError::state("database lock poisoned"))
    }

    /// Write a session's changes back.
    ///
    /// `base` is what the session saw at its last flush. Every touched row must
    /// still be as it was then, otherwise nothing is written and a conflict is
    /// returned.
    pub(crate) fn commit(
        &self,
        base: &Tables,
        working: &Tables,
        changes: &ChangeSet,
    ) -> DomainResult<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| DomainError::state("database lock poisoned"))?;

        for id in &changes.deliveries {
            ExpectedVersion::of(base.deliveries.get(id)).check(tables.deliveries.get(id))?;
        }
        unchanged(&changes.suppliers, &base.suppliers, &tables.suppliers, "supplier")?;
        unchanged(&changes.units, &base.units, &tables.units, "unit")?;
        unchanged(
            &changes.departments,
            &base.departments,
            &tables.departments,
            "department",
        )?;
        unchanged(
            &changes.stock_types,
            &base.stock_types,
            &tables.stock_types,
            "stock type",
        )?;
        unchanged(&changes.lines, &base.lines, &tables.lines, "stock line")?;
        unique_supplier_names(&tables.suppliers, &working.suppliers, &changes.suppliers)?;
        display_lines_hold_one_item(&tables, base, working, &changes.deliveries)?;

        for id in &changes.deliveries {
            match working.deliveries.get(id) {
                Some(d) if !d.is_deleted() => {
                    tables.deliveries.insert(*id, d.clone());
                }
                _ => {
                    tables.deliveries.remove(id);
                }
            }
        }
        copy_rows(&changes.suppliers, &working.suppliers, &mut tables.suppliers);
        copy_rows(&changes.units, &working.units, &mut tables.units);
        copy_rows(&changes.departments, &working.departments, &mut tables.departments);
        copy_rows(&changes.stock_types, &working.stock_types, &mut tables.stock_types);
        copy_rows(&changes.lines, &working.lines, &mut tables.lines);
        for descriptor in &changes.unit_descriptors {
            if !tables.unit_descriptors.contains(descriptor) {
                tables.unit_descriptors.push(descriptor.clone());
            }
        }
        tables.type_log.merge(&changes.routes);
        Ok(())
    }

    /// Hand committed envelopes to subscribers. The data is already written,
    /// so a failure here is logged and not returned.
    pub(crate) fn publish(&self, envelopes: Vec<JsonEnvelope>) -> usize {
        let mut published = 0;
        for envelope in envelopes {
            let event_type = envelope.header().event_type.clone();
            match self.bus.publish(envelope) {
                Ok(()) => published += 1,
                Err(err) => {
                    tracing::warn!(
                        event_type = %event_type,
                        error = %err,
                        "failed to publish committed event"
                    );
                }
            }
        }
        published
    }
}

fn unchanged<K: Ord + Copy + core::fmt::Display, V: PartialEq>(
    touched: &BTreeSet<K>,
    base: &BTreeMap<K, V>,
    current: &BTreeMap<K, V>,
    what: &str,
) -> DomainResult<()> {
    for id in touched {
        if base.get(id) != current.get(id) {
            return Err(DomainError::conflict(format!(
                "{what} {id} was changed by another session"
            )));
        }
    }
    Ok(())
}

fn copy_rows<K: Ord + Copy, V: Clone>(
    touched: &BTreeSet<K>,
    working: &BTreeMap<K, V>,
    target: &mut BTreeMap<K, V>,
) {
    for id in touched {
        if let Some(row) = working.get(id) {
            target.insert(*id, row.clone());
        }
    }
}

fn unique_supplier_names(
    stored: &BTreeMap<SupplierId, Supplier>,
    working: &BTreeMap<SupplierId, Supplier>,
    touched: &BTreeSet<SupplierId>,
) -> DomainResult<()> {
    let mut owners: HashMap<&str, SupplierId> = HashMap::new();
    let merged = stored
        .iter()
        .filter(|(id, _)| !touched.contains(id))
        .chain(working.iter().filter(|(id, _)| touched.contains(id)));
    for (id, supplier) in merged {
        if owners.insert(supplier.name(), *id).is_some() {
            return Err(DomainError::conflict(format!(
                "a supplier called '{}' already exists",
                supplier.name()
            )));
        }
    }
    Ok(())
}

/// A session only sees the deliveries in its snapshot, so two sessions can
/// each place an item on the same empty display line. The second writer must
/// lose.
fn display_lines_hold_one_item(
    stored: &Tables,
    base: &Tables,
    working: &Tables,
    touched: &BTreeSet<DeliveryId>,
) -> DomainResult<()> {
    let previous_line = |item: &StockItem| {
        base.deliveries
            .get(&item.delivery())
            .and_then(|d| d.items().iter().find(|i| i.id_typed() == item.id_typed()))
            .and_then(StockItem::line)
    };
    let is_display = |line: &StockLineId| {
        working
            .lines
            .get(line)
            .or_else(|| stored.lines.get(line))
            .is_some_and(StockLine::has_display)
    };

    let placed: BTreeSet<StockLineId> = written(working, touched)
        .flat_map(|d| d.items())
        .filter_map(|item| item.line().filter(|l| previous_line(item) != Some(*l)))
        .filter(is_display)
        .collect();
    if placed.is_empty() {
        return Ok(());
    }

    let mut held: HashMap<StockLineId, usize> = HashMap::new();
    let merged = stored
        .deliveries
        .iter()
        .filter(|(id, _)| !touched.contains(id))
        .map(|(_, d)| d)
        .chain(written(working, touched));
    for line in merged.flat_map(|d| d.items()).filter_map(StockItem::line) {
        if placed.contains(&line) {
            let count = held.entry(line).or_default();
            *count += 1;
            if *count > 1 {
                return Err(DomainError::conflict(format!(
                    "stock line {line} was filled by another session"
                )));
            }
        }
    }
    Ok(())
}

fn written<'a>(
    working: &'a Tables,
    touched: &'a BTreeSet<DeliveryId>,
) -> impl Iterator<Item = &'a Delivery> + 'a {
    touched
        .iter()
        .filter_map(move |id| working.deliveries.get(id))
        .filter(|d| !d.is_deleted())
}
