//! Automatic placement of newly received stock onto display lines.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};

use tillstock_core::{DeliveryId, DomainResult, StockItemId, StockLineId};
use tillstock_delivery::Delivery;

use crate::line::{StockLine, TypeLog};
use crate::repository::{AllocationCandidate, StockRepository};

/// Outcome of one allocation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationReport {
    pub allocated: Vec<AllocationCandidate>,
    /// Candidate items that found every matching line already taken.
    pub skipped: Vec<StockItemId>,
    /// Set only when the caller asked to be told that nothing was placed.
    pub nothing_to_do: bool,
}

impl AllocationReport {
    pub fn allocated_count(&self) -> usize {
        self.allocated.len()
    }
}

/// Every (item, line) pair eligible for auto-allocation, ordered by item id
/// then line id.
///
/// An item qualifies when it is unallocated and unfinished, its delivery is
/// confirmed (and matches `only`, if given), and the line has a display
/// capacity and has carried the item's stock type before.
pub fn select_candidates<'a>(
    deliveries: impl IntoIterator<Item = &'a Delivery>,
    lines: impl IntoIterator<Item = &'a StockLine>,
    type_log: &TypeLog,
    only: Option<DeliveryId>,
) -> Vec<AllocationCandidate> {
    let display_lines: Vec<StockLineId> = lines
        .into_iter()
        .filter(|l| l.has_display())
        .map(|l| l.id_typed())
        .collect();

    let mut candidates: Vec<AllocationCandidate> = deliveries
        .into_iter()
        .filter(|d| d.is_confirmed() && !d.is_deleted())
        .filter(|d| only.is_none_or(|id| d.id_typed() == id))
        .flat_map(|d| d.items().iter())
        .filter(|item| item.is_unallocated())
        .flat_map(|item| {
            display_lines
                .iter()
                .filter(|line| type_log.accepts(**line, item.stock_type()))
                .map(|line| AllocationCandidate {
                    item: item.id_typed(),
                    line: *line,
                    delivery: item.delivery(),
                })
                .collect::<Vec<_>>()
        })
        .collect();
    candidates.sort();
    candidates
}

/// Single greedy pass over the candidates in item-id order. A line takes at
/// most one item; an item goes on the first free line that accepts it.
pub fn auto_allocate<R: StockRepository + ?Sized>(
    repo: &mut R,
    delivery: Option<DeliveryId>,
    notify_on_no_work: bool,
    at: DateTime<Utc>,
) -> DomainResult<AllocationReport> {
    let mut candidates = repo.allocation_candidates(delivery);
    candidates.sort();

    let mut report = AllocationReport::default();
    let mut placed: HashSet<StockItemId> = HashSet::new();
    let mut filled: HashSet<StockLineId> = HashSet::new();
    let mut missed: BTreeSet<StockItemId> = BTreeSet::new();

    for candidate in candidates {
        if placed.contains(&candidate.item) {
            continue;
        }
        if filled.contains(&candidate.line) || repo.line_occupied(candidate.line) {
            missed.insert(candidate.item);
            continue;
        }
        repo.allocate(candidate, at)?;
        tracing::info!(
            item = %candidate.item,
            line = %candidate.line,
            delivery = %candidate.delivery,
            "stock item auto-allocated"
        );
        placed.insert(candidate.item);
        filled.insert(candidate.line);
        report.allocated.push(candidate);
    }

    report.skipped = missed.into_iter().filter(|i| !placed.contains(i)).collect();
    if report.allocated.is_empty() && notify_on_no_work {
        report.nothing_to_do = true;
        tracing::info!(delivery = ?delivery.map(|d| d.get()), "no stock to allocate");
    }
    Ok(report)
}
