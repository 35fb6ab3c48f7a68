//! Retiring stock that has run out on a display line.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use tillstock_core::{DomainResult, StockLineId};
use tillstock_delivery::{Delivery, FinishCode};

use crate::line::StockLine;
use crate::repository::{ItemOnSale, StockRepository};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub finished: Vec<ItemOnSale>,
}

/// Items on display lines with nothing remaining, ordered by item id.
pub fn select_purgeable<'a>(
    deliveries: impl IntoIterator<Item = &'a Delivery>,
    lines: impl IntoIterator<Item = &'a StockLine>,
) -> Vec<ItemOnSale> {
    let display_lines: Vec<StockLineId> = lines
        .into_iter()
        .filter(|l| l.has_display())
        .map(|l| l.id_typed())
        .collect();

    let mut depleted: Vec<ItemOnSale> = deliveries
        .into_iter()
        .filter(|d| !d.is_deleted())
        .flat_map(|d| d.items().iter())
        .filter(|item| item.remaining() <= Decimal::ZERO)
        .filter_map(|item| {
            let line = item.line()?;
            display_lines.contains(&line).then_some(ItemOnSale {
                item: item.id_typed(),
                line,
                delivery: item.delivery(),
            })
        })
        .collect();
    depleted.sort();
    depleted
}

/// Finish every depleted item on a display line with [`FinishCode::Empty`].
/// Running it twice finishes nothing the second time.
pub fn purge_finished_stock<R: StockRepository + ?Sized>(
    repo: &mut R,
    at: DateTime<Utc>,
) -> DomainResult<PurgeReport> {
    let mut report = PurgeReport::default();
    for entry in repo.depleted_on_display() {
        repo.finish(entry, FinishCode::Empty, at)?;
        tracing::info!(item = %entry.item, line = %entry.line, "finished empty stock item");
        report.finished.push(entry);
    }
    Ok(report)
}
