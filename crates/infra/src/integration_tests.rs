//! Workflow tests for the whole intake pipeline.
//!
//! Session → Delivery aggregate → Database flush → EventBus, with hooks and
//! the allocation pass wired in the way a till runs them.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use tillstock_catalogue::{NewStockType, SupplierDetails, UnitDescriptor};
use tillstock_core::{DeliveryId, DomainError, StockItemId, StockLineId, StockTypeId, SupplierId};
use tillstock_delivery::{
    BatchRequest, DeliveryDraft, DeliveryHook, DeliveryHooks, DeliveryStatus, DetailsUpdate,
    FinishCode, StockItemState,
};
use tillstock_events::Subscription;
use tillstock_stock::NewStockLine;

use crate::config::IntakeConfig;
use crate::database::{Database, JsonEnvelope};
use crate::service::{ConfirmOutcome, DeliveryService, ItemEditRequest};
use crate::session::Session;

struct Fixture {
    db: Arc<Database>,
    acme: SupplierId,
    lager: StockTypeId,
    keg: UnitDescriptor,
}

fn fixture(service: &DeliveryService) -> Fixture {
    let db = Database::new();
    let mut session = Session::start(&db).unwrap();
    let acme = service
        .create_supplier(&mut session, SupplierDetails::named("Acme"))
        .unwrap();
    let pints = session.add_unit("pint", "pint").unwrap();
    let dept = session.add_department("Keg Beer").unwrap();
    let keg = UnitDescriptor::new("11gal", dec!(88), pints).unwrap();
    session.add_unit_descriptor(keg.clone()).unwrap();
    let lager = session
        .add_stock_type(NewStockType {
            manufacturer: "Acme".to_string(),
            name: "Lager Keg".to_string(),
            unit: pints,
            department: dept,
            sale_price: Some(dec!(4.50)),
        })
        .unwrap();
    session.end().unwrap();
    Fixture {
        db,
        acme,
        lager,
        keg,
    }
}

fn plain_service() -> DeliveryService {
    DeliveryService::from_config(IntakeConfig::default(), DeliveryHooks::new()).unwrap()
}

fn draft(supplier: SupplierId, date: (i32, u32, u32), doc: &str) -> DeliveryDraft {
    DeliveryDraft {
        supplier: Some(supplier),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
        document_number: doc.to_string(),
    }
}

fn pump(session: &mut Session, name: &str, capacity: Option<u32>) -> StockLineId {
    session
        .add_stock_line(NewStockLine {
            name: name.to_string(),
            location: "Bar".to_string(),
            capacity,
        })
        .unwrap()
}

#[derive(Clone, Default)]
struct Ledger {
    calls: Arc<Mutex<Vec<String>>>,
}

impl DeliveryHook for Ledger {
    fn name(&self) -> &str {
        "ledger"
    }

    fn confirmed(&self, delivery: DeliveryId) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("confirmed:{delivery}"));
        Ok(())
    }
}

struct Veto;

impl DeliveryHook for Veto {
    fn name(&self) -> &str {
        "period-closed"
    }

    fn pre_confirm(&self, _delivery: DeliveryId) -> bool {
        true
    }
}

/// Records its label and the event types already published when it is told
/// about a confirmation.
struct Witness {
    label: &'static str,
    events: Arc<Mutex<Option<Subscription<JsonEnvelope>>>>,
    log: Arc<Mutex<Vec<String>>>,
}

impl DeliveryHook for Witness {
    fn name(&self) -> &str {
        self.label
    }

    fn confirmed(&self, delivery: DeliveryId) -> anyhow::Result<()> {
        let seen: Vec<String> = self
            .events
            .lock()
            .unwrap()
            .as_ref()
            .map(|sub| sub.drain())
            .unwrap_or_default()
            .iter()
            .map(|e| e.header().event_type.clone())
            .collect();
        let mut log = self.log.lock().unwrap();
        log.push(format!("{}:{delivery}", self.label));
        log.extend(seen);
        Ok(())
    }
}

struct Broken;

impl DeliveryHook for Broken {
    fn confirmed(&self, _delivery: DeliveryId) -> anyhow::Result<()> {
        anyhow::bail!("export target offline")
    }
}

#[test]
fn scenario_a_five_kegs_confirmed_and_left_unallocated() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();

    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-100"))
        .unwrap();
    let items = service
        .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 5))
        .unwrap();
    assert_eq!(items.len(), 5);

    let outcome = service.confirm(&mut session, id).unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Confirmed {
            allocated: 0,
            nothing_to_do: false
        }
    );

    let delivery = session.delivery(id).unwrap();
    assert_eq!(delivery.status(), DeliveryStatus::Confirmed);
    assert_eq!(delivery.items().len(), 5);
    assert!(delivery.items().iter().all(|i| i.is_unallocated()));
}

#[test]
fn scenario_b_empty_delivery_cannot_be_confirmed() {
    let ledger = Ledger::default();
    let service = DeliveryService::from_config(
        IntakeConfig::default(),
        DeliveryHooks::new().register(ledger.clone()),
    )
    .unwrap();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-101"))
        .unwrap();

    let err = service.confirm(&mut session, id).unwrap_err();
    assert_eq!(err, DomainError::EmptyDelivery);
    assert_eq!(session.delivery(id).unwrap().status(), DeliveryStatus::Draft);
    assert!(ledger.calls.lock().unwrap().is_empty());
}

#[test]
fn scenario_c_vetoed_confirmation_leaves_draft_and_allocates_nothing() {
    let ledger = Ledger::default();
    let service = DeliveryService::from_config(
        IntakeConfig::default(),
        DeliveryHooks::new().register(Veto).register(ledger.clone()),
    )
    .unwrap();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let line = pump(&mut session, "Pump 1", Some(1));
    session.flush().unwrap();

    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-102"))
        .unwrap();
    service
        .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 1))
        .unwrap();
    // Route the stock type to the line so allocation would have work.
    session.record_route(line, fx.lager).unwrap();
    session.flush().unwrap();

    let outcome = service.confirm(&mut session, id).unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Vetoed {
            by: "period-closed".to_string()
        }
    );
    let delivery = session.delivery(id).unwrap();
    assert_eq!(delivery.status(), DeliveryStatus::Draft);
    assert!(delivery.items().iter().all(|i| i.is_unallocated()));
    assert!(ledger.calls.lock().unwrap().is_empty());
}

#[test]
fn scenario_d_lowest_item_id_takes_the_only_line() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let line = pump(&mut session, "Pump 1", Some(1));
    session.record_route(line, fx.lager).unwrap();
    session.flush().unwrap();

    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-103"))
        .unwrap();
    let items = service
        .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 2))
        .unwrap();
    let (low, high) = (items[0].min(items[1]), items[0].max(items[1]));

    let outcome = service.confirm(&mut session, id).unwrap();
    assert_eq!(
        outcome,
        ConfirmOutcome::Confirmed {
            allocated: 1,
            nothing_to_do: false
        }
    );
    let delivery = session.delivery(id).unwrap();
    assert_eq!(delivery.item(low).unwrap().line(), Some(line));
    assert!(delivery.item(high).unwrap().is_unallocated());
}

#[test]
fn hooks_are_notified_in_order_before_allocation_and_failures_do_not_block() {
    let events = Arc::new(Mutex::new(None));
    let log = Arc::new(Mutex::new(Vec::new()));
    let witness = |label| Witness {
        label,
        events: Arc::clone(&events),
        log: Arc::clone(&log),
    };
    let service = DeliveryService::from_config(
        IntakeConfig::default(),
        DeliveryHooks::new()
            .register(witness("a"))
            .register(Broken)
            .register(witness("c")),
    )
    .unwrap();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let line = pump(&mut session, "Pump 1", Some(1));
    session.record_route(line, fx.lager).unwrap();
    session.flush().unwrap();
    *events.lock().unwrap() = Some(fx.db.subscribe());
    let after = fx.db.subscribe();

    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-104"))
        .unwrap();
    service
        .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 1))
        .unwrap();

    assert_eq!(
        service.confirm(&mut session, id).unwrap(),
        ConfirmOutcome::Confirmed {
            allocated: 1,
            nothing_to_do: false
        }
    );
    // Hook "a" saw the confirmation but no allocation yet; "c" ran after the
    // failing hook and before allocation too.
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            format!("a:{id}"),
            "delivery.created".to_string(),
            "delivery.items_added".to_string(),
            "delivery.confirmed".to_string(),
            format!("c:{id}"),
        ]
    );
    let types: Vec<String> = after
        .drain()
        .iter()
        .map(|e| e.header().event_type.clone())
        .collect();
    assert_eq!(types.last().map(String::as_str), Some("delivery.stock_item_allocated"));

    // The confirmation reached the database, not just this session.
    let other = Session::start(&fx.db).unwrap();
    assert!(other.delivery(id).unwrap().is_confirmed());
}

#[test]
fn two_sessions_cannot_fill_one_display_line() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut setup = Session::start(&fx.db).unwrap();
    let line = pump(&mut setup, "Pump 1", Some(1));
    let mut deliveries = Vec::new();
    for doc in ["INV-120", "INV-121"] {
        let id = service
            .create_delivery(&mut setup, &draft(fx.acme, (2024, 1, 1), doc))
            .unwrap();
        service
            .add_batch(&mut setup, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 1))
            .unwrap();
        // No route yet, so confirming leaves the keg in the cellar.
        service.confirm(&mut setup, id).unwrap();
        deliveries.push(id);
    }
    setup.record_route(line, fx.lager).unwrap();
    setup.end().unwrap();

    let mut a = Session::start(&fx.db).unwrap();
    let mut b = Session::start(&fx.db).unwrap();
    let placed = service.auto_allocate(&mut a, Some(deliveries[0])).unwrap();
    assert_eq!(placed.allocated_count(), 1);
    let err = service.auto_allocate(&mut b, Some(deliveries[1])).unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)), "got {err:?}");

    let fresh = Session::start(&fx.db).unwrap();
    let on_line = deliveries
        .iter()
        .flat_map(|id| fresh.delivery(*id).unwrap().items().to_vec())
        .filter(|item| item.line() == Some(line))
        .count();
    assert_eq!(on_line, 1);

    // After the rollback the loser sees the line as taken.
    let retry = service.auto_allocate(&mut b, Some(deliveries[1])).unwrap();
    assert_eq!(retry.allocated_count(), 0);
    assert_eq!(retry.skipped.len(), 1);
}

#[test]
fn notify_on_no_work_is_reported_from_configuration() {
    let mut config = IntakeConfig::default();
    config.allocation.notify_on_no_work = true;
    let service = DeliveryService::from_config(config, DeliveryHooks::new()).unwrap();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-105"))
        .unwrap();
    service
        .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 1))
        .unwrap();

    assert_eq!(
        service.confirm(&mut session, id).unwrap(),
        ConfirmOutcome::Confirmed {
            allocated: 0,
            nothing_to_do: true
        }
    );
}

#[test]
fn confirmed_delivery_rejects_intake_changes_through_the_service() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-106"))
        .unwrap();
    let items = service
        .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 1))
        .unwrap();
    service.confirm(&mut session, id).unwrap();

    let state_error = |r: Result<_, DomainError>| matches!(r, Err(DomainError::State(_)));
    assert!(state_error(service.update_delivery(
        &mut session,
        id,
        DetailsUpdate {
            document_number: Some("INV-999".to_string()),
            ..DetailsUpdate::default()
        },
    )));
    assert!(state_error(
        service
            .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 1))
            .map(|_| ())
    ));
    assert!(state_error(service.remove_item(&mut session, id, items[0])));
    assert!(state_error(
        service.duplicate_item(&mut session, id, items[0]).map(|_| ())
    ));
    assert!(state_error(service.delete_delivery(&mut session, id)));
    assert!(state_error(service.edit_item(
        &mut session,
        id,
        ItemEditRequest {
            item: items[0],
            stock_type: fx.lager,
            unit: None,
            cost_price: Some(dec!(1)),
            best_before: None,
            sale_price: None,
        },
    )));
    assert!(state_error(service.confirm(&mut session, id).map(|_| ())));
    assert_eq!(session.delivery(id).unwrap().document_number(), "INV-106");
}

#[test]
fn batch_price_acceptance_updates_the_stock_type() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-107"))
        .unwrap();
    let request = BatchRequest::new(fx.keg.clone(), 4)
        .with_total_cost(dec!(330))
        .with_sale_price(dec!(4.75));
    let items = service.add_batch(&mut session, id, fx.lager, &request).unwrap();

    let other = Session::start(&fx.db).unwrap();
    assert_eq!(other.stock_type(fx.lager).unwrap().sale_price(), Some(dec!(4.75)));
    let delivery = other.delivery(id).unwrap();
    assert_eq!(delivery.item(items[0]).unwrap().cost_price(), Some(dec!(82.50)));
    assert_eq!(delivery.total_cost().strict(), Some(dec!(330.00)));
}

#[test]
fn invalid_header_update_changes_nothing() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-108"))
        .unwrap();

    let err = service
        .update_delivery(
            &mut session,
            id,
            DetailsUpdate {
                date: NaiveDate::from_ymd_opt(2024, 2, 2),
                document_number: Some("   ".to_string()),
                ..DetailsUpdate::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
    let delivery = session.delivery(id).unwrap();
    assert_eq!(delivery.date(), NaiveDate::from_ymd_opt(2024, 1, 1));
    assert_eq!(delivery.document_number(), "INV-108");
}

#[test]
fn duplicate_supplier_name_conflicts_and_rolls_back() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();

    let err = service
        .create_supplier(&mut session, SupplierDetails::named(" Acme "))
        .unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
    assert!(!session.has_unflushed_changes());
    assert_eq!(session.suppliers().len(), 1);

    let brewer = service
        .create_supplier(&mut session, SupplierDetails::named("Brewer & Co"))
        .unwrap();
    assert_ne!(brewer, fx.acme);
}

#[test]
fn stock_item_ids_are_never_reused() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-109"))
        .unwrap();
    let first = service
        .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 2))
        .unwrap();
    service.delete_delivery(&mut session, id).unwrap();
    assert!(matches!(session.delivery(id), Err(DomainError::NotFound(_))));

    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 2), "INV-110"))
        .unwrap();
    let second = service
        .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 2))
        .unwrap();
    let duplicate = service.duplicate_item(&mut session, id, second[0]).unwrap();

    let mut all: Vec<StockItemId> = first.iter().chain(&second).copied().collect();
    all.push(duplicate);
    let distinct: std::collections::BTreeSet<_> = all.iter().collect();
    assert_eq!(distinct.len(), all.len());
}

#[test]
fn delivery_list_puts_drafts_first_then_newest() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();

    let old_confirmed = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "A"))
        .unwrap();
    service
        .add_batch(&mut session, old_confirmed, fx.lager, &BatchRequest::new(fx.keg.clone(), 1))
        .unwrap();
    service.confirm(&mut session, old_confirmed).unwrap();
    let old_draft = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "B"))
        .unwrap();
    let new_draft = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 3, 1), "C"))
        .unwrap();
    let same_day_draft = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "D"))
        .unwrap();

    let order: Vec<DeliveryId> = session.deliveries().iter().map(|d| d.id_typed()).collect();
    assert_eq!(order, vec![new_draft, same_day_draft, old_draft, old_confirmed]);
}

#[test]
fn edit_item_requires_a_size_when_the_unit_changes() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let ml = session.add_unit("ml", "25ml measure").unwrap();
    let spirits = session.add_department("Spirits").unwrap();
    let gin = session
        .add_stock_type(NewStockType {
            manufacturer: "Acme".to_string(),
            name: "Dry Gin".to_string(),
            unit: ml,
            department: spirits,
            sale_price: None,
        })
        .unwrap();
    session.flush().unwrap();

    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-111"))
        .unwrap();
    let items = service
        .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 1))
        .unwrap();
    let mut request = ItemEditRequest {
        item: items[0],
        stock_type: gin,
        unit: None,
        cost_price: Some(dec!(18.99)),
        best_before: None,
        sale_price: Some(dec!(3.20)),
    };
    assert!(matches!(
        service.edit_item(&mut session, id, request.clone()),
        Err(DomainError::Validation(_))
    ));
    assert_eq!(session.stock_type(gin).unwrap().sale_price(), None);

    let bottle = UnitDescriptor::new("70cl", dec!(700), ml).unwrap();
    request.unit = Some(bottle.clone());
    service.edit_item(&mut session, id, request).unwrap();
    let item = session.delivery(id).unwrap().item(items[0]).unwrap();
    assert_eq!(item.stock_type(), gin);
    assert_eq!(item.unit(), &bottle);
    assert_eq!(item.cost_price(), Some(dec!(18.99)));
    assert_eq!(session.stock_type(gin).unwrap().sale_price(), Some(dec!(3.20)));
}

#[test]
fn explicit_assignment_teaches_future_allocation() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    let line = pump(&mut session, "Pump 2", Some(1));
    session.flush().unwrap();

    let first = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-112"))
        .unwrap();
    let kegs = service
        .add_batch(&mut session, first, fx.lager, &BatchRequest::new(fx.keg.clone(), 1))
        .unwrap();
    service.confirm(&mut session, first).unwrap();
    assert!(!session.type_log().accepts(line, fx.lager));

    service
        .assign_item(&mut session, first, kegs[0], line, Some(dec!(88)))
        .unwrap();
    assert!(session.type_log().accepts(line, fx.lager));

    // Drink the keg, purge it, and the next delivery refills the pump.
    service
        .record_usage(&mut session, first, kegs[0], dec!(88))
        .unwrap();
    match session.delivery(first).unwrap().item(kegs[0]).unwrap().state() {
        StockItemState::OnLine { display_qty, .. } => assert_eq!(*display_qty, Some(Decimal::ZERO)),
        other => panic!("expected item on line, got {other:?}"),
    }
    let purged = service.purge(&mut session).unwrap();
    assert_eq!(purged.finished.len(), 1);
    match session.delivery(first).unwrap().item(kegs[0]).unwrap().state() {
        StockItemState::Finished { code, .. } => assert_eq!(*code, FinishCode::Empty),
        other => panic!("expected finished item, got {other:?}"),
    }
    assert!(service.purge(&mut session).unwrap().finished.is_empty());

    let second = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 8), "INV-113"))
        .unwrap();
    let refill = service
        .add_batch(&mut session, second, fx.lager, &BatchRequest::new(fx.keg.clone(), 1))
        .unwrap();
    assert_eq!(
        service.confirm(&mut session, second).unwrap(),
        ConfirmOutcome::Confirmed {
            allocated: 1,
            nothing_to_do: false
        }
    );
    assert_eq!(
        session.delivery(second).unwrap().item(refill[0]).unwrap().line(),
        Some(line)
    );
}

#[test]
fn flushed_changes_are_published_on_the_bus() {
    let service = plain_service();
    let fx = fixture(&service);
    let events = fx.db.subscribe();
    let mut session = Session::start(&fx.db).unwrap();

    let id = service
        .create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-114"))
        .unwrap();
    service
        .add_batch(&mut session, id, fx.lager, &BatchRequest::new(fx.keg.clone(), 3))
        .unwrap();
    service.confirm(&mut session, id).unwrap();

    let published = events.drain();
    let types: Vec<&str> = published.iter().map(|e| e.header().event_type.as_str()).collect();
    assert_eq!(
        types,
        vec!["delivery.created", "delivery.items_added", "delivery.confirmed"]
    );
    let sequence: Vec<u64> = published.iter().map(|e| e.header().sequence).collect();
    assert_eq!(sequence, vec![1, 2, 3]);
    assert!(published.iter().all(|e| e.header().stream_id == id.get()));
}

#[test]
fn abandoned_session_discards_unflushed_work() {
    let service = plain_service();
    let fx = fixture(&service);
    {
        let mut session = Session::start(&fx.db).unwrap();
        pump(&mut session, "Pump 9", Some(1));
        assert!(session.has_unflushed_changes());
    }
    let session = Session::start(&fx.db).unwrap();
    assert!(session.stock_line(StockLineId::new(1)).is_err());
}

#[test]
fn closed_session_is_refused_by_the_service() {
    let service = plain_service();
    let fx = fixture(&service);
    let mut session = Session::start(&fx.db).unwrap();
    session.end().unwrap();
    assert!(matches!(
        service.create_delivery(&mut session, &draft(fx.acme, (2024, 1, 1), "INV-115")),
        Err(DomainError::State(_))
    ));
}
