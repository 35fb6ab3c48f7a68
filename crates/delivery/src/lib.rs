//! Delivery domain module: the draft → confirmed intake workflow.
//!
//! Business rules for deliveries and the stock items received on them,
//! implemented as deterministic domain logic (no IO, no storage).

pub mod batch;
pub mod delivery;
pub mod hooks;
pub mod stock_item;

pub use batch::{BatchRequest, create_batch, duplicate_item};
pub use delivery::{
    AddItems, AllocateItem, Confirm, CreateDelivery, Delete, Delivery, DeliveryCommand,
    DeliveryCost, DeliveryDetails, DeliveryDraft, DeliveryEvent, DeliveryStatus, DetailsUpdate,
    EditItem, FinishItem, ItemEdit, RecordUsage, RemoveItem, UpdateDetails,
};
pub use hooks::{DeliveryHook, DeliveryHooks};
pub use stock_item::{FinishCode, StockItem, StockItemState};
