//! Infrastructure layer: in-memory storage, the per-operator session, the
//! intake service and configuration loading.

pub mod config;
pub mod database;
pub mod service;
pub mod session;

pub use config::{AllocationConfig, IntakeConfig, PricingConfig};
pub use database::{Database, JsonEnvelope};
pub use service::{ConfirmOutcome, DeliveryService, ItemEditRequest};
pub use session::Session;

#[cfg(test)]
mod integration_tests;
