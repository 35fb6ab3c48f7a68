//! Shared vocabulary for the stock intake crates: identifiers, money rules,
//! the domain error and the aggregate traits. No IO lives here.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{DeliveryId, DepartmentId, StockItemId, StockLineId, StockTypeId, SupplierId, UnitId};
pub use value_object::ValueObject;
