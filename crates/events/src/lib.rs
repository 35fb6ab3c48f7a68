//! Domain events and their distribution.
//!
//! Aggregates emit events; the storage session wraps them in envelopes and
//! publishes them on a bus once they are flushed.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod execute;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use execute::execute;
pub use in_memory_bus::{BusError, InMemoryEventBus};
