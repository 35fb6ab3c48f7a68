use chrono::{DateTime, Utc};

/// A fact emitted by an aggregate. Never edited once emitted; a change of
/// payload shape bumps `version`.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name carried on the bus, `"delivery.confirmed"`.
    fn event_type(&self) -> &'static str;

    fn version(&self) -> u32;

    /// Till time at which the operator did the thing.
    fn occurred_at(&self) -> DateTime<Utc>;
}
