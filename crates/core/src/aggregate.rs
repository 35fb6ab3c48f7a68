//! Event-sourced aggregates and their optimistic concurrency check.

use crate::error::{DomainError, DomainResult};

/// A consistency boundary with an identity and a version.
pub trait AggregateRoot {
    /// Short name used for event streams and in conflict messages
    /// (`"delivery"`).
    const KIND: &'static str;

    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    fn id(&self) -> &Self::Id;

    /// Number of events applied so far. A fresh aggregate is at 0.
    fn version(&self) -> u64;
}

/// What a writer saw of an aggregate when it last read it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// The aggregate did not exist yet.
    Absent,
    At(u64),
}

impl ExpectedVersion {
    pub fn of<A: AggregateRoot>(seen: Option<&A>) -> Self {
        seen.map_or(Self::Absent, |a| Self::At(a.version()))
    }

    /// Conflict unless `stored` is still exactly what the writer saw.
    pub fn check<A: AggregateRoot>(self, stored: Option<&A>) -> DomainResult<()> {
        match (self, Self::of(stored), stored) {
            (seen, now, _) if seen == now => Ok(()),
            (_, _, Some(current)) => Err(DomainError::conflict(format!(
                "{} {} was changed by another session",
                A::KIND,
                current.id()
            ))),
            (_, _, None) => Err(DomainError::conflict(format!(
                "{} was removed by another session",
                A::KIND
            ))),
        }
    }
}

/// Decide/evolve split for an aggregate.
///
/// `handle` looks at the current state and either rejects the command or
/// returns the events it implies; it never mutates. `apply` folds one event
/// into the state and bumps the version by one. Neither does IO.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    fn apply(&mut self, event: &Self::Event);

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
