//! Records with an identity of their own.

/// A record that stays the same record while its attributes change: a
/// renamed supplier is still the same supplier.
pub trait Entity {
    type Id: Copy + Ord + core::fmt::Display;

    fn id(&self) -> &Self::Id;
}
