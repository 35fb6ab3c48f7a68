//! Values compared by content.

/// No identity: two equal values are interchangeable. Item sizes ("11gal",
/// 88 pints) and price suggestions are values; build a new one to change it.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
