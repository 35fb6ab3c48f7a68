use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillstock_core::{DomainError, DomainResult, Entity, UnitId, ValueObject};

/// A measurement unit stock is sold in (e.g. pint, 25ml measure, bottle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    /// Name of the unit as used in sizes ("pint").
    pub name: String,
    /// Name of one sold item of this unit, used in price labels ("pint").
    pub item_name: String,
}

impl Unit {
    pub fn new(id: UnitId, name: impl Into<String>, item_name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        let item_name = item_name.into().trim().to_string();
        if name.is_empty() || item_name.is_empty() {
            return Err(DomainError::validation("unit name cannot be empty"));
        }
        Ok(Self { id, name, item_name })
    }
}

impl Entity for Unit {
    type Id = UnitId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// How a stock item was delivered: a named container with a size expressed in
/// a measurement unit ("11gal" = 88 pints).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitDescriptor {
    pub name: String,
    pub size: Decimal,
    pub unit: UnitId,
}

impl ValueObject for UnitDescriptor {}

impl UnitDescriptor {
    pub fn new(name: impl Into<String>, size: Decimal, unit: UnitId) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("item size needs a name"));
        }
        if size <= Decimal::ZERO {
            return Err(DomainError::validation("item size must be positive"));
        }
        Ok(Self { name, size, unit })
    }

    /// Fail with a validation error unless this descriptor is measured in
    /// `unit`.
    pub fn ensure_unit(&self, unit: UnitId) -> DomainResult<()> {
        if self.unit != unit {
            return Err(DomainError::validation(format!(
                "item size '{}' isn't valid for this type of stock",
                self.name
            )));
        }
        Ok(())
    }
}

/// The unit descriptors offered for a stock type measured in `unit`,
/// smallest first.
pub fn descriptors_for_unit<'a>(
    descriptors: impl IntoIterator<Item = &'a UnitDescriptor>,
    unit: UnitId,
) -> Vec<&'a UnitDescriptor> {
    let mut matching: Vec<&UnitDescriptor> =
        descriptors.into_iter().filter(|d| d.unit == unit).collect();
    matching.sort_by(|a, b| a.size.cmp(&b.size).then_with(|| a.name.cmp(&b.name)));
    matching
}
