use serde::{Deserialize, Serialize};

use tillstock_core::{DomainError, DomainResult, Entity, SupplierId};

/// Operator-entered supplier details. Everything except the name may be
/// left blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierDetails {
    pub name: String,
    pub tel: String,
    pub email: String,
    pub web: String,
}

impl SupplierDetails {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Trim all fields and require a name.
    pub fn normalized(self) -> DomainResult<Self> {
        let details = Self {
            name: self.name.trim().to_string(),
            tel: self.tel.trim().to_string(),
            email: self.email.trim().to_string(),
            web: self.web.trim().to_string(),
        };
        if details.name.is_empty() {
            return Err(DomainError::validation("supplier name cannot be empty"));
        }
        Ok(details)
    }
}

/// A supplier deliveries are received from. Names are unique; the storage
/// layer enforces that when the session flushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    details: SupplierDetails,
}

impl Supplier {
    pub fn new(id: SupplierId, details: SupplierDetails) -> DomainResult<Self> {
        Ok(Self {
            id,
            details: details.normalized()?,
        })
    }

    pub fn id_typed(&self) -> SupplierId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.details.name
    }

    pub fn details(&self) -> &SupplierDetails {
        &self.details
    }

    pub fn update(&mut self, details: SupplierDetails) -> DomainResult<()> {
        self.details = details.normalized()?;
        Ok(())
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
