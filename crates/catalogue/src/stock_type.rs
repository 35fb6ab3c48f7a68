use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillstock_core::{DepartmentId, DomainError, DomainResult, Entity, StockTypeId, UnitId, money};

/// Department classification (e.g. "Real Ale", "Spirits").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub description: String,
}

impl Entity for Department {
    type Id = DepartmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for registering a new stock type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockType {
    pub manufacturer: String,
    pub name: String,
    pub unit: UnitId,
    pub department: DepartmentId,
    pub sale_price: Option<Decimal>,
}

/// Catalogue entry that stock items instantiate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockType {
    id: StockTypeId,
    manufacturer: String,
    name: String,
    unit: UnitId,
    department: DepartmentId,
    sale_price: Option<Decimal>,
    price_changed: Option<DateTime<Utc>>,
}

impl StockType {
    pub fn new(id: StockTypeId, input: NewStockType, now: DateTime<Utc>) -> DomainResult<Self> {
        let manufacturer = input.manufacturer.trim().to_string();
        let name = input.name.trim().to_string();
        if manufacturer.is_empty() || name.is_empty() {
            return Err(DomainError::validation(
                "stock type needs a manufacturer and a name",
            ));
        }
        let sale_price = input.sale_price.map(money::price).transpose()?;

        Ok(Self {
            id,
            manufacturer,
            name,
            unit: input.unit,
            department: input.department,
            price_changed: sale_price.map(|_| now),
            sale_price,
        })
    }

    pub fn id_typed(&self) -> StockTypeId {
        self.id
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn department(&self) -> DepartmentId {
        self.department
    }

    pub fn sale_price(&self) -> Option<Decimal> {
        self.sale_price
    }

    pub fn price_changed(&self) -> Option<DateTime<Utc>> {
        self.price_changed
    }

    /// "Manufacturer Name", truncated to `max_width` characters.
    pub fn format(&self, max_width: Option<usize>) -> String {
        let full = format!("{} {}", self.manufacturer, self.name);
        match max_width {
            Some(w) if full.chars().count() > w => full.chars().take(w).collect(),
            _ => full,
        }
    }

    /// Record an operator-accepted sale price.
    ///
    /// The timestamp only moves when the price actually changes. Returns
    /// whether it did.
    pub fn accept_sale_price(&mut self, price: Decimal, at: DateTime<Utc>) -> DomainResult<bool> {
        let price = money::price(price)?;
        if self.sale_price == Some(price) {
            return Ok(false);
        }
        tracing::info!(
            stock_type = %self.id,
            old = ?self.sale_price,
            new = %price,
            "sale price changed"
        );
        self.sale_price = Some(price);
        self.price_changed = Some(at);
        Ok(true)
    }
}

impl Entity for StockType {
    type Id = StockTypeId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
