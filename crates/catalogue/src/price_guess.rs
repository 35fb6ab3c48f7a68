//! Sale-price suggestion.
//!
//! Strategies are consulted in registration order; the first one that returns
//! something wins. Suggestions are only shown to the operator: nothing here
//! changes a stock type's price.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillstock_core::{DepartmentId, ValueObject, money};

use crate::stock_type::StockType;
use crate::unit::UnitDescriptor;

/// What a strategy suggests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSuggestion {
    /// A sale price per measurement-unit item (e.g. per pint).
    Amount(Decimal),
    /// Free text shown instead of a price.
    Hint(String),
}

impl ValueObject for PriceSuggestion {}

impl PriceSuggestion {
    /// Render for the intake form: "£3.40 per pint" or the hint itself.
    pub fn display(&self, currency: &str, item_name: &str) -> String {
        match self {
            PriceSuggestion::Amount(a) => format!("{currency}{a:.2} per {item_name}"),
            PriceSuggestion::Hint(h) => h.clone(),
        }
    }
}

/// A price-suggestion strategy.
///
/// Implementations must be pure: no state changes, safe to call on every
/// keystroke.
pub trait PriceGuess: Send + Sync + core::fmt::Debug {
    fn guess(
        &self,
        stock_type: &StockType,
        unit: &UnitDescriptor,
        per_unit_cost: Decimal,
    ) -> Option<PriceSuggestion>;
}

/// Ordered chain of strategies. Registration happens at start-up; there is no
/// removal.
#[derive(Debug, Default)]
pub struct PriceGuessRegistry {
    strategies: Vec<Box<dyn PriceGuess>>,
}

impl PriceGuessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, strategy: impl PriceGuess + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Suggest a price. Returns `None` if any input is still missing or the
    /// cost is negative, or if no strategy has an opinion. Amounts are
    /// quantised to pennies.
    pub fn guess(
        &self,
        stock_type: Option<&StockType>,
        unit: Option<&UnitDescriptor>,
        per_unit_cost: Option<Decimal>,
    ) -> Option<PriceSuggestion> {
        let (stock_type, unit, cost) = (stock_type?, unit?, per_unit_cost?);
        if cost.is_sign_negative() || unit.unit != stock_type.unit() {
            return None;
        }
        self.strategies
            .iter()
            .find_map(|s| s.guess(stock_type, unit, cost))
            .map(|g| match g {
                PriceSuggestion::Amount(a) => PriceSuggestion::Amount(money::quantize(a)),
                hint => hint,
            })
    }

    /// Convenience for intake: the whole cost of `quantity` items is split
    /// evenly before guessing.
    pub fn guess_for_batch(
        &self,
        stock_type: Option<&StockType>,
        unit: Option<&UnitDescriptor>,
        whole_cost: Option<Decimal>,
        quantity: Option<u32>,
    ) -> Option<PriceSuggestion> {
        let quantity = quantity.filter(|q| *q > 0)?;
        let per_unit = whole_cost?.checked_div(Decimal::from(quantity))?;
        self.guess(stock_type, unit, Some(per_unit))
    }
}

/// Markup-by-department strategy.
///
/// The cost of one delivered unit is spread over its size, multiplied by the
/// department's markup and then VAT is added.
#[derive(Debug, Clone, Default)]
pub struct MarkupPriceGuess {
    markups: HashMap<DepartmentId, Decimal>,
    vat_rate: Decimal,
}

impl MarkupPriceGuess {
    pub fn new(vat_rate: Decimal) -> Self {
        Self {
            markups: HashMap::new(),
            vat_rate,
        }
    }

    pub fn with_markup(mut self, department: DepartmentId, multiplier: Decimal) -> Self {
        self.markups.insert(department, multiplier);
        self
    }
}

impl PriceGuess for MarkupPriceGuess {
    fn guess(
        &self,
        stock_type: &StockType,
        unit: &UnitDescriptor,
        per_unit_cost: Decimal,
    ) -> Option<PriceSuggestion> {
        let Some(markup) = self.markups.get(&stock_type.department()) else {
            return Some(PriceSuggestion::Hint(
                "no markup rule configured".to_string(),
            ));
        };
        if per_unit_cost.is_sign_negative() {
            return None;
        }
        let ex_vat = per_unit_cost.checked_div(unit.size)?.checked_mul(*markup)?;
        let with_vat = ex_vat.checked_mul(Decimal::ONE.checked_add(self.vat_rate)?)?;
        Some(PriceSuggestion::Amount(with_vat))
    }
}
