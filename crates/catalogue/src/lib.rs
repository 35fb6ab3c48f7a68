//! Catalogue domain module: measurement units, unit descriptors, stock types,
//! departments, suppliers and sale-price suggestion.
//!
//! Pure domain logic (no IO, no storage).

pub mod price_guess;
pub mod stock_type;
pub mod supplier;
pub mod unit;

pub use price_guess::{MarkupPriceGuess, PriceGuess, PriceGuessRegistry, PriceSuggestion};
pub use stock_type::{Department, NewStockType, StockType};
pub use supplier::{Supplier, SupplierDetails};
pub use unit::{Unit, UnitDescriptor, descriptors_for_unit};
