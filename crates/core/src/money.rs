//! Currency helpers.
//!
//! Money is a `rust_decimal::Decimal` scaled to two places ("pennies").

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Decimal places kept for currency amounts.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to whole pennies, halves away from zero.
pub fn quantize(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate and quantise an operator-entered price. Negative prices are
/// rejected.
pub fn price(amount: Decimal) -> DomainResult<Decimal> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DomainError::validation("price cannot be negative"));
    }
    Ok(quantize(amount))
}
