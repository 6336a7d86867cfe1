//! Currency amount helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal`; postings are made in whole cents.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places amounts are posted with.
pub const CURRENCY_SCALE: u32 = 2;

/// Half of the smallest posted unit (0.005).
///
/// Amounts at or below this are indistinguishable from zero once rounded to cents.
pub const HALF_CENT: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Rounds an amount to cents, midpoint away from zero.
#[must_use]
pub fn round_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds an amount to cents towards zero.
#[must_use]
pub fn truncate_to_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::ToZero)
}

/// Returns true if an outstanding amount counts as fully paid.
#[must_use]
pub fn is_settled(amount: Decimal) -> bool {
    amount <= HALF_CENT
}

#[cfg(test)]
#[path = "money_tests.rs"]
mod tests;
