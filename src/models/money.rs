use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::ServiceError;

/// Currency symbol appended to rendered amounts
pub const CURRENCY_SYMBOL: &str = "€";

/// Largest amount a `DECIMAL(10, 2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// Renders an amount with two decimals and a trailing currency symbol, e.g. `9.00 €`.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2} {}", rounded, CURRENCY_SYMBOL)
}

/// Amounts are euros with cent precision.
pub fn has_cent_precision(amount: Decimal) -> bool {
    amount.normalize().scale() <= 2
}

/// Rounds to cents and fixes the scale at two decimals.
pub fn to_cents(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

fn too_large() -> ServiceError {
    ServiceError::ValidationError("Amount is too large".to_string())
}

/// Sums an iterator of amounts, failing instead of overflowing.
pub fn sum<I>(amounts: I) -> Result<Decimal, ServiceError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(too_large)
}

/// Adds `amount` to a running total in place.
pub fn accumulate(total: &mut Decimal, amount: Decimal) -> Result<(), ServiceError> {
    *total = total.checked_add(amount).ok_or_else(too_large)?;
    Ok(())
}

/// `unit_price * quantity`, failing instead of overflowing.
pub fn times(unit_price: Decimal, quantity: u32) -> Result<Decimal, ServiceError> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(too_large)
}
