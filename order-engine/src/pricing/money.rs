//! Money calculation utilities using rust_decimal for precision
//!
//! All arithmetic is done on `Decimal`, then converted back to `f64`
//! for storage in the order document.

use crate::orders::OrderError;
use rust_decimal::prelude::*;
use shared::order::{Discount, LineItem};

/// Rounding strategy for monetary values (2 decimal places, half away from zero)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed price per item
pub const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
pub const MAX_QUANTITY: u32 = 9999;
/// Maximum allowed flat discount
pub const MAX_DISCOUNT: f64 = 1_000_000.0;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    round2(value).to_f64().unwrap_or_default()
}

#[inline]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), OrderError> {
    if !value.is_finite() {
        return Err(OrderError::Validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a line item before it is written to an order
pub fn validate_line_item(item: &LineItem) -> Result<(), OrderError> {
    if item.id.trim().is_empty() {
        return Err(OrderError::InvalidLineItem("item id is required".to_string()));
    }
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(OrderError::InvalidLineItem(format!(
            "price must be a non-negative finite number, got {}",
            item.price
        )));
    }
    if item.price > MAX_PRICE {
        return Err(OrderError::InvalidLineItem(format!(
            "price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, item.price
        )));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(OrderError::InvalidLineItem(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, item.quantity
        )));
    }
    Ok(())
}

/// Validate a whole item list; an order always keeps at least one line
pub fn validate_items(items: &[LineItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::EmptyItems);
    }
    items.iter().try_for_each(validate_line_item)
}

/// Validate a discount descriptor
pub fn validate_discount(discount: &Discount) -> Result<(), OrderError> {
    require_finite(discount.amount, "discount amount")
        .map_err(|e| OrderError::InvalidDiscount(e.to_string()))?;
    if discount.amount < 0.0 {
        return Err(OrderError::InvalidDiscount(format!(
            "discount amount must be non-negative, got {}",
            discount.amount
        )));
    }
    if discount.amount > MAX_DISCOUNT {
        return Err(OrderError::InvalidDiscount(format!(
            "discount exceeds maximum allowed ({}), got {}",
            MAX_DISCOUNT, discount.amount
        )));
    }
    if discount.reason.trim().is_empty() {
        return Err(OrderError::InvalidDiscount(
            "discount reason is required".to_string(),
        ));
    }
    Ok(())
}
