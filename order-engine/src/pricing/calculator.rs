//! Order total calculation
//!
//! Pure function from an item list and an optional discount to the derived
//! money fields. Always recomputed from scratch on every items/discount
//! mutation; never patched incrementally.

use super::money::{round2, to_decimal, to_f64};
use rust_decimal::prelude::*;
use shared::order::{Discount, LineItem, Order};

/// GST rate (5%)
pub const GST_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);
/// PST rate (7%)
pub const PST_RATE: Decimal = Decimal::from_parts(7, 0, 0, false, 2);

/// Result of order total calculation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrderTotals {
    /// Sum of price * quantity over non-freebie lines
    pub subtotal: f64,
    /// Subtotal after the flat discount, floored at zero
    pub discounted_subtotal: f64,
    pub gst: f64,
    pub pst: f64,
    /// discounted_subtotal + gst + pst
    pub total: f64,
}

/// Sum of line totals, freebies excluded
pub fn items_subtotal(items: &[LineItem]) -> Decimal {
    items
        .iter()
        .filter(|item| !item.is_freebie)
        .map(|item| to_decimal(item.price) * Decimal::from(item.quantity))
        .sum()
}

/// Compute subtotal, discount, taxes and total
///
/// The discount's `apply_to` scope is informational; the flat amount is
/// always taken off the whole subtotal. Taxes are rounded to cents before
/// being summed so that `total == discounted_subtotal + gst + pst` holds on
/// the stored values.
pub fn compute_totals(items: &[LineItem], discount: Option<&Discount>) -> OrderTotals {
    let subtotal = round2(items_subtotal(items));
    let discount_amount = discount
        .map(|d| to_decimal(d.amount).max(Decimal::ZERO))
        .unwrap_or_default();

    let discounted = (subtotal - discount_amount).max(Decimal::ZERO);
    let gst = round2(discounted * GST_RATE);
    let pst = round2(discounted * PST_RATE);
    let total = discounted + gst + pst;

    OrderTotals {
        subtotal: to_f64(subtotal),
        discounted_subtotal: to_f64(discounted),
        gst: to_f64(gst),
        pst: to_f64(pst),
        total: to_f64(total),
    }
}

/// Recompute and store the derived totals on an order
pub fn reprice(order: &mut Order) -> OrderTotals {
    let totals = compute_totals(&order.items, order.discount.as_ref());
    order.subtotal = totals.subtotal;
    order.total = totals.total;
    totals
}
