//! Pricing
//!
//! - [`calculator`]: subtotal, discount, GST/PST and total
//! - [`money`]: decimal conversion and input validation

pub mod calculator;
pub mod money;

pub use calculator::{OrderTotals, compute_totals, reprice};
