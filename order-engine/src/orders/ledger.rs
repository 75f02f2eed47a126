//! Version ledger
//!
//! Append-only history of item-set snapshots per order. Version numbers are
//! 1-based and contiguous; the first edit seeds a preliminary version 1 from
//! the pre-edit state. Both operations are pure: they take an order and
//! return the new document, and the caller persists it.

use super::error::{OrderError, OrderResult};
use crate::pricing::{self, money};
use chrono::{DateTime, Utc};
use shared::order::{LineItem, Order, OrderVersion};

pub const REASON_INITIAL: &str = "Initial order";
pub const REASON_PICKUP_UPDATE: &str = "Order updated at pickup";
pub const REASON_FINAL: &str = "Final order";

/// Result of a finalize request
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    Finalized(Order),
    /// No-op; the order was finalized earlier
    AlreadyFinalized,
}

fn ensure_editable(order: &Order) -> OrderResult<()> {
    if order.is_cancelled() {
        return Err(OrderError::AlreadyTerminal(order.id.clone()));
    }
    Ok(())
}

/// Seed version 1 from the current state if the ledger is empty
fn seed_initial_version(order: &mut Order) {
    if !order.versions.is_empty() {
        return;
    }
    let total = pricing::compute_totals(&order.items, order.discount.as_ref()).total;
    order.versions.push(OrderVersion {
        items: order.items.clone(),
        total,
        version_number: 1,
        timestamp: order.date,
        is_preliminary: true,
        change_reason: REASON_INITIAL.to_string(),
    });
}

fn push_version(order: &mut Order, is_preliminary: bool, reason: &str, now: DateTime<Utc>) {
    let version_number = order.next_version_number();
    order.versions.push(OrderVersion {
        items: order.items.clone(),
        total: order.total,
        version_number,
        timestamp: now,
        is_preliminary,
        change_reason: reason.to_string(),
    });
}

/// Replace the item set and append a ledger version
///
/// `finalize=true` marks the new version as definitive. Finalization is
/// monotonic: an already finalized order stays finalized.
pub fn record_edit(
    order: &Order,
    new_items: Vec<LineItem>,
    finalize: bool,
    now: DateTime<Utc>,
) -> OrderResult<Order> {
    ensure_editable(order)?;
    money::validate_items(&new_items)?;

    let mut updated = order.clone();
    seed_initial_version(&mut updated);

    updated.items = new_items;
    pricing::reprice(&mut updated);

    let reason = if finalize {
        REASON_FINAL
    } else {
        REASON_PICKUP_UPDATE
    };
    push_version(&mut updated, !finalize, reason, now);

    if finalize && !updated.is_finalized {
        updated.is_finalized = true;
        updated.finalized_at = Some(now);
    }

    Ok(updated)
}

/// Mark the current item set as definitive
///
/// Items are normalized (price to a non-negative finite amount) and the
/// total recomputed without freebies. If the ledger is empty or its latest
/// entry is preliminary, a non-preliminary "Final order" version is
/// appended so the ledger reflects the finalized set.
pub fn finalize(order: &Order, now: DateTime<Utc>) -> OrderResult<FinalizeOutcome> {
    ensure_editable(order)?;
    if order.is_finalized {
        return Ok(FinalizeOutcome::AlreadyFinalized);
    }
    if order.items.is_empty() {
        return Err(OrderError::EmptyItems);
    }

    let mut updated = order.clone();
    seed_initial_version(&mut updated);

    updated.items = updated.items.iter().map(LineItem::normalized).collect();
    pricing::reprice(&mut updated);

    let needs_final_version = updated
        .latest_version()
        .is_none_or(|version| version.is_preliminary);
    if needs_final_version {
        push_version(&mut updated, false, REASON_FINAL, now);
    }

    updated.is_finalized = true;
    updated.finalized_at = Some(now);

    Ok(FinalizeOutcome::Finalized(updated))
}
