//! Inventory reconciliation on cancellation
//!
//! Restores stock for every non-freebie line of a cancelled order. The
//! persisted `stock_restored` flag is checked and set inside the same store
//! transaction as the increments, so racing confirmations restore once.

use super::error::{OrderError, OrderResult};
use super::repository::OrderRepository;
use crate::core::EventBus;
use shared::order::{EventPayload, Order, OrderEvent, StockRestoration};
use std::collections::BTreeMap;

/// Result of a reconciliation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestockOutcome {
    Restored {
        restorations: Vec<StockRestoration>,
        /// Plant ids without an inventory record
        missing: Vec<String>,
    },
    /// The order's stock had already been restored
    AlreadyRestored,
}

/// Quantities to restore per plant id, freebies and empty lines excluded
pub fn restock_lines(order: &Order) -> Vec<(String, u32)> {
    let mut totals: BTreeMap<String, u32> = BTreeMap::new();
    for item in order.items.iter().filter(|item| !item.is_freebie && item.quantity > 0) {
        let entry = totals.entry(item.id.clone()).or_insert(0);
        *entry = entry.saturating_add(item.quantity);
    }
    totals.into_iter().collect()
}

#[derive(Debug, Clone)]
pub struct InventoryReconciler {
    repository: OrderRepository,
    events: EventBus,
}

impl InventoryReconciler {
    pub fn new(repository: OrderRepository, events: EventBus) -> Self {
        Self { repository, events }
    }

    /// Restore stock for a cancelled order, at most once per order
    pub fn reconcile(&self, order: &Order) -> OrderResult<RestockOutcome> {
        if !order.is_cancelled() {
            return Err(OrderError::Validation(format!(
                "Stock can only be restored for cancelled orders ({} is {})",
                order.id, order.status
            )));
        }
        if order.stock_restored {
            return Ok(RestockOutcome::AlreadyRestored);
        }

        let lines = restock_lines(order);
        let Some(report) = self.repository.restore_stock(&order.id, &lines)? else {
            tracing::debug!(order_id = %order.id, "Stock already restored, skipping");
            return Ok(RestockOutcome::AlreadyRestored);
        };

        crate::audit_log!(
            order.id,
            "stock_restored",
            format!(
                "{} lines restored, {} missing",
                report.restorations.len(),
                report.missing.len()
            )
        );
        self.events.publish(OrderEvent::new(
            order.id.clone(),
            EventPayload::StockRestored {
                restorations: report.restorations.clone(),
            },
        ));

        Ok(RestockOutcome::Restored {
            restorations: report.restorations,
            missing: report.missing,
        })
    }
}
