//! Store seam for the order engine
//!
//! The repository talks to the keyed document store only through
//! [`DocumentStore`]. `OrderStorage` (redb) is the production implementation.

use super::error::OrderResult;
use chrono::{DateTime, Utc};
use shared::order::{InventoryRecord, NotificationKind, Order, StockRestoration};

/// Outcome of an inventory restock transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestockReport {
    /// Records that were incremented
    pub restorations: Vec<StockRestoration>,
    /// Plant ids with no inventory record (skipped)
    pub missing: Vec<String>,
}

/// Keyed document store holding `orders/{id}` and `inventory/{plantId}`
pub trait DocumentStore: Send + Sync {
    fn read_order(&self, order_id: &str) -> OrderResult<Option<Order>>;

    fn list_orders(&self) -> OrderResult<Vec<Order>>;

    /// Insert a new order; fails with `OrderAlreadyExists` if the id is taken
    fn insert_order(&self, order: &Order) -> OrderResult<()>;

    /// Atomic read-modify-write of one order document
    ///
    /// If `mutate` returns an error nothing is written.
    fn update_order(
        &self,
        order_id: &str,
        mutate: &mut dyn FnMut(&mut Order) -> OrderResult<()>,
    ) -> OrderResult<Order>;

    fn read_inventory(&self, plant_id: &str) -> OrderResult<Option<InventoryRecord>>;

    fn write_inventory(&self, plant_id: &str, record: &InventoryRecord) -> OrderResult<()>;

    /// Increment stock for each `(plant_id, quantity)` and set the order's
    /// `stock_restored` flag, all in one transaction.
    ///
    /// Returns `None` when the flag was already set.
    fn restore_stock(
        &self,
        order_id: &str,
        lines: &[(String, u32)],
    ) -> OrderResult<Option<RestockReport>>;

    /// Clock of the store of record
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Set a notification flag, timestamped by the store clock
    fn stamp_notification(&self, order_id: &str, kind: NotificationKind) -> OrderResult<Order> {
        let at = self.now();
        self.update_order(order_id, &mut |order| {
            order.mark_notification_sent(kind, at);
            Ok(())
        })
    }
}
