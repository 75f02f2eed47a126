//! OrderRepository - the single read/write/subscribe façade over the store
//!
//! Every component reads and writes orders through this type. After each
//! successful commit the canonical document is pushed to subscribers, which
//! replace their working copy wholesale.

use super::error::{OrderError, OrderResult};
use super::traits::{DocumentStore, RestockReport};
use chrono::{DateTime, Utc};
use shared::order::{InventoryRecord, NotificationKind, Order};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Subscription channel capacity
const ORDER_CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone)]
pub struct OrderRepository {
    store: Arc<dyn DocumentStore>,
    order_tx: broadcast::Sender<Order>,
}

impl std::fmt::Debug for OrderRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderRepository")
            .field("store", &"<DocumentStore>")
            .field("subscribers", &self.order_tx.receiver_count())
            .finish()
    }
}

impl OrderRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let (order_tx, _) = broadcast::channel(ORDER_CHANNEL_CAPACITY);
        Self { store, order_tx }
    }

    /// Subscribe to canonical order documents after each write
    pub fn subscribe(&self) -> broadcast::Receiver<Order> {
        self.order_tx.subscribe()
    }

    fn publish(&self, order: &Order) {
        // No subscribers is fine
        let _ = self.order_tx.send(order.clone());
    }

    // ========== Orders ==========

    pub fn get(&self, order_id: &str) -> OrderResult<Order> {
        self.store
            .read_order(order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    pub fn find(&self, order_id: &str) -> OrderResult<Option<Order>> {
        self.store.read_order(order_id)
    }

    pub fn list(&self) -> OrderResult<Vec<Order>> {
        self.store.list_orders()
    }

    pub fn create(&self, order: &Order) -> OrderResult<()> {
        self.store.insert_order(order)?;
        tracing::debug!(order_id = %order.id, "Order document created");
        self.publish(order);
        Ok(())
    }

    /// Atomic read-modify-write; nothing is written if `mutate` fails
    pub fn update<F>(&self, order_id: &str, mut mutate: F) -> OrderResult<Order>
    where
        F: FnMut(&mut Order) -> OrderResult<()>,
    {
        let order = self.store.update_order(order_id, &mut mutate)?;
        self.publish(&order);
        Ok(order)
    }

    /// Restock and set `stock_restored` in one transaction
    pub fn restore_stock(
        &self,
        order_id: &str,
        lines: &[(String, u32)],
    ) -> OrderResult<Option<RestockReport>> {
        let report = self.store.restore_stock(order_id, lines)?;
        if report.is_some() {
            // Push the flag change to subscribers
            match self.store.read_order(order_id) {
                Ok(Some(order)) => self.publish(&order),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(order_id = %order_id, error = %e, "Failed to re-read order after restock")
                }
            }
        }
        Ok(report)
    }

    /// Set a notification flag with the store-of-record timestamp
    pub fn stamp_notification(&self, order_id: &str, kind: NotificationKind) -> OrderResult<Order> {
        let order = self.store.stamp_notification(order_id, kind)?;
        self.publish(&order);
        Ok(order)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.store.now()
    }

    // ========== Inventory ==========

    pub fn get_inventory(&self, plant_id: &str) -> OrderResult<Option<InventoryRecord>> {
        self.store.read_inventory(plant_id)
    }

    pub fn set_inventory(&self, plant_id: &str, current_stock: i64) -> OrderResult<()> {
        let record = InventoryRecord {
            current_stock,
            updated_at: Some(self.now()),
        };
        self.store.write_inventory(plant_id, &record)
    }
}
