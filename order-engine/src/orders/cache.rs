//! Process-local working copy of orders
//!
//! Fed by the repository subscription. Each pushed document replaces the
//! cached one wholesale; there is no field-level merge, so the last write
//! wins.

use dashmap::DashMap;
use shared::order::Order;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Default)]
pub struct OrderCache {
    orders: DashMap<String, Order>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|entry| entry.value().clone())
    }

    /// Replace the working copy of one order
    pub fn replace(&self, order: Order) {
        self.orders.insert(order.id.clone(), order);
    }

    /// Load a full listing (startup or after lag)
    pub fn prime(&self, orders: Vec<Order>) {
        self.orders.clear();
        for order in orders {
            self.replace(order);
        }
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Apply subscription pushes until the channel closes
    pub async fn run(self: Arc<Self>, mut source: broadcast::Receiver<Order>) {
        tracing::debug!("Order cache sync started");

        loop {
            match source.recv().await {
                Ok(order) => self.replace(order),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Order cache lagged, working copy may be stale");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("Order subscription closed, cache sync stopping");
                    break;
                }
            }
        }
    }
}
