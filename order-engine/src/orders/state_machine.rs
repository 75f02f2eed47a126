//! Order status state machine
//!
//! Transitions between `pending`, `processing`, `shipped` and `completed`
//! are admin-directed and may jump in any direction. `cancelled` is
//! terminal and goes through a two-step protocol:
//!
//! ```text
//! request_transition(id, Cancelled) ──► AwaitingConfirmation (slot filled)
//!        │
//!        ├── confirm_cancellation(id) ──► status=cancelled ──► InventoryReconciler
//!        └── decline_cancellation(id) ──► slot cleared, status unchanged
//! ```
//!
//! The pending slot holds one request. It has no timeout; a cancel request
//! for another order overwrites it.

use super::cache::OrderCache;
use super::error::{OrderError, OrderResult};
use super::inventory::{InventoryReconciler, RestockOutcome};
use super::repository::OrderRepository;
use crate::core::EventBus;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared::order::{EventPayload, Order, OrderEvent, OrderStatus};
use std::sync::Arc;

/// A cancellation waiting for admin confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCancellation {
    pub order_id: String,
    /// Status at the time of the request
    pub current: OrderStatus,
    pub requested_at: DateTime<Utc>,
}

/// Result of a transition request
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Status written and mirrored into the working copy
    Applied(Order),
    /// Cancellation must be confirmed first
    AwaitingConfirmation {
        order_id: String,
        current: OrderStatus,
    },
    /// Target equals the current status; nothing written
    Unchanged(Order),
}

/// Result of a confirmed cancellation
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationOutcome {
    pub order: Order,
    /// `None` when restocking failed; retry with the manager's `restore_stock`
    pub restock: Option<RestockOutcome>,
}

pub struct OrderStateMachine {
    repository: OrderRepository,
    cache: Arc<OrderCache>,
    events: EventBus,
    reconciler: InventoryReconciler,
    pending: Mutex<Option<PendingCancellation>>,
}

impl std::fmt::Debug for OrderStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStateMachine")
            .field("pending", &*self.pending.lock())
            .finish_non_exhaustive()
    }
}

impl OrderStateMachine {
    pub fn new(
        repository: OrderRepository,
        cache: Arc<OrderCache>,
        events: EventBus,
        reconciler: InventoryReconciler,
    ) -> Self {
        Self {
            repository,
            cache,
            events,
            reconciler,
            pending: Mutex::new(None),
        }
    }

    pub fn pending_cancellation(&self) -> Option<PendingCancellation> {
        self.pending.lock().clone()
    }

    fn has_pending(&self, order_id: &str) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|p| p.order_id == order_id)
    }

    /// Take the pending slot if it belongs to `order_id`
    fn take_pending(&self, order_id: &str) -> Option<PendingCancellation> {
        let mut slot = self.pending.lock();
        if slot.as_ref().is_some_and(|p| p.order_id == order_id) {
            slot.take()
        } else {
            None
        }
    }

    pub fn request_transition(
        &self,
        order_id: &str,
        target: OrderStatus,
    ) -> OrderResult<TransitionOutcome> {
        let current = self.repository.get(order_id)?;
        if current.is_cancelled() {
            tracing::warn!(order_id = %order_id, to = %target, "Transition rejected, order is cancelled");
            return Err(OrderError::AlreadyTerminal(order_id.to_string()));
        }

        if target == OrderStatus::Cancelled {
            let request = PendingCancellation {
                order_id: order_id.to_string(),
                current: current.status,
                requested_at: Utc::now(),
            };
            if let Some(replaced) = self.pending.lock().replace(request)
                && replaced.order_id != order_id
            {
                tracing::debug!(
                    order_id = %replaced.order_id,
                    "Pending cancellation overwritten by a new request"
                );
            }
            self.events.publish(OrderEvent::new(
                order_id,
                EventPayload::CancellationRequested {
                    current: current.status,
                },
            ));
            return Ok(TransitionOutcome::AwaitingConfirmation {
                order_id: order_id.to_string(),
                current: current.status,
            });
        }

        // Any other admin action on the order dismisses its pending cancel
        self.take_pending(order_id);

        if current.status == target {
            return Ok(TransitionOutcome::Unchanged(current));
        }

        let mut from = current.status;
        let updated = self.repository.update(order_id, |order| {
            if order.is_cancelled() {
                return Err(OrderError::AlreadyTerminal(order.id.clone()));
            }
            from = order.status;
            order.status = target;
            Ok(())
        })?;

        self.cache.replace(updated.clone());
        crate::audit_log!(order_id, "status_changed", format!("{} -> {}", from, target));
        self.events.publish(OrderEvent::new(
            order_id,
            EventPayload::StatusChanged { from, to: target },
        ));

        Ok(TransitionOutcome::Applied(updated))
    }

    /// Commit a pending cancellation and restore inventory
    pub fn confirm_cancellation(&self, order_id: &str) -> OrderResult<CancellationOutcome> {
        if !self.has_pending(order_id) {
            return Err(OrderError::NoPendingCancellation(order_id.to_string()));
        }

        let mut from = OrderStatus::Pending;
        let written = self.repository.update(order_id, |order| {
            if order.is_cancelled() {
                return Err(OrderError::AlreadyTerminal(order.id.clone()));
            }
            from = order.status;
            order.status = OrderStatus::Cancelled;
            Ok(())
        });
        // A failed write keeps the request so the admin can confirm again
        let cancelled = match written {
            Ok(order) => {
                self.take_pending(order_id);
                order
            }
            Err(e @ (OrderError::AlreadyTerminal(_) | OrderError::OrderNotFound(_))) => {
                self.take_pending(order_id);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        self.cache.replace(cancelled.clone());
        crate::audit_log!(order_id, "order_cancelled", format!("from {}", from));
        self.events.publish(OrderEvent::new(
            order_id,
            EventPayload::OrderCancelled { from },
        ));

        let restock = match self.reconciler.reconcile(&cancelled) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(
                    order_id = %order_id,
                    error = %e,
                    "Stock restoration failed after cancellation"
                );
                None
            }
        };

        // Pick up the stock_restored flag
        let order = match self.repository.get(order_id) {
            Ok(order) => {
                self.cache.replace(order.clone());
                order
            }
            Err(_) => cancelled,
        };

        Ok(CancellationOutcome { order, restock })
    }

    /// Dismiss a pending cancellation; status is left unchanged
    pub fn decline_cancellation(&self, order_id: &str) -> OrderResult<()> {
        if self.take_pending(order_id).is_none() {
            return Err(OrderError::NoPendingCancellation(order_id.to_string()));
        }
        tracing::debug!(order_id = %order_id, "Cancellation declined");
        self.events
            .publish(OrderEvent::new(order_id, EventPayload::CancellationDeclined));
        Ok(())
    }
}
