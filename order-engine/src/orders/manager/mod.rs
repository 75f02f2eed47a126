//! OrdersManager - façade over the order lifecycle engine
//!
//! Admin actions enter here. Each action validates its input before any
//! I/O, writes through the [`OrderRepository`], mirrors the canonical
//! document into the working copy and publishes an [`OrderEvent`].
//!
//! # Component Wiring
//!
//! ```text
//! OrdersManager
//!     ├── OrderStateMachine ──► InventoryReconciler
//!     ├── ledger (record_edit / finalize)
//!     ├── NotificationCoordinator ──► EmailDispatcher, InFlightLock, PendingEmailQueue
//!     ├── OrderRepository ──► DocumentStore (redb)
//!     │        └── subscribe ──► OrderCache::run (working copy)
//!     └── EventBus ──► subscribers
//! ```

use super::cache::OrderCache;
use super::error::{OrderError, OrderResult};
use super::inventory::{InventoryReconciler, RestockOutcome};
use super::ledger::{self, FinalizeOutcome};
use super::repository::OrderRepository;
use super::state_machine::{
    CancellationOutcome, OrderStateMachine, PendingCancellation, TransitionOutcome,
};
use super::storage::{OrderStorage, StorageError};
use super::traits::DocumentStore;
use crate::core::{Config, EventBus};
use crate::notification::{
    AutoSendOutcome, EmailDispatcher, HttpEmailDispatcher, InFlightLock, LocalInFlightLock,
    NotificationCoordinator, NotificationReceipt, PendingEmailQueue, RetryReport,
};
use crate::pricing::{self, money};
use chrono::Utc;
use shared::order::{
    AdminNote, Customer, Discount, EventPayload, InventoryRecord, InvoiceSlice, LineItem, Order,
    OrderEvent, OrderStatus, PaymentInfo, PendingEmail,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Checkout input for a new order
#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    /// Generated when absent
    pub id: Option<String>,
    pub customer: Customer,
    pub items: Vec<LineItem>,
    pub discount: Option<Discount>,
    /// `(method, timing)`
    pub payment: Option<(String, String)>,
}

/// A created order and the outcome of its automatic confirmation email
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedOrder {
    pub order: Order,
    /// `None` when no email could be attempted (no address, or lock held)
    pub email: Option<AutoSendOutcome>,
}

pub struct OrdersManager {
    repository: OrderRepository,
    cache: Arc<OrderCache>,
    events: EventBus,
    state_machine: OrderStateMachine,
    reconciler: InventoryReconciler,
    notifications: NotificationCoordinator,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("repository", &self.repository)
            .field("cached_orders", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl OrdersManager {
    /// Open the redb store under the work directory and wire the HTTP dispatcher
    pub fn open(config: &Config) -> OrderResult<Self> {
        std::fs::create_dir_all(&config.work_dir).map_err(StorageError::from)?;
        let storage = OrderStorage::open(config.database_path())?;

        let dispatcher = HttpEmailDispatcher::new(
            config.email_service_url.clone(),
            config.invoice_service_url.clone(),
            config.email_timeout(),
        )
        .map_err(|e| OrderError::Config(e.to_string()))?;

        tracing::info!(
            path = %config.database_path().display(),
            "Order store opened"
        );

        Ok(Self::with_parts(
            Arc::new(storage.clone()),
            PendingEmailQueue::new(storage),
            Arc::new(dispatcher),
            Arc::new(LocalInFlightLock::new(config.notify_lock_ttl())),
        ))
    }

    /// Wire the engine from explicit collaborators
    pub fn with_parts(
        store: Arc<dyn DocumentStore>,
        queue: PendingEmailQueue,
        dispatcher: Arc<dyn EmailDispatcher>,
        lock: Arc<dyn InFlightLock>,
    ) -> Self {
        let repository = OrderRepository::new(store);
        let cache = Arc::new(OrderCache::new());
        let events = EventBus::default();
        let reconciler = InventoryReconciler::new(repository.clone(), events.clone());
        let state_machine = OrderStateMachine::new(
            repository.clone(),
            Arc::clone(&cache),
            events.clone(),
            reconciler.clone(),
        );
        let notifications = NotificationCoordinator::new(
            repository.clone(),
            Arc::clone(&cache),
            events.clone(),
            dispatcher,
            lock,
            queue,
        );

        Self {
            repository,
            cache,
            events,
            state_machine,
            reconciler,
            notifications,
        }
    }

    /// Prime the working copy and keep it in sync with the store
    ///
    /// Must be called inside a tokio runtime.
    pub fn start_sync(&self) -> OrderResult<JoinHandle<()>> {
        let rx = self.repository.subscribe();
        self.cache.prime(self.repository.list()?);
        tracing::info!(orders = self.cache.len(), "Order working copy primed");
        Ok(tokio::spawn(Arc::clone(&self.cache).run(rx)))
    }

    // ========== Subscriptions ==========

    pub fn subscribe_events(&self) -> broadcast::Receiver<OrderEvent> {
        self.events.subscribe()
    }

    /// Canonical documents pushed after each write
    pub fn subscribe_orders(&self) -> broadcast::Receiver<Order> {
        self.repository.subscribe()
    }

    // ========== Reads ==========

    /// Canonical order from the store of record
    pub fn get_order(&self, order_id: &str) -> OrderResult<Order> {
        self.repository.get(order_id)
    }

    /// Working copy, if present
    pub fn cached_order(&self, order_id: &str) -> Option<Order> {
        self.cache.get(order_id)
    }

    pub fn list_orders(&self) -> OrderResult<Vec<Order>> {
        self.repository.list()
    }

    /// Commit, mirror into the working copy and publish
    fn commit<F>(&self, order_id: &str, payload: EventPayload, mutate: F) -> OrderResult<Order>
    where
        F: FnMut(&mut Order) -> OrderResult<()>,
    {
        let order = self.repository.update(order_id, mutate)?;
        self.cache.replace(order.clone());
        self.events.publish(OrderEvent::new(order_id, payload));
        Ok(order)
    }

    // ========== Creation ==========

    /// Persist a checkout order, then attempt the confirmation email
    ///
    /// A failed email never fails the creation; it parks the order in the
    /// manual email queue instead.
    pub async fn create_order(&self, input: NewOrder) -> OrderResult<CreatedOrder> {
        money::validate_items(&input.items)?;
        if let Some(discount) = &input.discount {
            money::validate_discount(discount)?;
        }
        if input.customer.name.trim().is_empty() {
            return Err(OrderError::Validation("Customer name is required".to_string()));
        }

        let id = input
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut order = Order::new(id, input.customer, input.items);
        order.discount = input.discount;
        order.payment = input.payment.map(|(method, timing)| PaymentInfo {
            method,
            timing,
            updated_at: order.date,
        });
        pricing::reprice(&mut order);

        self.repository.create(&order)?;
        self.cache.replace(order.clone());
        crate::audit_log!(order.id, "order_created", format!("total={:.2}", order.total));
        self.events.publish(OrderEvent::new(
            order.id.clone(),
            EventPayload::OrderCreated { total: order.total },
        ));

        let email = if order.customer.contact_email().is_none() {
            tracing::info!(order_id = %order.id, "No customer email, skipping confirmation");
            None
        } else {
            match self.notifications.notify_order_created(&order).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::warn!(order_id = %order.id, error = %e, "Confirmation email not attempted");
                    None
                }
            }
        };

        let order = self.cache.get(&order.id).unwrap_or(order);
        Ok(CreatedOrder { order, email })
    }

    // ========== Status ==========

    pub fn request_transition(
        &self,
        order_id: &str,
        target: OrderStatus,
    ) -> OrderResult<TransitionOutcome> {
        self.state_machine.request_transition(order_id, target)
    }

    pub fn confirm_cancellation(&self, order_id: &str) -> OrderResult<CancellationOutcome> {
        self.state_machine.confirm_cancellation(order_id)
    }

    pub fn decline_cancellation(&self, order_id: &str) -> OrderResult<()> {
        self.state_machine.decline_cancellation(order_id)
    }

    pub fn pending_cancellation(&self) -> Option<PendingCancellation> {
        self.state_machine.pending_cancellation()
    }

    /// Retry inventory restoration for a cancelled order
    pub fn restore_stock(&self, order_id: &str) -> OrderResult<RestockOutcome> {
        let order = self.repository.get(order_id)?;
        let outcome = self.reconciler.reconcile(&order)?;
        if let Ok(latest) = self.repository.get(order_id) {
            self.cache.replace(latest);
        }
        Ok(outcome)
    }

    // ========== Ledger ==========

    /// Replace the item set, appending a ledger version
    pub fn record_edit(
        &self,
        order_id: &str,
        new_items: Vec<LineItem>,
        finalize: bool,
    ) -> OrderResult<Order> {
        money::validate_items(&new_items)?;

        let now = Utc::now();
        let mut newly_finalized = false;
        let order = self.repository.update(order_id, |order| {
            let edited = ledger::record_edit(order, new_items.clone(), finalize, now)?;
            newly_finalized = edited.is_finalized && !order.is_finalized;
            *order = edited;
            Ok(())
        })?;
        self.cache.replace(order.clone());

        let version_number = order.versions.len() as u32;
        crate::audit_log!(
            order_id,
            "items_edited",
            format!("v{} total={:.2} finalize={}", version_number, order.total, finalize)
        );
        self.events.publish(OrderEvent::new(
            order_id,
            EventPayload::ItemsEdited {
                version_number,
                total: order.total,
                finalized: order.is_finalized,
            },
        ));
        if newly_finalized {
            self.events.publish(OrderEvent::new(
                order_id,
                EventPayload::OrderFinalized { total: order.total },
            ));
        }

        Ok(order)
    }

    /// Finalize the current item set; a second call reports `AlreadyFinalized`
    pub fn finalize(&self, order_id: &str) -> OrderResult<FinalizeOutcome> {
        let current = self.repository.get(order_id)?;
        if current.is_finalized && !current.is_cancelled() {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }

        let now = Utc::now();
        let mut already = false;
        let order = self.repository.update(order_id, |order| {
            match ledger::finalize(order, now)? {
                FinalizeOutcome::Finalized(finalized) => *order = finalized,
                FinalizeOutcome::AlreadyFinalized => already = true,
            }
            Ok(())
        })?;
        self.cache.replace(order.clone());

        if already {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }

        crate::audit_log!(order_id, "order_finalized", format!("total={:.2}", order.total));
        self.events.publish(OrderEvent::new(
            order_id,
            EventPayload::OrderFinalized { total: order.total },
        ));
        Ok(FinalizeOutcome::Finalized(order))
    }

    // ========== Other admin edits ==========

    pub fn apply_discount(&self, order_id: &str, discount: Discount) -> OrderResult<Order> {
        money::validate_discount(&discount)?;

        let payload = EventPayload::OrderInfoUpdated {
            field: "discount".to_string(),
        };
        let order = self.commit(order_id, payload, |order| {
            if order.is_cancelled() {
                return Err(OrderError::AlreadyTerminal(order.id.clone()));
            }
            order.discount = Some(discount.clone());
            pricing::reprice(order);
            Ok(())
        })?;
        crate::audit_log!(
            order_id,
            "discount_applied",
            format!("{:.2} ({})", discount.amount, discount.reason)
        );
        Ok(order)
    }

    pub fn remove_discount(&self, order_id: &str) -> OrderResult<Order> {
        let payload = EventPayload::OrderInfoUpdated {
            field: "discount".to_string(),
        };
        let order = self.commit(order_id, payload, |order| {
            if order.is_cancelled() {
                return Err(OrderError::AlreadyTerminal(order.id.clone()));
            }
            order.discount = None;
            pricing::reprice(order);
            Ok(())
        })?;
        crate::audit_log!(order_id, "discount_removed");
        Ok(order)
    }

    /// Append an admin note
    pub fn add_admin_note(&self, order_id: &str, note: &str, added_by: &str) -> OrderResult<Order> {
        let note = note.trim();
        if note.is_empty() {
            return Err(OrderError::Validation("Note cannot be empty".to_string()));
        }

        let entry = AdminNote {
            note: note.to_string(),
            timestamp: Utc::now(),
            added_by: added_by.to_string(),
        };
        let payload = EventPayload::OrderInfoUpdated {
            field: "note".to_string(),
        };
        self.commit(order_id, payload, |order| {
            order.admin_notes.push(entry.clone());
            Ok(())
        })
    }

    pub fn update_payment(&self, order_id: &str, method: &str, timing: &str) -> OrderResult<Order> {
        if method.trim().is_empty() {
            return Err(OrderError::Validation("Payment method is required".to_string()));
        }

        let payment = PaymentInfo {
            method: method.trim().to_string(),
            timing: timing.trim().to_string(),
            updated_at: Utc::now(),
        };
        let payload = EventPayload::OrderInfoUpdated {
            field: "payment".to_string(),
        };
        self.commit(order_id, payload, |order| {
            order.payment = Some(payment.clone());
            Ok(())
        })
    }

    /// Flip one invoice payment flag; the others are untouched
    pub fn toggle_invoice_payment(&self, order_id: &str, slice: InvoiceSlice) -> OrderResult<Order> {
        let payload = EventPayload::OrderInfoUpdated {
            field: "invoice_payments".to_string(),
        };
        let mut paid = false;
        let order = self.commit(order_id, payload, |order| {
            paid = order.invoice_payments.toggle(slice);
            Ok(())
        })?;
        tracing::debug!(order_id = %order_id, slice = ?slice, paid, "Invoice payment toggled");
        Ok(order)
    }

    // ========== Notifications ==========

    pub async fn send_order_email(
        &self,
        order_id: &str,
        force_resend: bool,
    ) -> OrderResult<NotificationReceipt> {
        let order = self.repository.get(order_id)?;
        self.notifications.send_order_email(&order, force_resend).await
    }

    pub async fn send_invoice_email(
        &self,
        order_id: &str,
        is_standalone: bool,
    ) -> OrderResult<NotificationReceipt> {
        let order = self.repository.get(order_id)?;
        self.notifications
            .send_invoice_email(&order, is_standalone)
            .await
    }

    pub fn pending_emails(&self) -> OrderResult<Vec<PendingEmail>> {
        Ok(self.notifications.queue().list_pending()?)
    }

    pub fn all_queued_emails(&self) -> OrderResult<Vec<PendingEmail>> {
        Ok(self.notifications.queue().list_all()?)
    }

    pub fn dismiss_queued_email(&self, order_id: &str) -> OrderResult<Option<PendingEmail>> {
        Ok(self.notifications.queue().dequeue(order_id)?)
    }

    pub async fn resend_pending(&self, order_id: &str) -> OrderResult<NotificationReceipt> {
        self.notifications.resend_pending(order_id).await
    }

    pub async fn retry_pending_emails(&self) -> OrderResult<RetryReport> {
        self.notifications.retry_all_pending().await
    }

    // ========== Inventory ==========

    pub fn get_inventory(&self, plant_id: &str) -> OrderResult<Option<InventoryRecord>> {
        self.repository.get_inventory(plant_id)
    }

    pub fn set_inventory(&self, plant_id: &str, current_stock: i64) -> OrderResult<()> {
        self.repository.set_inventory(plant_id, current_stock)
    }
}

#[cfg(test)]
mod tests;
