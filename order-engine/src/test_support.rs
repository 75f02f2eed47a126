//! Test doubles shared by unit tests

use crate::notification::{DispatchError, DispatchRequest, DispatchResponse, EmailDispatcher};
use crate::orders::storage::{OrderStorage, StorageError};
use crate::orders::traits::{DocumentStore, RestockReport};
use crate::orders::{OrderError, OrderResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::order::{Customer, InventoryRecord, LineItem, NotificationKind, Order};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

pub fn create_test_customer() -> Customer {
    Customer {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "555-0100".to_string(),
        notes: String::new(),
    }
}

/// 2 x $10 monstera + a free cutting: subtotal 20, total 22.40
pub fn create_test_items() -> Vec<LineItem> {
    vec![
        LineItem::new("monstera", "Monstera", 10.0, 2),
        LineItem::new("cutting", "Pothos cutting", 5.0, 1).freebie(),
    ]
}

pub fn create_test_order(order_id: &str) -> Order {
    Order::new(order_id, create_test_customer(), create_test_items())
}

// ============================================================================
// Email dispatcher double
// ============================================================================

/// Records every dispatch; can fail or block on a gate
#[derive(Default)]
pub struct RecordingDispatcher {
    calls: AtomicUsize,
    requests: Mutex<Vec<DispatchRequest>>,
    fail_with: Mutex<Option<String>>,
    transport_down: AtomicBool,
    gate: Option<Arc<Notify>>,
    started: Arc<Notify>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every dispatch waits on `gate` before answering
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Answer `{success: false, message}` from now on
    pub fn fail_with(&self, message: &str) {
        *self.fail_with.lock() = Some(message.to_string());
    }

    /// Fail at the transport level from now on
    pub fn take_down(&self) {
        self.transport_down.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        *self.fail_with.lock() = None;
        self.transport_down.store(false, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DispatchRequest> {
        self.requests.lock().clone()
    }

    /// Notified when a dispatch has started
    pub fn started(&self) -> Arc<Notify> {
        Arc::clone(&self.started)
    }
}

#[async_trait]
impl EmailDispatcher for RecordingDispatcher {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        self.started.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        if self.transport_down.load(Ordering::SeqCst) {
            return Err(DispatchError::Unavailable("connection refused".to_string()));
        }
        let failure = self.fail_with.lock().clone();
        Ok(match failure {
            Some(message) => DispatchResponse::failed(message),
            None => DispatchResponse::ok(),
        })
    }
}

// ============================================================================
// Document store double
// ============================================================================

/// Wraps the redb store and fails selected operations on demand
pub struct FlakyStore {
    inner: OrderStorage,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_stamps: AtomicBool,
    fail_restock: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: OrderStorage) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            fail_stamps: AtomicBool::new(false),
            fail_restock: AtomicBool::new(false),
        }
    }

    /// Point reads only; writes read inside their own transaction
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stamps(&self, fail: bool) {
        self.fail_stamps.store(fail, Ordering::SeqCst);
    }

    pub fn fail_restock(&self, fail: bool) {
        self.fail_restock.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> OrderResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(OrderError::Storage(StorageError::Unavailable(
                "injected failure".to_string(),
            )));
        }
        Ok(())
    }
}

impl DocumentStore for FlakyStore {
    fn read_order(&self, order_id: &str) -> OrderResult<Option<Order>> {
        Self::check(&self.fail_reads)?;
        self.inner.read_order(order_id)
    }

    fn list_orders(&self) -> OrderResult<Vec<Order>> {
        self.inner.list_orders()
    }

    fn insert_order(&self, order: &Order) -> OrderResult<()> {
        Self::check(&self.fail_writes)?;
        self.inner.insert_order(order)
    }

    fn update_order(
        &self,
        order_id: &str,
        mutate: &mut dyn FnMut(&mut Order) -> OrderResult<()>,
    ) -> OrderResult<Order> {
        Self::check(&self.fail_writes)?;
        self.inner.update_order(order_id, mutate)
    }

    fn read_inventory(&self, plant_id: &str) -> OrderResult<Option<InventoryRecord>> {
        self.inner.read_inventory(plant_id)
    }

    fn write_inventory(&self, plant_id: &str, record: &InventoryRecord) -> OrderResult<()> {
        Self::check(&self.fail_writes)?;
        self.inner.write_inventory(plant_id, record)
    }

    fn restore_stock(
        &self,
        order_id: &str,
        lines: &[(String, u32)],
    ) -> OrderResult<Option<RestockReport>> {
        Self::check(&self.fail_restock)?;
        self.inner.restore_stock(order_id, lines)
    }

    fn stamp_notification(&self, order_id: &str, kind: NotificationKind) -> OrderResult<Order> {
        Self::check(&self.fail_stamps)?;
        self.inner.stamp_notification(order_id, kind)
    }
}
