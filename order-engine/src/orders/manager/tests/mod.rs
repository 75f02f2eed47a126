use super::*;
use crate::notification::{LocalInFlightLock, TimestampSource};
use crate::test_support::{
    FlakyStore, RecordingDispatcher, create_test_customer, create_test_items, create_test_order,
};
use shared::order::{Customer, NotificationKind, OrderEventType};
use std::time::Duration;


struct TestManager {
    manager: OrdersManager,
    store: Arc<FlakyStore>,
    dispatcher: Arc<RecordingDispatcher>,
    storage: OrderStorage,
}

fn create_test_manager() -> TestManager {
    create_test_manager_with(RecordingDispatcher::new())
}

fn create_test_manager_with(dispatcher: RecordingDispatcher) -> TestManager {
    let storage = OrderStorage::open_in_memory().unwrap();
    let store = Arc::new(FlakyStore::new(storage.clone()));
    let dispatcher = Arc::new(dispatcher);
    let manager = OrdersManager::with_parts(
        store.clone(),
        PendingEmailQueue::new(storage.clone()),
        dispatcher.clone(),
        Arc::new(LocalInFlightLock::new(Duration::from_secs(30))),
    );
    TestManager {
        manager,
        store,
        dispatcher,
        storage,
    }
}

fn new_order(order_id: &str) -> NewOrder {
    NewOrder {
        id: Some(order_id.to_string()),
        customer: create_test_customer(),
        items: create_test_items(),
        ..Default::default()
    }
}

fn customer_without_email() -> Customer {
    Customer {
        email: String::new(),
        ..create_test_customer()
    }
}

async fn create_order(t: &TestManager, order_id: &str) -> Order {
    t.manager.create_order(new_order(order_id)).await.unwrap().order
}

/// Drain every event currently buffered on `rx`
fn drain_types(rx: &mut broadcast::Receiver<OrderEvent>) -> Vec<OrderEventType> {
    let mut types = Vec::new();
    while let Ok(event) = rx.try_recv() {
        types.push(event.event_type());
    }
    types
}
