//! End-to-end admin flow against an on-disk store

use async_trait::async_trait;
use order_engine::notification::{
    DispatchError, DispatchRequest, DispatchResponse, EmailDispatcher, LocalInFlightLock,
    PendingEmailQueue,
};
use order_engine::orders::{
    FinalizeOutcome, NewOrder, OrderError, OrderStorage, OrdersManager, RestockOutcome,
    TransitionOutcome,
};
use shared::order::{
    Customer, Discount, EventPayload, InvoiceSlice, LineItem, NotificationKind, OrderStatus,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct TestDispatcher {
    down: AtomicBool,
    sent: AtomicUsize,
}

#[async_trait]
impl EmailDispatcher for TestDispatcher {
    async fn dispatch(&self, _request: &DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(DispatchError::Unavailable("email service offline".to_string()));
        }
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(DispatchResponse::ok())
    }
}

fn open_manager(path: &Path, dispatcher: Arc<TestDispatcher>) -> OrdersManager {
    let storage = OrderStorage::open(path).unwrap();
    OrdersManager::with_parts(
        Arc::new(storage.clone()),
        PendingEmailQueue::new(storage),
        dispatcher,
        Arc::new(LocalInFlightLock::new(Duration::from_secs(30))),
    )
}

fn checkout(order_id: &str) -> NewOrder {
    NewOrder {
        id: Some(order_id.to_string()),
        customer: Customer {
            name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            phone: "555-0123".to_string(),
            notes: "Pickup Saturday".to_string(),
        },
        items: vec![
            LineItem::new("fiddle-leaf", "Fiddle leaf fig", 45.0, 1),
            LineItem::new("pothos", "Golden pothos", 12.5, 2),
            LineItem::new("succulent", "Mini succulent", 4.0, 1).freebie(),
        ],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_pickup_edit_finalize_and_invoice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.redb");
    let dispatcher = Arc::new(TestDispatcher::default());
    let manager = open_manager(&path, dispatcher.clone());

    let created = manager.create_order(checkout("ord-100")).await.unwrap();
    // 70.00 + 3.50 GST + 4.90 PST
    assert_eq!(created.order.total, 78.4);
    assert!(created.order.email_sent);

    manager
        .request_transition("ord-100", OrderStatus::Processing)
        .unwrap();

    // Customer swaps one pothos for a second fig at pickup
    let edited = manager
        .record_edit(
            "ord-100",
            vec![
                LineItem::new("fiddle-leaf", "Fiddle leaf fig", 45.0, 2),
                LineItem::new("pothos", "Golden pothos", 12.5, 1),
                LineItem::new("succulent", "Mini succulent", 4.0, 1).freebie(),
            ],
            false,
        )
        .unwrap();
    assert_eq!(edited.versions.len(), 2);
    assert_eq!(edited.versions[0].total, 78.4);

    manager
        .apply_discount("ord-100", Discount::amount(10.0, "Loyal customer"))
        .unwrap();

    let FinalizeOutcome::Finalized(finalized) = manager.finalize("ord-100").unwrap() else {
        panic!("finalize should apply once");
    };
    // (102.50 - 10.00) = 92.50 + 4.63 GST + 6.48 PST
    assert_eq!(finalized.total, 103.61);
    assert_eq!(finalized.versions.len(), 3);
    assert!(!finalized.versions[2].is_preliminary);

    let receipt = manager.send_invoice_email("ord-100", false).await.unwrap();
    assert_eq!(receipt.kind, NotificationKind::Invoice);
    assert!(matches!(
        manager.send_invoice_email("ord-100", false).await,
        Err(OrderError::NotificationAlreadySent { .. })
    ));

    manager
        .toggle_invoice_payment("ord-100", InvoiceSlice::All)
        .unwrap();
    manager
        .request_transition("ord-100", OrderStatus::Completed)
        .unwrap();
    assert_eq!(dispatcher.sent.load(Ordering::SeqCst), 2);

    drop(manager);

    // Everything survives a restart
    let manager = open_manager(&path, dispatcher);
    let order = manager.get_order("ord-100").unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.is_finalized);
    assert!(order.invoice_email_sent);
    assert!(order.invoice_payments.all);
    assert_eq!(order.versions.len(), 3);
    assert_eq!(order.total, 103.61);
}

#[tokio::test]
async fn test_cancellation_restocks_once_and_queue_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.redb");
    let dispatcher = Arc::new(TestDispatcher::default());
    dispatcher.down.store(true, Ordering::SeqCst);
    let manager = open_manager(&path, dispatcher.clone());

    manager.set_inventory("fiddle-leaf", 4).unwrap();
    manager.set_inventory("pothos", 0).unwrap();

    let created = manager.create_order(checkout("ord-200")).await.unwrap();
    assert!(!created.order.email_sent);
    assert_eq!(manager.pending_emails().unwrap().len(), 1);

    let mut events = manager.subscribe_events();
    assert!(matches!(
        manager
            .request_transition("ord-200", OrderStatus::Cancelled)
            .unwrap(),
        TransitionOutcome::AwaitingConfirmation { .. }
    ));
    let outcome = manager.confirm_cancellation("ord-200").unwrap();
    let Some(RestockOutcome::Restored {
        restorations,
        missing,
    }) = outcome.restock
    else {
        panic!("expected stock to be restored");
    };
    assert_eq!(restorations.len(), 2);
    assert!(missing.is_empty());
    assert!(matches!(
        manager.restore_stock("ord-200").unwrap(),
        RestockOutcome::AlreadyRestored
    ));

    assert_eq!(
        manager.get_inventory("fiddle-leaf").unwrap().unwrap().current_stock,
        5
    );
    assert_eq!(
        manager.get_inventory("pothos").unwrap().unwrap().current_stock,
        2
    );

    let mut saw_restock = false;
    while let Ok(event) = events.try_recv() {
        if let EventPayload::StockRestored { restorations } = event.payload {
            saw_restock = true;
            assert_eq!(restorations.len(), 2);
        }
    }
    assert!(saw_restock);

    drop(manager);

    dispatcher.down.store(false, Ordering::SeqCst);
    let manager = open_manager(&path, dispatcher.clone());
    let report = manager.retry_pending_emails().await.unwrap();
    assert_eq!(report.sent, vec!["ord-200".to_string()]);
    assert!(manager.pending_emails().unwrap().is_empty());
    assert!(manager.get_order("ord-200").unwrap().email_sent);
}
