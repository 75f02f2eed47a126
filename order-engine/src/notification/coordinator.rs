//! NotificationCoordinator - idempotent confirmation/invoice email dispatch
//!
//! # Send Flow
//!
//! ```text
//! send(kind, order)
//!     ├─ 1. Validate: customer email present (invoice: not already sent unless standalone)
//!     ├─ 2. Acquire in-flight lock "{kind}:{order_id}" (reject if held)
//!     ├─ 3. Dispatch via EmailDispatcher
//!     │      └─ failure: flags untouched, NotificationFailed event, Err(Dispatch)
//!     ├─ 4. Persist the flag in the store of record (store clock)
//!     │      ├─ stamp failure: write again with the local clock, logged
//!     │      └─ both fail: Err(NotificationNotRecorded), working copy untouched
//!     ├─ 5. Re-fetch for the authoritative timestamp
//!     │      └─ read failure: local clock, logged
//!     ├─ 6. Mirror into the working copy, NotificationSent event
//!     └─ 7. Release lock (guard drop)
//! ```
//!
//! There is no automatic retry; a retry is a separate admin action.

use super::dispatcher::{DispatchRequest, EmailDispatcher};
use super::lock::{InFlightGuard, InFlightLock, lock_key};
use super::queue::PendingEmailQueue;
use crate::core::EventBus;
use crate::orders::cache::OrderCache;
use crate::orders::repository::OrderRepository;
use crate::orders::{OrderError, OrderResult};
use chrono::{DateTime, Utc};
use shared::order::{EventPayload, NotificationKind, Order, OrderEvent, PendingEmail};
use std::sync::Arc;

/// Where the recorded send timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    StoreOfRecord,
    /// Store write failed; local wall clock used
    LocalClock,
}

/// Successful send
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationReceipt {
    pub order_id: String,
    pub kind: NotificationKind,
    pub sent_at: DateTime<Utc>,
    pub timestamp_source: TimestampSource,
    /// The flag was already set before this send
    pub resend: bool,
    pub order: Order,
}

/// Result of the automatic confirmation email at order creation
#[derive(Debug, Clone, PartialEq)]
pub enum AutoSendOutcome {
    Sent(NotificationReceipt),
    /// Dispatch failed; the order is waiting in the manual email queue
    Queued(PendingEmail),
}

/// Result of a queue-wide retry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryReport {
    pub sent: Vec<String>,
    /// `(order_id, reason)`
    pub failed: Vec<(String, String)>,
}

pub struct NotificationCoordinator {
    repository: OrderRepository,
    cache: Arc<OrderCache>,
    events: EventBus,
    dispatcher: Arc<dyn EmailDispatcher>,
    lock: Arc<dyn InFlightLock>,
    queue: PendingEmailQueue,
}

impl std::fmt::Debug for NotificationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCoordinator")
            .field("dispatcher", &"<EmailDispatcher>")
            .field("lock", &"<InFlightLock>")
            .finish_non_exhaustive()
    }
}

impl NotificationCoordinator {
    pub fn new(
        repository: OrderRepository,
        cache: Arc<OrderCache>,
        events: EventBus,
        dispatcher: Arc<dyn EmailDispatcher>,
        lock: Arc<dyn InFlightLock>,
        queue: PendingEmailQueue,
    ) -> Self {
        Self {
            repository,
            cache,
            events,
            dispatcher,
            lock,
            queue,
        }
    }

    pub fn queue(&self) -> &PendingEmailQueue {
        &self.queue
    }

    /// Send (or resend) the order confirmation email
    ///
    /// Admin-triggered sends are always allowed; `resend` on the receipt
    /// tells the caller the flag was already set.
    pub async fn send_order_email(
        &self,
        order: &Order,
        force_resend: bool,
    ) -> OrderResult<NotificationReceipt> {
        self.send(NotificationKind::OrderConfirmation, order, force_resend, false)
            .await
    }

    /// Send the invoice email
    ///
    /// An invoice that was already sent is rejected unless `is_standalone`.
    pub async fn send_invoice_email(
        &self,
        order: &Order,
        is_standalone: bool,
    ) -> OrderResult<NotificationReceipt> {
        self.send(NotificationKind::Invoice, order, false, is_standalone)
            .await
    }

    async fn send(
        &self,
        kind: NotificationKind,
        order: &Order,
        force_resend: bool,
        is_standalone: bool,
    ) -> OrderResult<NotificationReceipt> {
        if order.customer.contact_email().is_none() {
            return Err(OrderError::MissingCustomerEmail(order.id.clone()));
        }
        if kind == NotificationKind::Invoice && order.invoice_email_sent && !is_standalone {
            return Err(OrderError::NotificationAlreadySent {
                kind,
                order_id: order.id.clone(),
            });
        }

        let Some(_guard) = InFlightGuard::acquire(&self.lock, lock_key(kind, &order.id)) else {
            tracing::warn!(order_id = %order.id, kind = %kind, "Send rejected, already in flight");
            return Err(OrderError::NotificationInFlight {
                kind,
                order_id: order.id.clone(),
            });
        };

        let resend = order.notification_sent(kind);
        if resend {
            tracing::info!(order_id = %order.id, kind = %kind, "Resending email");
        }

        let request = DispatchRequest {
            kind,
            order: order.clone(),
            force_resend,
            is_standalone,
        };
        let failure = match self.dispatcher.dispatch(&request).await {
            Ok(response) if response.success => None,
            Ok(response) => Some(
                response
                    .message
                    .unwrap_or_else(|| "Email service reported a failure".to_string()),
            ),
            Err(e) => Some(e.to_string()),
        };

        if let Some(message) = failure {
            tracing::warn!(order_id = %order.id, kind = %kind, error = %message, "Email dispatch failed");
            self.events.publish(OrderEvent::new(
                order.id.clone(),
                EventPayload::NotificationFailed {
                    kind,
                    message: message.clone(),
                },
            ));
            return Err(OrderError::Dispatch { kind, message });
        }

        // Persist the flag first; only the timestamp may fall back to the local clock
        let (local_stamp, clock) = match self.repository.stamp_notification(&order.id, kind) {
            Ok(_) => (None, TimestampSource::StoreOfRecord),
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    kind = %kind,
                    error = %e,
                    "Stamp with store clock failed, retrying with local clock"
                );
                let at = Utc::now();
                let written = self.repository.update(&order.id, |doc| {
                    doc.mark_notification_sent(kind, at);
                    Ok(())
                });
                if let Err(e) = written {
                    tracing::error!(
                        order_id = %order.id,
                        kind = %kind,
                        error = %e,
                        "Email sent but the sent flag could not be recorded"
                    );
                    return Err(OrderError::NotificationNotRecorded {
                        kind,
                        order_id: order.id.clone(),
                        message: e.to_string(),
                    });
                }
                (Some(at), TimestampSource::LocalClock)
            }
        };

        // Re-fetch the store of record for the authoritative timestamp
        let (updated, sent_at, timestamp_source) = match self.repository.get(&order.id) {
            Ok(canonical) => {
                let sent_at = canonical
                    .notification_sent_at(kind)
                    .or(local_stamp)
                    .unwrap_or_else(|| self.repository.now());
                (canonical, sent_at, clock)
            }
            Err(e) => {
                tracing::warn!(
                    order_id = %order.id,
                    kind = %kind,
                    error = %e,
                    "Re-fetch failed, using local clock for send timestamp"
                );
                let sent_at = local_stamp.unwrap_or_else(Utc::now);
                let mut local = order.clone();
                local.mark_notification_sent(kind, sent_at);
                (local, sent_at, TimestampSource::LocalClock)
            }
        };

        self.cache.replace(updated.clone());
        crate::audit_log!(
            order.id,
            "notification_sent",
            format!("{} resend={}", kind, resend)
        );
        self.events.publish(OrderEvent::new(
            order.id.clone(),
            EventPayload::NotificationSent {
                kind,
                sent_at,
                resend,
            },
        ));

        Ok(NotificationReceipt {
            order_id: order.id.clone(),
            kind,
            sent_at,
            timestamp_source,
            resend,
            order: updated,
        })
    }

    /// Automatic confirmation email for a freshly created order
    ///
    /// A failed dispatch parks the order in the manual email queue.
    pub async fn notify_order_created(&self, order: &Order) -> OrderResult<AutoSendOutcome> {
        match self.send_order_email(order, false).await {
            Ok(receipt) => Ok(AutoSendOutcome::Sent(receipt)),
            Err(OrderError::Dispatch { kind, message }) => {
                tracing::warn!(order_id = %order.id, error = %message, "Automatic email failed, queueing");
                let entry = self.queue.enqueue(order)?;
                self.events.publish(OrderEvent::new(
                    order.id.clone(),
                    EventPayload::NotificationQueued { kind },
                ));
                Ok(AutoSendOutcome::Queued(entry))
            }
            Err(e) => Err(e),
        }
    }

    /// Re-dispatch a queued order and mark its queue entry sent
    pub async fn resend_pending(&self, order_id: &str) -> OrderResult<NotificationReceipt> {
        if self.queue.get(order_id)?.is_none() {
            return Err(OrderError::Validation(format!(
                "Order {} is not in the manual email queue",
                order_id
            )));
        }

        let order = self.repository.get(order_id)?;
        let receipt = self.send_order_email(&order, true).await?;
        self.queue.mark_sent(order_id, receipt.sent_at)?;
        Ok(receipt)
    }

    /// Try every pending queue entry once
    pub async fn retry_all_pending(&self) -> OrderResult<RetryReport> {
        let mut report = RetryReport::default();
        for entry in self.queue.list_pending()? {
            match self.resend_pending(&entry.order_id).await {
                Ok(_) => report.sent.push(entry.order_id),
                Err(e) => {
                    tracing::warn!(order_id = %entry.order_id, error = %e, "Pending email retry failed");
                    report.failed.push((entry.order_id, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::LocalInFlightLock;
    use crate::orders::storage::OrderStorage;
    use crate::orders::traits::DocumentStore;
    use crate::test_support::{FlakyStore, RecordingDispatcher, create_test_order};
    use shared::order::{OrderEventType, PendingEmailStatus};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Harness {
        coordinator: Arc<NotificationCoordinator>,
        store: Arc<FlakyStore>,
        dispatcher: Arc<RecordingDispatcher>,
        cache: Arc<OrderCache>,
        events: EventBus,
    }

    fn setup_with(dispatcher: RecordingDispatcher) -> Harness {
        let storage = OrderStorage::open_in_memory().unwrap();
        let store = Arc::new(FlakyStore::new(storage.clone()));
        let repository = OrderRepository::new(store.clone());
        let cache = Arc::new(OrderCache::new());
        let events = EventBus::default();
        let dispatcher = Arc::new(dispatcher);
        let coordinator = Arc::new(NotificationCoordinator::new(
            repository.clone(),
            Arc::clone(&cache),
            events.clone(),
            dispatcher.clone(),
            Arc::new(LocalInFlightLock::new(Duration::from_secs(60))),
            PendingEmailQueue::new(storage),
        ));
        repository.create(&create_test_order("ord-1")).unwrap();
        Harness {
            coordinator,
            store,
            dispatcher,
            cache,
            events,
        }
    }

    fn setup() -> Harness {
        setup_with(RecordingDispatcher::new())
    }

    fn stored(h: &Harness) -> Order {
        h.store.read_order("ord-1").unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_send_sets_flag_with_store_timestamp() {
        let h = setup();
        let mut rx = h.events.subscribe();
        let order = stored(&h);

        let receipt = h.coordinator.send_order_email(&order, false).await.unwrap();

        assert_eq!(receipt.timestamp_source, TimestampSource::StoreOfRecord);
        assert!(!receipt.resend);
        let persisted = stored(&h);
        assert!(persisted.email_sent);
        assert_eq!(persisted.email_sent_timestamp, Some(receipt.sent_at));
        assert!(h.cache.get("ord-1").unwrap().email_sent);
        assert_eq!(rx.recv().await.unwrap().event_type(), OrderEventType::NotificationSent);
    }

    #[tokio::test]
    async fn test_resend_is_flagged_and_updates_timestamp() {
        let h = setup();
        let first = h
            .coordinator
            .send_order_email(&stored(&h), false)
            .await
            .unwrap();

        let second = h
            .coordinator
            .send_order_email(&stored(&h), false)
            .await
            .unwrap();

        assert!(second.resend);
        assert!(second.sent_at >= first.sent_at);
        assert_eq!(stored(&h).email_sent_timestamp, Some(second.sent_at));
        assert_eq!(h.dispatcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_leaves_flags_untouched() {
        let h = setup();
        let mut rx = h.events.subscribe();
        h.dispatcher.fail_with("mailbox unavailable");

        let err = h
            .coordinator
            .send_order_email(&stored(&h), false)
            .await
            .unwrap_err();

        match err {
            OrderError::Dispatch { message, .. } => assert_eq!(message, "mailbox unavailable"),
            other => panic!("unexpected error: {other:?}"),
        }
        let persisted = stored(&h);
        assert!(!persisted.email_sent);
        assert!(persisted.email_sent_timestamp.is_none());
        assert_eq!(rx.recv().await.unwrap().event_type(), OrderEventType::NotificationFailed);

        // Lock released, retry works
        h.dispatcher.recover();
        assert!(h.coordinator.send_order_email(&stored(&h), false).await.is_ok());
    }

    #[tokio::test]
    async fn test_stamp_failure_persists_flag_with_local_clock() {
        let h = setup();
        h.store.fail_stamps(true);
        let before = Utc::now();

        let receipt = h
            .coordinator
            .send_order_email(&stored(&h), false)
            .await
            .unwrap();

        assert_eq!(receipt.timestamp_source, TimestampSource::LocalClock);
        assert!(receipt.sent_at >= before);
        let persisted = stored(&h);
        assert!(persisted.email_sent);
        assert_eq!(persisted.email_sent_timestamp, Some(receipt.sent_at));
        assert_eq!(h.cache.get("ord-1").unwrap(), persisted);
    }

    #[tokio::test]
    async fn test_refetch_failure_uses_local_clock() {
        let h = setup();
        let order = stored(&h);
        h.store.fail_reads(true);

        let receipt = h.coordinator.send_invoice_email(&order, false).await.unwrap();
        assert_eq!(receipt.timestamp_source, TimestampSource::LocalClock);
        assert!(receipt.order.invoice_email_sent);

        h.store.fail_reads(false);
        assert!(stored(&h).invoice_email_sent);
    }

    #[tokio::test]
    async fn test_unrecordable_send_is_reported() {
        let h = setup();
        let mut rx = h.events.subscribe();
        h.store.fail_stamps(true);
        h.store.fail_writes(true);

        let err = h
            .coordinator
            .send_invoice_email(&stored(&h), false)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrderError::NotificationNotRecorded {
                kind: NotificationKind::Invoice,
                ..
            }
        ));
        assert_eq!(h.dispatcher.calls(), 1);
        assert!(!stored(&h).invoice_email_sent);
        assert!(h.cache.get("ord-1").is_none());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_missing_email_is_rejected_before_dispatch() {
        let h = setup();
        let mut order = stored(&h);
        order.customer.email = "  ".to_string();

        let invoice = h.coordinator.send_invoice_email(&order, false).await;
        assert!(matches!(invoice, Err(OrderError::MissingCustomerEmail(_))));
        let confirmation = h.coordinator.send_order_email(&order, true).await;
        assert!(matches!(confirmation, Err(OrderError::MissingCustomerEmail(_))));
        assert_eq!(h.dispatcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_invoice_already_sent_requires_standalone() {
        let h = setup();
        h.coordinator
            .send_invoice_email(&stored(&h), false)
            .await
            .unwrap();
        assert!(stored(&h).invoice_email_sent);

        let again = h.coordinator.send_invoice_email(&stored(&h), false).await;
        assert!(matches!(again, Err(OrderError::NotificationAlreadySent { .. })));

        let standalone = h
            .coordinator
            .send_invoice_email(&stored(&h), true)
            .await
            .unwrap();
        assert!(standalone.resend);
        assert_eq!(h.dispatcher.calls(), 2);
        assert!(h.dispatcher.requests()[1].is_standalone);
    }

    #[tokio::test]
    async fn test_concurrent_sends_dispatch_once() {
        let gate = Arc::new(Notify::new());
        let h = setup_with(RecordingDispatcher::gated(Arc::clone(&gate)));
        let started = h.dispatcher.started();
        let order = stored(&h);

        let coordinator = Arc::clone(&h.coordinator);
        let first_order = order.clone();
        let first = tokio::spawn(async move {
            coordinator.send_order_email(&first_order, false).await
        });
        started.notified().await;

        let second = h.coordinator.send_order_email(&order, false).await;
        assert!(matches!(second, Err(OrderError::NotificationInFlight { .. })));

        gate.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert_eq!(h.dispatcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_auto_send_failure_is_queued() {
        let h = setup();
        let mut rx = h.events.subscribe();
        h.dispatcher.take_down();

        let outcome = h.coordinator.notify_order_created(&stored(&h)).await.unwrap();
        let AutoSendOutcome::Queued(entry) = outcome else {
            panic!("expected the order to be queued");
        };
        assert_eq!(entry.order_id, "ord-1");
        assert_eq!(entry.status, PendingEmailStatus::Pending);

        let types: Vec<_> = [rx.recv().await.unwrap(), rx.recv().await.unwrap()]
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            types,
            vec![OrderEventType::NotificationFailed, OrderEventType::NotificationQueued]
        );
    }

    #[tokio::test]
    async fn test_resend_pending_marks_entry_sent() {
        let h = setup();
        h.dispatcher.take_down();
        h.coordinator.notify_order_created(&stored(&h)).await.unwrap();

        // Still down: retry reports the failure and keeps the entry
        let report = h.coordinator.retry_all_pending().await.unwrap();
        assert!(report.sent.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(h.coordinator.queue().list_pending().unwrap().len(), 1);

        h.dispatcher.recover();
        let report = h.coordinator.retry_all_pending().await.unwrap();
        assert_eq!(report.sent, vec!["ord-1".to_string()]);
        assert!(h.coordinator.queue().list_pending().unwrap().is_empty());
        assert!(stored(&h).email_sent);
        assert!(h.dispatcher.requests().last().unwrap().force_resend);
    }

    #[tokio::test]
    async fn test_resend_pending_requires_queue_entry() {
        let h = setup();
        let err = h.coordinator.resend_pending("ord-1").await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        assert_eq!(h.dispatcher.calls(), 0);
    }
}
