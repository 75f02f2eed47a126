//! Durable manual email queue
//!
//! Orders whose automatic confirmation email failed at creation time are
//! parked here so an admin can see them and resend.

use crate::orders::storage::{OrderStorage, StorageResult};
use chrono::{DateTime, Utc};
use shared::order::{Order, PendingEmail, PendingEmailStatus};

#[derive(Debug, Clone)]
pub struct PendingEmailQueue {
    storage: OrderStorage,
}

impl PendingEmailQueue {
    pub fn new(storage: OrderStorage) -> Self {
        Self { storage }
    }

    /// Park an order; re-enqueueing resets the entry to pending
    pub fn enqueue(&self, order: &Order) -> StorageResult<PendingEmail> {
        let entry = PendingEmail {
            order_id: order.id.clone(),
            customer_name: order.customer.name.clone(),
            customer_email: order.customer.email.clone(),
            date: Utc::now(),
            status: PendingEmailStatus::Pending,
            sent_date: None,
        };
        self.storage.put_pending_email(&entry)?;
        tracing::info!(order_id = %order.id, "Order email queued for manual send");
        Ok(entry)
    }

    /// Remove an entry from the queue
    pub fn dequeue(&self, order_id: &str) -> StorageResult<Option<PendingEmail>> {
        self.storage.remove_pending_email(order_id)
    }

    pub fn get(&self, order_id: &str) -> StorageResult<Option<PendingEmail>> {
        self.storage.get_pending_email(order_id)
    }

    /// Entries still waiting, oldest first
    pub fn list_pending(&self) -> StorageResult<Vec<PendingEmail>> {
        Ok(self
            .storage
            .get_pending_emails()?
            .into_iter()
            .filter(|entry| entry.status == PendingEmailStatus::Pending)
            .collect())
    }

    pub fn list_all(&self) -> StorageResult<Vec<PendingEmail>> {
        self.storage.get_pending_emails()
    }

    /// Mark an entry sent; returns `false` if the order is not queued
    pub fn mark_sent(&self, order_id: &str, at: DateTime<Utc>) -> StorageResult<bool> {
        let Some(mut entry) = self.storage.get_pending_email(order_id)? else {
            return Ok(false);
        };
        entry.status = PendingEmailStatus::Sent;
        entry.sent_date = Some(at);
        self.storage.put_pending_email(&entry)?;
        Ok(true)
    }
}
