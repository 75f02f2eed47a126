//! Order record - the document stored at `orders/{id}`

use super::status::OrderStatus;
use super::types::{
    AdminNote, Customer, Discount, InvoicePayments, LineItem, NotificationKind, OrderVersion,
    PaymentInfo,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order aggregate
///
/// `subtotal` and `total` are derived from `items` and `discount` and are
/// persisted for display only. Notification flags are written by the
/// notification path alone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    /// Creation time
    pub date: DateTime<Utc>,
    pub customer: Customer,
    pub items: Vec<LineItem>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Discount>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentInfo>,

    // === Version Ledger ===
    #[serde(default)]
    pub versions: Vec<OrderVersion>,
    #[serde(default)]
    pub is_finalized: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub admin_notes: Vec<AdminNote>,

    // === Notification State ===
    #[serde(default)]
    pub email_sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_sent_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub invoice_email_sent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_email_sent_timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub invoice_payments: InvoicePayments,

    /// Set once cancellation has returned stock to inventory
    #[serde(default)]
    pub stock_restored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a freshly checked-out order
    pub fn new(id: impl Into<String>, customer: Customer, items: Vec<LineItem>) -> Self {
        Self {
            id: id.into(),
            date: Utc::now(),
            customer,
            items,
            status: OrderStatus::Pending,
            discount: None,
            subtotal: 0.0,
            total: 0.0,
            payment: None,
            versions: Vec::new(),
            is_finalized: false,
            finalized_at: None,
            admin_notes: Vec::new(),
            email_sent: false,
            email_sent_timestamp: None,
            invoice_email_sent: false,
            invoice_email_sent_timestamp: None,
            invoice_payments: InvoicePayments::default(),
            stock_restored: false,
            updated_at: None,
        }
    }

    /// Document key in the store
    pub fn key(&self) -> String {
        format!("orders/{}", self.id)
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.is_terminal()
    }

    /// Version number the next ledger entry will carry
    pub fn next_version_number(&self) -> u32 {
        self.versions.len() as u32 + 1
    }

    pub fn latest_version(&self) -> Option<&OrderVersion> {
        self.versions.last()
    }

    /// Whether a notification of this kind has gone out at least once
    pub fn notification_sent(&self, kind: NotificationKind) -> bool {
        match kind {
            NotificationKind::OrderConfirmation => self.email_sent,
            NotificationKind::Invoice => self.invoice_email_sent,
        }
    }

    /// Timestamp of the last successful dispatch of this kind
    pub fn notification_sent_at(&self, kind: NotificationKind) -> Option<DateTime<Utc>> {
        match kind {
            NotificationKind::OrderConfirmation => self.email_sent_timestamp,
            NotificationKind::Invoice => self.invoice_email_sent_timestamp,
        }
    }

    /// Record a successful dispatch
    pub fn mark_notification_sent(&mut self, kind: NotificationKind, at: DateTime<Utc>) {
        match kind {
            NotificationKind::OrderConfirmation => {
                self.email_sent = true;
                self.email_sent_timestamp = Some(at);
            }
            NotificationKind::Invoice => {
                self.invoice_email_sent = true;
                self.invoice_email_sent_timestamp = Some(at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order::new(
            "ord-1",
            Customer {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                ..Default::default()
            },
            vec![LineItem::new("p-1", "Monstera", 10.0, 2)],
        )
    }

    #[test]
    fn test_new_order_defaults() {
        let order = sample_order();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.versions.is_empty());
        assert!(!order.is_finalized);
        assert!(!order.email_sent);
        assert!(!order.stock_restored);
        assert_eq!(order.next_version_number(), 1);
        assert_eq!(order.key(), "orders/ord-1");
    }

    #[test]
    fn test_mark_notification_sent_is_per_kind() {
        let mut order = sample_order();
        let at = Utc::now();
        order.mark_notification_sent(NotificationKind::Invoice, at);
        assert!(order.notification_sent(NotificationKind::Invoice));
        assert_eq!(order.notification_sent_at(NotificationKind::Invoice), Some(at));
        assert!(!order.notification_sent(NotificationKind::OrderConfirmation));
        assert_eq!(
            order.notification_sent_at(NotificationKind::OrderConfirmation),
            None
        );
    }

    #[test]
    fn test_document_roundtrip_uses_camel_case() {
        let order = sample_order();
        let json = serde_json::to_value(&order).unwrap();
        assert!(json.get("isFinalized").is_some());
        assert!(json.get("invoicePayments").is_some());
        assert_eq!(json["status"], "pending");

        let decoded: Order = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, order);
    }

    #[test]
    fn test_decodes_sparse_legacy_document() {
        let json = r#"{
            "id": "legacy-1",
            "date": "2024-05-01T10:00:00Z",
            "customer": {"name": "Bo"},
            "items": [{"id": "p", "name": "Cactus", "price": "8", "quantity": 1, "isFreebie": 0}],
            "status": {"label": "Processing"}
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(order.items[0].price, 8.0);
        assert!(order.versions.is_empty());
        assert_eq!(order.customer.contact_email(), None);
    }
}
