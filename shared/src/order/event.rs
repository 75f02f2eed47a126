//! Order events - facts published on the engine's event bus
//!
//! Subscribers (toasts, banners, audit sinks) receive these instead of
//! listening to ambient global broadcasts.

use super::status::OrderStatus;
use super::types::{NotificationKind, StockRestoration};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Event unique ID
    pub event_id: String,
    /// Order this event belongs to
    pub order_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl OrderEvent {
    pub fn new(order_id: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn event_type(&self) -> OrderEventType {
        self.payload.event_type()
    }
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    // Lifecycle
    OrderCreated,
    StatusChanged,
    CancellationRequested,
    CancellationDeclined,
    OrderCancelled,

    // Inventory
    StockRestored,

    // Ledger
    ItemsEdited,
    OrderFinalized,

    // Other admin edits
    OrderInfoUpdated,

    // Notifications
    NotificationSent,
    NotificationFailed,
    NotificationQueued,
}

impl std::fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderEventType::OrderCreated => write!(f, "ORDER_CREATED"),
            OrderEventType::StatusChanged => write!(f, "STATUS_CHANGED"),
            OrderEventType::CancellationRequested => write!(f, "CANCELLATION_REQUESTED"),
            OrderEventType::CancellationDeclined => write!(f, "CANCELLATION_DECLINED"),
            OrderEventType::OrderCancelled => write!(f, "ORDER_CANCELLED"),
            OrderEventType::StockRestored => write!(f, "STOCK_RESTORED"),
            OrderEventType::ItemsEdited => write!(f, "ITEMS_EDITED"),
            OrderEventType::OrderFinalized => write!(f, "ORDER_FINALIZED"),
            OrderEventType::OrderInfoUpdated => write!(f, "ORDER_INFO_UPDATED"),
            OrderEventType::NotificationSent => write!(f, "NOTIFICATION_SENT"),
            OrderEventType::NotificationFailed => write!(f, "NOTIFICATION_FAILED"),
            OrderEventType::NotificationQueued => write!(f, "NOTIFICATION_QUEUED"),
        }
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    // ========== Lifecycle ==========
    OrderCreated {
        total: f64,
    },
    StatusChanged {
        from: OrderStatus,
        to: OrderStatus,
    },
    /// Waiting for the admin to confirm
    CancellationRequested {
        current: OrderStatus,
    },
    CancellationDeclined,
    OrderCancelled {
        from: OrderStatus,
    },

    // ========== Inventory ==========
    StockRestored {
        restorations: Vec<StockRestoration>,
    },

    // ========== Ledger ==========
    ItemsEdited {
        version_number: u32,
        total: f64,
        finalized: bool,
    },
    OrderFinalized {
        total: f64,
    },

    // ========== Admin Edits ==========
    OrderInfoUpdated {
        /// Which field group changed (discount, payment, note, invoice_payments)
        field: String,
    },

    // ========== Notifications ==========
    NotificationSent {
        kind: NotificationKind,
        sent_at: DateTime<Utc>,
        resend: bool,
    },
    NotificationFailed {
        kind: NotificationKind,
        message: String,
    },
    /// Automatic dispatch failed, parked in the manual email queue
    NotificationQueued {
        kind: NotificationKind,
    },
}

impl EventPayload {
    pub fn event_type(&self) -> OrderEventType {
        match self {
            EventPayload::OrderCreated { .. } => OrderEventType::OrderCreated,
            EventPayload::StatusChanged { .. } => OrderEventType::StatusChanged,
            EventPayload::CancellationRequested { .. } => OrderEventType::CancellationRequested,
            EventPayload::CancellationDeclined => OrderEventType::CancellationDeclined,
            EventPayload::OrderCancelled { .. } => OrderEventType::OrderCancelled,
            EventPayload::StockRestored { .. } => OrderEventType::StockRestored,
            EventPayload::ItemsEdited { .. } => OrderEventType::ItemsEdited,
            EventPayload::OrderFinalized { .. } => OrderEventType::OrderFinalized,
            EventPayload::OrderInfoUpdated { .. } => OrderEventType::OrderInfoUpdated,
            EventPayload::NotificationSent { .. } => OrderEventType::NotificationSent,
            EventPayload::NotificationFailed { .. } => OrderEventType::NotificationFailed,
            EventPayload::NotificationQueued { .. } => OrderEventType::NotificationQueued,
        }
    }
}
