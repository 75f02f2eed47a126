//! Event bus - explicit channel for order lifecycle facts
//!
//! Replaces ambient global broadcasts. Consumers (toasts, banners, audit
//! sinks) subscribe and receive every [`OrderEvent`] published after the
//! state change has been committed.

use shared::order::OrderEvent;
use tokio::sync::broadcast;

/// Event broadcast channel capacity
pub const EVENT_CHANNEL_CAPACITY: usize = 4096;

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<OrderEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }

    /// Publish an event, returning how many subscribers received it
    pub fn publish(&self, event: OrderEvent) -> usize {
        tracing::debug!(
            order_id = %event.order_id,
            event_type = %event.event_type(),
            "Publishing order event"
        );
        self.tx.send(event).unwrap_or(0)
    }
}
