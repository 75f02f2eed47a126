//! Order document model
//!
//! This module provides the types stored and exchanged by the order engine:
//! - Record: the `orders/{id}` document
//! - Status: lifecycle status, normalised at decode time
//! - Types: line items, discounts, ledger versions, inventory and email queue records
//! - Events: facts published after admin actions

pub mod event;
pub mod lenient;
pub mod record;
pub mod status;
pub mod types;

// Re-exports
pub use event::{EventPayload, OrderEvent, OrderEventType};
pub use record::Order;
pub use status::{OrderStatus, ParseStatusError};
pub use types::*;
