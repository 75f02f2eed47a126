//! Shared types for the order engine
//!
//! Document types for orders, inventory and the manual email queue,
//! the event payloads published by the engine, and the unified error codes.

pub mod error;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};
