//! Core module - configuration and the event bus
//!
//! - [`Config`] - engine configuration
//! - [`EventBus`] - order lifecycle event channel

pub mod config;
pub mod event_bus;

pub use config::Config;
pub use event_bus::EventBus;
