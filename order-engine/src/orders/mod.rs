//! Orders module - order lifecycle engine
//!
//! # Components
//!
//! - [`storage`] - redb persistence (orders, inventory, manual email queue)
//! - [`repository`] - store of record access and canonical document push
//! - [`cache`] - in-memory working copy kept in sync with the store
//! - [`state_machine`] - status transitions and confirmed cancellation
//! - [`inventory`] - stock restoration on cancellation
//! - [`ledger`] - append-only version history and finalization
//! - [`manager`] - admin action entry point

pub mod cache;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod manager;
pub mod repository;
pub mod state_machine;
pub mod storage;
pub mod traits;

pub use cache::OrderCache;
pub use error::{OrderError, OrderResult};
pub use inventory::{InventoryReconciler, RestockOutcome};
pub use ledger::FinalizeOutcome;
pub use manager::{CreatedOrder, NewOrder, OrdersManager};
pub use repository::OrderRepository;
pub use state_machine::{
    CancellationOutcome, OrderStateMachine, PendingCancellation, TransitionOutcome,
};
pub use storage::{OrderStorage, StorageError, StorageStats};
pub use traits::{DocumentStore, RestockReport};
