//! Customer notifications
//!
//! - [`coordinator`]: idempotent confirmation/invoice sends
//! - [`dispatcher`]: email service seam and HTTP client
//! - [`lock`]: in-flight de-duplication
//! - [`queue`]: manual email queue for failed automatic sends

pub mod coordinator;
pub mod dispatcher;
pub mod lock;
pub mod queue;

pub use coordinator::{
    AutoSendOutcome, NotificationCoordinator, NotificationReceipt, RetryReport, TimestampSource,
};
pub use dispatcher::{
    DispatchError, DispatchRequest, DispatchResponse, EmailDispatcher, HttpEmailDispatcher,
};
pub use lock::{InFlightGuard, InFlightLock, LocalInFlightLock, LockToken};
pub use queue::PendingEmailQueue;
