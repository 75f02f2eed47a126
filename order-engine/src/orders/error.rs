use super::storage::StorageError;
use shared::error::{AppError, ErrorCode};
use shared::order::NotificationKind;
use thiserror::Error;

/// Order engine errors
///
/// Validation variants are raised before any I/O and carry the reason shown
/// to the admin. None of these are fatal to the process.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order already exists: {0}")]
    OrderAlreadyExists(String),

    #[error("Order is cancelled and cannot change: {0}")]
    AlreadyTerminal(String),

    #[error("Order must contain at least one item")]
    EmptyItems,

    #[error("Invalid line item: {0}")]
    InvalidLineItem(String),

    #[error("Invalid discount: {0}")]
    InvalidDiscount(String),

    #[error("{0}")]
    Validation(String),

    #[error("No pending cancellation for order: {0}")]
    NoPendingCancellation(String),

    #[error("Customer email is required for order: {0}")]
    MissingCustomerEmail(String),

    #[error("A {kind} email for order {order_id} is already being sent")]
    NotificationInFlight {
        kind: NotificationKind,
        order_id: String,
    },

    #[error("The {kind} email for order {order_id} was already sent")]
    NotificationAlreadySent {
        kind: NotificationKind,
        order_id: String,
    },

    #[error("Failed to send {kind} email: {message}")]
    Dispatch {
        kind: NotificationKind,
        message: String,
    },

    /// Dispatch succeeded but the sent flag could not be written
    #[error("The {kind} email for order {order_id} was sent but not recorded: {message}")]
    NotificationNotRecorded {
        kind: NotificationKind,
        order_id: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::Storage(e) => classify_storage_error(e),
            OrderError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            OrderError::OrderAlreadyExists(_) => ErrorCode::OrderAlreadyExists,
            OrderError::AlreadyTerminal(_) => ErrorCode::OrderAlreadyTerminal,
            OrderError::EmptyItems => ErrorCode::OrderHasNoItems,
            OrderError::InvalidLineItem(_) => ErrorCode::InvalidLineItem,
            OrderError::InvalidDiscount(_) => ErrorCode::InvalidDiscount,
            OrderError::Validation(_) => ErrorCode::ValidationFailed,
            OrderError::NoPendingCancellation(_) => ErrorCode::NoPendingCancellation,
            OrderError::MissingCustomerEmail(_) => ErrorCode::CustomerEmailMissing,
            OrderError::NotificationInFlight { .. } => ErrorCode::NotificationInFlight,
            OrderError::NotificationAlreadySent { .. } => ErrorCode::NotificationAlreadySent,
            OrderError::Dispatch { .. } => ErrorCode::NotificationFailed,
            OrderError::NotificationNotRecorded { .. } => ErrorCode::NotificationNotRecorded,
            OrderError::Config(_) => ErrorCode::InternalError,
        }
    }
}

/// Map a storage failure to an error code
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    match e {
        StorageError::Serialization(_) => return ErrorCode::StorageCorrupted,
        StorageError::Unavailable(_) => return ErrorCode::SystemBusy,
        _ => {}
    }

    // redb errors are classified by message
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    ErrorCode::SystemBusy
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let code = err.code();
        match &err {
            OrderError::Storage(e) => {
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                AppError::with_message(code, e.to_string())
            }
            OrderError::OrderNotFound(id)
            | OrderError::OrderAlreadyExists(id)
            | OrderError::AlreadyTerminal(id)
            | OrderError::NoPendingCancellation(id)
            | OrderError::MissingCustomerEmail(id) => {
                AppError::with_message(code, err.to_string()).with_detail("order_id", id.as_str())
            }
            OrderError::NotificationInFlight { kind, order_id }
            | OrderError::NotificationAlreadySent { kind, order_id } => {
                AppError::with_message(code, err.to_string())
                    .with_detail("order_id", order_id.as_str())
                    .with_detail("kind", kind.as_str())
            }
            OrderError::Dispatch { kind, message } => {
                AppError::with_message(code, message.as_str()).with_detail("kind", kind.as_str())
            }
            OrderError::NotificationNotRecorded {
                kind,
                order_id,
                message,
            } => {
                tracing::error!(order_id = %order_id, kind = %kind, error = %message, "Sent email not recorded");
                AppError::with_message(code, err.to_string())
                    .with_detail("order_id", order_id.as_str())
                    .with_detail("kind", kind.as_str())
            }
            OrderError::EmptyItems
            | OrderError::InvalidLineItem(_)
            | OrderError::InvalidDiscount(_)
            | OrderError::Validation(_) => AppError::with_message(code, err.to_string()),
            OrderError::Config(msg) => {
                tracing::error!(error = %msg, "Configuration error");
                AppError::internal(msg.as_str())
            }
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
