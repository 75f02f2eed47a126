//! Unified error codes for the order engine
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Order errors
//! - 5xxx: Notification errors
//! - 6xxx: Inventory errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order is cancelled and accepts no further transitions
    OrderAlreadyTerminal = 4002,
    /// Order must keep at least one line item
    OrderHasNoItems = 4003,
    /// Order item set already finalized
    OrderAlreadyFinalized = 4004,
    /// Discount amount or reason is invalid
    InvalidDiscount = 4005,
    /// Line item price or quantity is invalid
    InvalidLineItem = 4006,
    /// No cancellation is awaiting confirmation for this order
    NoPendingCancellation = 4007,
    /// Order already exists
    OrderAlreadyExists = 4008,

    // ==================== 5xxx: Notification ====================
    /// A send for this order is already in flight
    NotificationInFlight = 5001,
    /// Email dispatch service reported a failure
    NotificationFailed = 5002,
    /// Customer email is missing
    CustomerEmailMissing = 5003,
    /// Notification already sent (non-standalone invoice)
    NotificationAlreadySent = 5004,
    /// Email went out but the sent flag could not be persisted
    NotificationNotRecorded = 5005,

    // ==================== 6xxx: Inventory ====================
    /// Inventory record not found
    InventoryNotFound = 6001,
    /// Stock already restored for this order
    StockAlreadyRestored = 6002,

    // ==================== 9xxx: System ====================
    /// Internal error
    InternalError = 9001,
    /// Storage full (disk space insufficient)
    StorageFull = 9401,
    /// Storage corrupted (data file damaged)
    StorageCorrupted = 9403,
    /// System busy (IO error, retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyTerminal => "Order is cancelled and cannot change status",
            ErrorCode::OrderHasNoItems => "Order must contain at least one item",
            ErrorCode::OrderAlreadyFinalized => "Order is already finalized",
            ErrorCode::InvalidDiscount => "Invalid discount",
            ErrorCode::InvalidLineItem => "Invalid line item",
            ErrorCode::NoPendingCancellation => "No cancellation awaiting confirmation",
            ErrorCode::OrderAlreadyExists => "Order already exists",

            // Notification
            ErrorCode::NotificationInFlight => "Email for this order is already being sent",
            ErrorCode::NotificationFailed => "Email dispatch failed",
            ErrorCode::CustomerEmailMissing => "Customer email is missing",
            ErrorCode::NotificationAlreadySent => "Email has already been sent",
            ErrorCode::NotificationNotRecorded => "Email was sent but could not be recorded",

            // Inventory
            ErrorCode::InventoryNotFound => "Inventory record not found",
            ErrorCode::StockAlreadyRestored => "Stock already restored for this order",

            // System
            ErrorCode::InternalError => "Internal error",
            ErrorCode::StorageFull => "Storage full (disk space insufficient)",
            ErrorCode::StorageCorrupted => "Storage corrupted (data file damaged)",
            ErrorCode::SystemBusy => "System busy, please retry later",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyTerminal),
            4003 => Ok(ErrorCode::OrderHasNoItems),
            4004 => Ok(ErrorCode::OrderAlreadyFinalized),
            4005 => Ok(ErrorCode::InvalidDiscount),
            4006 => Ok(ErrorCode::InvalidLineItem),
            4007 => Ok(ErrorCode::NoPendingCancellation),
            4008 => Ok(ErrorCode::OrderAlreadyExists),

            // Notification
            5001 => Ok(ErrorCode::NotificationInFlight),
            5002 => Ok(ErrorCode::NotificationFailed),
            5003 => Ok(ErrorCode::CustomerEmailMissing),
            5004 => Ok(ErrorCode::NotificationAlreadySent),
            5005 => Ok(ErrorCode::NotificationNotRecorded),

            // Inventory
            6001 => Ok(ErrorCode::InventoryNotFound),
            6002 => Ok(ErrorCode::StockAlreadyRestored),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9401 => Ok(ErrorCode::StorageFull),
            9403 => Ok(ErrorCode::StorageCorrupted),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::OrderAlreadyTerminal.code(), 4002);
        assert_eq!(ErrorCode::NotificationInFlight.code(), 5001);
        assert_eq!(ErrorCode::StockAlreadyRestored.code(), 6002);
        assert_eq!(ErrorCode::SystemBusy.code(), 9404);
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::Unknown.is_success());
        assert!(!ErrorCode::InternalError.is_success());
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(4003), Ok(ErrorCode::OrderHasNoItems));
        assert_eq!(ErrorCode::try_from(5003), Ok(ErrorCode::CustomerEmailMissing));
        assert_eq!(ErrorCode::try_from(9001), Ok(ErrorCode::InternalError));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(1001), Err(InvalidErrorCode(1001)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::OrderAlreadyFinalized).unwrap();
        assert_eq!(json, "4004");

        let code: ErrorCode = serde_json::from_str("5002").unwrap();
        assert_eq!(code, ErrorCode::NotificationFailed);

        let result: Result<ErrorCode, _> = serde_json::from_str("4999");
        assert!(result.is_err());
    }

    #[test]
    fn test_message() {
        assert_eq!(
            ErrorCode::OrderAlreadyTerminal.message(),
            "Order is cancelled and cannot change status"
        );
        assert_eq!(ErrorCode::NotificationFailed.message(), "Email dispatch failed");
    }

    #[test]
    fn test_invalid_error_code_display() {
        assert_eq!(InvalidErrorCode(42).to_string(), "invalid error code: 42");
    }
}
