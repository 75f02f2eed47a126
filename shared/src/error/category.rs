//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 4xxx: Order errors
/// - 5xxx: Notification errors
/// - 6xxx: Inventory errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Order errors (4xxx)
    Order,
    /// Notification errors (5xxx)
    Notification,
    /// Inventory errors (6xxx)
    Inventory,
    /// System errors (everything else)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            4000..5000 => Self::Order,
            5000..6000 => Self::Notification,
            6000..7000 => Self::Inventory,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Order => "order",
            Self::Notification => "notification",
            Self::Inventory => "inventory",
            Self::System => "system",
        }
    }

    /// Whether retrying the same admin action can succeed
    ///
    /// Validation and terminal-state failures need different input; the
    /// rest are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Notification | Self::System)
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Order);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Notification);
        assert_eq!(ErrorCategory::from_code(6002), ErrorCategory::Inventory);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::Success.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::OrderAlreadyTerminal.category(), ErrorCategory::Order);
        assert_eq!(
            ErrorCode::NotificationInFlight.category(),
            ErrorCategory::Notification
        );
        assert_eq!(
            ErrorCode::StockAlreadyRestored.category(),
            ErrorCategory::Inventory
        );
        assert_eq!(ErrorCode::SystemBusy.category(), ErrorCategory::System);
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::NotificationFailed.category().is_retryable());
        assert!(ErrorCode::SystemBusy.category().is_retryable());
        assert!(!ErrorCode::OrderHasNoItems.category().is_retryable());
        assert!(!ErrorCode::ValidationFailed.category().is_retryable());
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Notification).unwrap();
        assert_eq!(json, "\"notification\"");

        let category: ErrorCategory = serde_json::from_str("\"inventory\"").unwrap();
        assert_eq!(category, ErrorCategory::Inventory);
    }
}
