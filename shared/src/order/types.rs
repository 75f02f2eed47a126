//! Value types carried by the order document

use super::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Customer
// ============================================================================

/// Customer contact details captured at checkout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: String,
}

impl Customer {
    /// Email address usable for notifications, if any
    pub fn contact_email(&self) -> Option<&str> {
        let email = self.email.trim();
        if email.is_empty() { None } else { Some(email) }
    }
}

// ============================================================================
// Line Items
// ============================================================================

/// A single line of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product (plant) ID, also the inventory key
    pub id: String,
    pub name: String,
    /// Unit price
    #[serde(deserialize_with = "lenient::amount")]
    pub price: f64,
    #[serde(deserialize_with = "lenient::quantity")]
    pub quantity: u32,
    /// Freebies are listed but never charged
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_freebie: bool,
}

impl LineItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
            is_freebie: false,
        }
    }

    /// Same line, marked as a freebie
    pub fn freebie(mut self) -> Self {
        self.is_freebie = true;
        self
    }

    /// Copy with price forced to a non-negative finite amount
    pub fn normalized(&self) -> Self {
        Self {
            price: lenient::sanitize_amount(self.price),
            ..self.clone()
        }
    }
}

// ============================================================================
// Discount
// ============================================================================

/// Discount type (only flat amounts exist today)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    #[default]
    Amount,
}

/// Which slice of the order a discount is labelled for
///
/// Informational: the flat amount is always taken off the whole subtotal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscountScope {
    #[default]
    All,
    Instock,
    Preorder,
    Split,
}

/// Order-level discount
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub amount: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(rename = "type", default)]
    pub kind: DiscountKind,
    #[serde(default)]
    pub apply_to: DiscountScope,
}

impl Discount {
    pub fn amount(amount: f64, reason: impl Into<String>) -> Self {
        Self {
            amount,
            reason: reason.into(),
            kind: DiscountKind::Amount,
            apply_to: DiscountScope::All,
        }
    }

    pub fn applied_to(mut self, scope: DiscountScope) -> Self {
        self.apply_to = scope;
        self
    }
}

// ============================================================================
// Payment
// ============================================================================

/// Payment metadata recorded by the admin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo {
    /// e.g. "cash", "e-transfer"
    pub method: String,
    /// e.g. "pickup", "upfront"
    pub timing: String,
    pub updated_at: DateTime<Utc>,
}

/// Invoice slice whose payment can be toggled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceSlice {
    Instock,
    Preorder,
    All,
}

/// Manual "payment received" flags per invoice slice
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InvoicePayments {
    #[serde(default)]
    pub instock: bool,
    #[serde(default)]
    pub preorder: bool,
    #[serde(default)]
    pub all: bool,
}

impl InvoicePayments {
    pub fn get(&self, slice: InvoiceSlice) -> bool {
        match slice {
            InvoiceSlice::Instock => self.instock,
            InvoiceSlice::Preorder => self.preorder,
            InvoiceSlice::All => self.all,
        }
    }

    /// Flip one slice, returning its new value
    pub fn toggle(&mut self, slice: InvoiceSlice) -> bool {
        let flag = match slice {
            InvoiceSlice::Instock => &mut self.instock,
            InvoiceSlice::Preorder => &mut self.preorder,
            InvoiceSlice::All => &mut self.all,
        };
        *flag = !*flag;
        *flag
    }
}

// ============================================================================
// Audit Trail
// ============================================================================

/// Append-only admin note
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminNote {
    pub note: String,
    pub timestamp: DateTime<Utc>,
    pub added_by: String,
}

/// One entry of the version ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderVersion {
    /// Item set as it stood for this version (freebies included)
    pub items: Vec<LineItem>,
    pub total: f64,
    /// 1-based, contiguous
    pub version_number: u32,
    pub timestamp: DateTime<Utc>,
    pub is_preliminary: bool,
    pub change_reason: String,
}

// ============================================================================
// Inventory
// ============================================================================

/// Stock record at `inventory/{plantId}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    pub current_stock: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    pub fn new(current_stock: i64) -> Self {
        Self {
            current_stock,
            updated_at: None,
        }
    }
}

/// Stock returned to one inventory record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StockRestoration {
    pub plant_id: String,
    pub quantity: u32,
    /// Stock after the increment
    pub current_stock: i64,
}

// ============================================================================
// Notifications
// ============================================================================

/// Customer notification kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Order confirmation email
    OrderConfirmation,
    /// Invoice email
    Invoice,
}

impl NotificationKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderConfirmation => "order_confirmation",
            NotificationKind::Invoice => "invoice",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a queued manual email
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PendingEmailStatus {
    #[default]
    Pending,
    Sent,
}

/// Manual email queue entry, recorded when automatic dispatch failed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingEmail {
    pub order_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub date: DateTime<Utc>,
    pub status: PendingEmailStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_date: Option<DateTime<Utc>>,
}
