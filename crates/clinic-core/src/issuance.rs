//! # Issuance Rules
//!
//! The decisions behind moving stock into an order, with no I/O. The database
//! layer loads the rows inside a transaction, asks these functions, and writes
//! only when they say yes.
//!
//! ## Issue Stock to Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  IssueRequest::validate()        quantity > 0, issuedBy, remarks        │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  1. order exists?                ──► OrderNotFound                      │
//! │  2. ensure_order_open()          ──► InvalidOrderState                  │
//! │  3. stock item exists?           ──► StockItemNotFound                  │
//! │  4. ensure_available()           ──► InsufficientStock                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  insert record, decrement stock, status_after_issue()                   │
//! │       │                                                                 │
//! │       ▼  COMMIT                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Issuance Lifecycle
//! ```text
//!            ┌──► returned   (stock restored)
//!   issued ──┤
//!            └──► damaged    (written off)
//! ```
//! Both targets are terminal.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{IssuanceRecord, IssuanceStatus, Order, OrderStatus, StockItem};
use crate::validation::{
    validate_issued_by, validate_quantity, validate_remarks, validate_uuid, ValidationResult,
};
use crate::REMARKS_DELIMITER;

// =============================================================================
// Request Bodies
// =============================================================================

/// Body of `POST /api/orders/{id}/issue`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub stock_item_id: String,
    pub quantity: i64,
    pub issued_by: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl IssueRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_uuid("stockItemId", &self.stock_item_id)?;
        validate_quantity(self.quantity)?;
        validate_issued_by(&self.issued_by)?;
        validate_remarks(self.remarks.as_deref())
    }
}

/// Body of the return and damage endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RemarksBody {
    #[serde(default)]
    pub remarks: Option<String>,
}

// =============================================================================
// Preconditions
// =============================================================================

/// Stock may only be issued against an order that is not closed.
pub fn ensure_order_open(order: &Order) -> CoreResult<()> {
    if order.status.is_closed() {
        return Err(CoreError::InvalidOrderState {
            order_number: order.order_number.clone(),
            status: order.status,
        });
    }
    Ok(())
}

/// `requested` must not exceed what is on hand.
pub fn ensure_available(stock: &StockItem, requested: i64) -> CoreResult<()> {
    if requested > stock.current_quantity {
        return Err(CoreError::InsufficientStock {
            batch_number: stock.batch_number.clone(),
            available: stock.current_quantity,
            requested,
        });
    }
    Ok(())
}

/// Only `issued` records can be returned or marked damaged.
pub fn ensure_issued(record: &IssuanceRecord) -> CoreResult<()> {
    match record.status {
        IssuanceStatus::Issued => Ok(()),
        closed => Err(CoreError::issuance_closed(&record.issuance_number, closed)),
    }
}

// =============================================================================
// Effects
// =============================================================================

/// Order status after a successful issue.
///
/// Only an exact `pending` moves forward; every other status is left alone,
/// so a second issue never re-fires the transition.
pub fn status_after_issue(current: OrderStatus) -> OrderStatus {
    match current {
        OrderStatus::Pending => OrderStatus::Processing,
        other => other,
    }
}

/// Appends `addition` to `existing`, separated by [`REMARKS_DELIMITER`].
///
/// Blank additions leave the remarks untouched.
///
/// ```rust
/// use clinic_core::issuance::append_remarks;
///
/// assert_eq!(
///     append_remarks(Some("fitted"), Some("scratched on return")).as_deref(),
///     Some("fitted | scratched on return")
/// );
/// assert_eq!(append_remarks(None, Some("  ")), None);
/// ```
pub fn append_remarks(existing: Option<&str>, addition: Option<&str>) -> Option<String> {
    let addition = addition.map(str::trim).filter(|s| !s.is_empty());
    let existing = existing.filter(|s| !s.trim().is_empty());

    match (existing, addition) {
        (Some(old), Some(new)) => Some(format!("{old}{REMARKS_DELIMITER}{new}")),
        (Some(old), None) => Some(old.to_string()),
        (None, Some(new)) => Some(new.to_string()),
        (None, None) => None,
    }
}

/// True when restoring `amount` would push the item above what was received.
///
/// Returns are not capped; callers log this case.
pub fn restock_exceeds_original(stock: &StockItem, amount: i64) -> bool {
    stock.current_quantity + amount > stock.original_quantity
}
