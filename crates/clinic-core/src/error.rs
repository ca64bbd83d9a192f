//! # Error Types
//!
//! Domain-specific error types for clinic-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  clinic-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  clinic-db errors (separate crate)                                     │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  clinic-api errors                                                     │
//! │  └── ApiError         - HTTP status + JSON body                        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Dashboard    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages carry the identifiers involved (order number, batch, quantities)
//! so that the dashboard can show them verbatim.

use thiserror::Error;

use crate::types::{IssuanceStatus, OrderStatus};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the order and issuance rules.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Stock item not found: {0}")]
    StockItemNotFound(String),

    #[error("Issuance record not found: {0}")]
    IssuanceNotFound(String),

    /// Stock cannot be issued against an order that is already closed.
    ///
    /// ## When This Occurs
    /// - Order is `cancelled`
    /// - Order is `delivered` or `installed`
    #[error("Order {order_number} is {status}, stock cannot be issued")]
    InvalidOrderState {
        order_number: String,
        status: OrderStatus,
    },

    /// Requested quantity exceeds what is on hand.
    ///
    /// ## User Workflow
    /// ```text
    /// Issue 5 units of BATCH-7
    ///      │
    ///      ▼
    /// current_quantity = 2
    ///      │
    ///      ▼
    /// "Insufficient stock for BATCH-7. Available: 2, Requested: 5"
    /// ```
    #[error("Insufficient stock for {batch_number}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        batch_number: String,
        available: i64,
        requested: i64,
    },

    #[error("Issuance {0} has already been returned")]
    AlreadyReturned(String),

    #[error("Issuance {0} has already been marked damaged")]
    AlreadyDamaged(String),

    /// Order still has stock issued against it.
    #[error("Order {order_number} has {count} active issuance(s) and cannot be deleted")]
    HasIssuances { order_number: String, count: i64 },

    #[error("Order cannot move from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Payment does not fit the outstanding balance.
    #[error("Invalid payment: {reason}")]
    InvalidPayment { reason: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Error for a transition attempted on an issuance that has left `issued`.
    pub fn issuance_closed(issuance_number: &str, status: IssuanceStatus) -> Self {
        match status {
            IssuanceStatus::Damaged => CoreError::AlreadyDamaged(issuance_number.to_string()),
            _ => CoreError::AlreadyReturned(issuance_number.to_string()),
        }
    }

    /// True for the `*NotFound` variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::OrderNotFound(_)
                | CoreError::StockItemNotFound(_)
                | CoreError::IssuanceNotFound(_)
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, always naming the offending field.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Name of the field that failed validation.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::NotAllowed { field, .. } => field,
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message_reports_both_amounts() {
        let err = CoreError::InsufficientStock {
            batch_number: "GL-2024-07".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for GL-2024-07. Available: 2, Requested: 5"
        );
    }

    #[test]
    fn test_invalid_order_state_message() {
        let err = CoreError::InvalidOrderState {
            order_number: "ORD-20261019-0001".to_string(),
            status: OrderStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Order ORD-20261019-0001 is cancelled, stock cannot be issued"
        );
    }

    #[test]
    fn test_issuance_closed_picks_variant() {
        assert!(matches!(
            CoreError::issuance_closed("ISS-1", IssuanceStatus::Damaged),
            CoreError::AlreadyDamaged(_)
        ));
        assert!(matches!(
            CoreError::issuance_closed("ISS-1", IssuanceStatus::Returned),
            CoreError::AlreadyReturned(_)
        ));
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let err: CoreError = ValidationError::Required {
            field: "issuedBy".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_validation_field_name() {
        let err = ValidationError::TooLong {
            field: "remarks".to_string(),
            max: 500,
        };
        assert_eq!(err.field(), "remarks");
        assert_eq!(err.to_string(), "remarks must be at most 500 characters");
    }
}
