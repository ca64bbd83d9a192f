//! # Validation Module
//!
//! Input validation for request bodies before they reach the database.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Dashboard forms (TypeScript)                                  │
//! │  ├── Basic format checks (empty, length)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: axum handler                                                  │
//! │  ├── Deserialization into typed request bodies                          │
//! │  └── THIS MODULE: field rules, first failure names the field            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── CHECK (current_quantity >= 0), CHECK (balance = total - paid)      │
//! │  ├── UNIQUE batch / order / issuance numbers                            │
//! │  └── Foreign keys                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names in errors use the JSON (camelCase) spelling so the dashboard
//! can highlight the input directly.
//!
//! ```rust
//! use clinic_core::validation::{validate_issued_by, validate_quantity};
//!
//! validate_quantity(3).unwrap();
//! assert!(validate_issued_by("   ").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{NewOrder, NewStockItem, NewUser};
use crate::{MAX_NAME_LEN, MAX_REMARKS_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a batch / lot number.
///
/// ## Rules
/// - Must not be empty, at most 50 characters
/// - Letters, digits, `-`, `_`, `.` and `/` only
///
/// ```rust
/// use clinic_core::validation::validate_batch_number;
///
/// assert!(validate_batch_number("GL-2026/07").is_ok());
/// assert!(validate_batch_number("has space").is_err());
/// ```
pub fn validate_batch_number(batch: &str) -> ValidationResult<()> {
    required("batchNumber", batch, 50)?;

    if !batch
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "batchNumber".to_string(),
            reason: "must contain only letters, numbers, '-', '_', '.' and '/'".to_string(),
        });
    }

    Ok(())
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    required("productName", name, MAX_NAME_LEN)
}

pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    required("customerName", name, MAX_NAME_LEN)
}

/// The actor recorded on an issuance.
pub fn validate_issued_by(actor: &str) -> ValidationResult<()> {
    required("issuedBy", actor, MAX_NAME_LEN)
}

/// Optional remarks. Blank remarks are accepted and later ignored.
pub fn validate_remarks(remarks: Option<&str>) -> ValidationResult<()> {
    match remarks {
        Some(text) if text.trim().chars().count() > MAX_REMARKS_LEN => {
            Err(ValidationError::TooLong {
                field: "remarks".to_string(),
                max: MAX_REMARKS_LEN,
            })
        }
        _ => Ok(()),
    }
}

/// Validates a login name.
///
/// ## Rules
/// - 3 to 50 characters
/// - Letters, digits, `.`, `_` and `-`
pub fn validate_username(username: &str) -> ValidationResult<()> {
    required("username", username, 50)?;

    let username = username.trim();
    if username.chars().count() < 3 {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must be at least 3 characters".to_string(),
        });
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must contain only letters, numbers, '.', '_' and '-'".to_string(),
        });
    }

    Ok(())
}

pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < 8 {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: "must be at least 8 characters".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity to issue or order.
///
/// ```text
/// Issue stock: quantity = 3
///      │
///      ├── qty <= 0? → "quantity must be positive"
///      │
///      └── OK → availability is checked inside the transaction
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Non-negative amount in cents. Zero is allowed (free items, no deposit).
pub fn validate_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "amountCents".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a UUID string.
///
/// ```rust
/// use clinic_core::validation::validate_uuid;
///
/// assert!(validate_uuid("stockItemId", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("stockItemId", "not-a-uuid").is_err());
/// ```
pub fn validate_uuid(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id.trim()).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

pub fn validate_new_stock_item(item: &NewStockItem) -> ValidationResult<()> {
    validate_batch_number(&item.batch_number)?;
    validate_product_name(&item.product_name)?;
    required("productType", &item.product_type, MAX_NAME_LEN)?;
    validate_quantity(item.quantity)?;
    validate_cents("unitPriceCents", item.unit_price_cents)?;
    if item.quantity.checked_mul(item.unit_price_cents).is_none() {
        return Err(ValidationError::InvalidFormat {
            field: "unitPriceCents".to_string(),
            reason: "stock value is too large".to_string(),
        });
    }
    if item.low_stock_threshold < 0 {
        return Err(ValidationError::OutOfRange {
            field: "lowStockThreshold".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Field rules for a new order. Totals are checked by
/// [`crate::order::compute_totals`].
pub fn validate_new_order(order: &NewOrder) -> ValidationResult<()> {
    validate_customer_name(&order.customer_name)?;

    if order.items.is_empty() {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    for line in &order.items {
        validate_uuid("stockItemId", &line.stock_item_id)?;
        validate_quantity(line.quantity)?;
        validate_cents("unitPriceCents", line.unit_price_cents)?;
        validate_cents("discountCents", line.discount_cents)?;
    }

    validate_cents("amountPaidCents", order.amount_paid_cents)?;
    validate_remarks(order.notes.as_deref()).map_err(|_| ValidationError::TooLong {
        field: "notes".to_string(),
        max: MAX_REMARKS_LEN,
    })
}

pub fn validate_new_user(user: &NewUser) -> ValidationResult<()> {
    validate_username(&user.username)?;
    validate_password(&user.password)?;
    required("fullName", &user.full_name, MAX_NAME_LEN)
}

// =============================================================================
// Unit Tests
// =============================================================================
