//! # Domain Types
//!
//! Core domain types shared by the database layer and the API.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │   StockItem     │   │     Order       │   │   IssuanceRecord    │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id (UUID)      │◄──┤  items[]        │   │  stock_item_id ─────┼──►│
//! │  │  batch_number   │   │  order_number   │◄──┤  order_id           │   │
//! │  │  current_qty    │   │  status         │   │  issued_quantity    │   │
//! │  │  original_qty   │   │  balance_due    │   │  status             │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! │                                                                         │
//! │  StockItem and Order are independent aggregates. IssuanceRecord is    │
//! │  the audit entity that references both.                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity
//! Every entity has a UUID `id` for relations and a human-facing business
//! key (`batch_number`, `order_number`, `issuance_number`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::role::Role;

// =============================================================================
// Department
// =============================================================================

/// Department that owns a stock item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Laboratory,
    Pharmacy,
    /// The glass / spectacle shop.
    Optical,
    Ophthalmology,
}

// =============================================================================
// Stock Item
// =============================================================================

/// A physical good on hand: a cut of glass, a medicine batch, a reagent lot.
///
/// `current_quantity` is owned by the stock ledger. Nothing outside the
/// issuance workflow writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    pub id: String,
    /// Unique batch / lot identifier.
    pub batch_number: String,
    pub product_name: String,
    /// Free-form category, e.g. "single vision lens", "antibiotic".
    pub product_type: String,
    /// Dimensions, power, strength.
    pub specification: Option<String>,
    pub department: Department,
    pub current_quantity: i64,
    /// Quantity received. Never changes after creation.
    pub original_quantity: i64,
    pub unit_price_cents: i64,
    /// At or below this quantity the item shows up as low stock.
    pub low_stock_threshold: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Value of what is currently on hand, clamped at `i64::MAX`.
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.unit_price().saturating_multiply_quantity(self.current_quantity)
    }

    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.current_quantity <= self.low_stock_threshold
    }

    /// True when `0 <= current <= original`.
    ///
    /// A return against stock that was adjusted down in the meantime can
    /// push `current` above `original`; that case is logged, not capped.
    #[inline]
    pub fn within_bounds(&self) -> bool {
        self.current_quantity >= 0 && self.current_quantity <= self.original_quantity
    }
}

/// Input for receiving new stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewStockItem {
    pub batch_number: String,
    pub product_name: String,
    pub product_type: String,
    #[serde(default)]
    pub specification: Option<String>,
    pub department: Department,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub low_stock_threshold: i64,
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of a customer order.
///
/// ```text
///   pending ──► processing ──► ready ──► delivered
///      │            │            │  └──► installed
///      └────────────┴────────────┴─────► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, nothing issued yet.
    #[default]
    Pending,
    /// Stock has been issued against the order.
    Processing,
    Ready,
    Delivered,
    /// Glass fitted into a frame and handed over.
    Installed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Installed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Installed => "installed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses. No stock may be issued against these.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            OrderStatus::Cancelled | OrderStatus::Delivered | OrderStatus::Installed
        )
    }

    /// Manual transitions allowed through the status endpoint.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Ready)
                | (Processing, Cancelled)
                | (Ready, Delivered)
                | (Ready, Installed)
                | (Ready, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer order.
///
/// `balance_due_cents == total_amount_cents - amount_paid_cents` holds after
/// every write; the schema carries a CHECK constraint for it as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    /// `ORD-YYYYMMDD-NNNN`
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub total_amount_cents: i64,
    pub amount_paid_cents: i64,
    pub balance_due_cents: i64,
    pub status: OrderStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }

    #[inline]
    pub fn balance_due(&self) -> Money {
        Money::from_cents(self.balance_due_cents)
    }

    /// Checks the stored balance against the two amounts it derives from.
    pub fn balance_is_consistent(&self) -> bool {
        self.balance_due() == self.total_amount() - self.amount_paid()
    }
}

/// A line on an order. Prices are frozen at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub stock_item_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub discount_cents: i64,
    pub line_total_cents: i64,
}

/// An order together with its lines.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Input for one order line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderLine {
    pub stock_item_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

/// Input for creating an order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub items: Vec<NewOrderLine>,
    /// Deposit taken when the order is placed.
    #[serde(default)]
    pub amount_paid_cents: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

// =============================================================================
// Issuance
// =============================================================================

/// Lifecycle of an issuance record.
///
/// Only `issued` records move: to `returned` (stock restored) or to
/// `damaged` (stock written off).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum IssuanceStatus {
    #[default]
    Issued,
    Returned,
    Damaged,
}

impl IssuanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssuanceStatus::Issued => "issued",
            IssuanceStatus::Returned => "returned",
            IssuanceStatus::Damaged => "damaged",
        }
    }
}

impl fmt::Display for IssuanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit entry: `issued_quantity` units of a stock item moved into an order.
///
/// `issued_quantity`, the references and the snapshots never change after
/// creation. Only `status`, `return_date` and `remarks` do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRecord {
    pub id: String,
    /// `ISS-YYYYMMDD-NNNN`
    pub issuance_number: String,
    pub stock_item_id: String,
    pub order_id: String,
    /// Order number at issue time (snapshot).
    pub order_number: String,
    /// Customer name at issue time (snapshot).
    pub customer_name: String,
    pub issued_quantity: i64,
    /// Actor who issued the stock.
    pub issued_by: String,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    pub remarks: Option<String>,
    pub status: IssuanceStatus,
    #[ts(as = "Option<String>")]
    pub return_date: Option<DateTime<Utc>>,
}

/// Result of a successful issue.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct IssueOutcome {
    pub issuance: IssuanceRecord,
    /// Stock item quantity after the decrement.
    pub remaining_stock: i64,
}

// =============================================================================
// User
// =============================================================================

/// A staff account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a staff account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(current: i64, original: i64) -> StockItem {
        let now = Utc::now();
        StockItem {
            id: "s-1".to_string(),
            batch_number: "PH-0001".to_string(),
            product_name: "Amoxicillin 500mg".to_string(),
            product_type: "antibiotic".to_string(),
            specification: None,
            department: Department::Pharmacy,
            current_quantity: current,
            original_quantity: original,
            unit_price_cents: 250,
            low_stock_threshold: 3,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_order_status_default_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_closed_statuses() {
        assert!(OrderStatus::Cancelled.is_closed());
        assert!(OrderStatus::Delivered.is_closed());
        assert!(OrderStatus::Installed.is_closed());
        assert!(!OrderStatus::Pending.is_closed());
        assert!(!OrderStatus::Processing.is_closed());
        assert!(!OrderStatus::Ready.is_closed());
    }

    #[test]
    fn test_status_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Installed));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_order_status_parse() {
        assert_eq!("Ready".parse::<OrderStatus>().unwrap(), OrderStatus::Ready);
        assert_eq!(" cancelled ".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&IssuanceStatus::Returned).unwrap();
        assert_eq!(json, "\"returned\"");
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[test]
    fn test_stock_item_helpers() {
        let item = stock(3, 10);
        assert!(item.is_low_stock());
        assert!(item.within_bounds());
        assert_eq!(item.stock_value().cents(), 750);

        assert!(!stock(11, 10).within_bounds());
    }
}
