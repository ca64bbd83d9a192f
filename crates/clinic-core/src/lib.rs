//! # clinic-core: Pure Domain Logic for the Clinic Stock Service
//!
//! Types and rules for stock, orders and issuances with zero I/O. The
//! database layer loads rows, asks this crate what is allowed, and writes.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Clinic Service Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Dashboard (browser)                            │   │
//! │  │    Orders ──► Issue stock ──► Return / Damage ──► Stock view    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ REST + cookies                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  clinic-api (axum)                              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ clinic-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ issuance  │  │ validation│  │   │
//! │  │   │ StockItem │  │   Money   │  │   order   │  │ numbering │  │   │
//! │  │   │  Order    │  │           │  │ inventory │  │   role    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                clinic-db (Database Layer)                       │   │
//! │  │        SQLite, migrations, repositories, transactions           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (StockItem, Order, IssuanceRecord, User)
//! - [`money`] - Integer-cent money
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules for request bodies
//! - [`issuance`] - Issue / return / damage preconditions and effects
//! - [`order`] - Totals, payments, manual status changes
//! - [`numbering`] - `ORD-` / `ISS-` daily sequence numbers
//! - [`role`] - Staff roles and capabilities
//! - [`inventory`] - Dashboard snapshot over stock items
//!
//! ## Example Usage
//!
//! ```rust
//! use clinic_core::issuance::status_after_issue;
//! use clinic_core::OrderStatus;
//!
//! assert_eq!(status_after_issue(OrderStatus::Pending), OrderStatus::Processing);
//! assert_eq!(status_after_issue(OrderStatus::Ready), OrderStatus::Ready);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod inventory;
pub mod issuance;
pub mod money;
pub mod numbering;
pub mod order;
pub mod role;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::InventorySnapshot;
pub use money::Money;
pub use role::{Capability, Role};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of issuance remarks and order notes.
pub const MAX_REMARKS_LEN: usize = 500;

/// Separator placed between remark entries when a return or damage note is
/// added to an issuance.
pub const REMARKS_DELIMITER: &str = " | ";

/// Maximum length of names (product, customer, actor, full name).
pub const MAX_NAME_LEN: usize = 200;
