//! # Repository Module
//!
//! Database repository implementations for the clinic service.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axum handler                                                           │
//! │       │                                                                 │
//! │       │  db.issuances().issue_stock_to_order(&order_id, &request)       │
//! │       ▼                                                                 │
//! │  IssuanceRepository                                                     │
//! │  ├── BEGIN                                                              │
//! │  ├── order::fetch / stock::fetch        (read through the transaction)  │
//! │  ├── clinic_core::issuance rules        (pure decisions)                │
//! │  ├── stock::decrement / order::set_status                               │
//! │  └── COMMIT                                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `pub(crate)` functions taking a `&mut SqliteConnection` are the
//! building blocks that run on a caller's transaction. Only the issuance
//! repository calls the stock ledger.
//!
//! ## Available Repositories
//!
//! - [`StockRepository`](stock::StockRepository) - Stock intake, lookup, snapshot
//! - [`OrderRepository`](order::OrderRepository) - Orders, payments, status
//! - [`IssuanceRepository`](issuance::IssuanceRepository) - Issue, return, damage
//! - [`UserRepository`](user::UserRepository) - Staff accounts

pub mod issuance;
pub mod order;
pub mod stock;
pub mod user;
