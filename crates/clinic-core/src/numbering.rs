//! # Document Numbering
//!
//! Human-facing numbers for orders and issuances: `{PREFIX}-{YYYYMMDD}-{NNNN}`.
//!
//! ## Generation
//! ```text
//! today = 2026-10-19, prefix = ISS
//!      │
//!      ▼
//! latest number starting with "ISS-20261019-" ?
//!      │
//!      ├── none             ──► ISS-20261019-0001
//!      └── ISS-20261019-0041 ──► ISS-20261019-0042
//! ```
//!
//! The database layer looks up the latest number inside the same transaction
//! as the insert, and retries when the unique index rejects a duplicate.

use chrono::NaiveDate;

/// Width of the zero-padded daily sequence.
pub const SEQUENCE_WIDTH: usize = 4;

/// Kinds of numbered documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Order,
    Issuance,
}

impl DocumentKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Order => "ORD",
            DocumentKind::Issuance => "ISS",
        }
    }

    /// `ORD-20261019-` for the given day. Used as a `LIKE` prefix.
    pub fn day_prefix(&self, day: NaiveDate) -> String {
        format!("{}-{}-", self.prefix(), day.format("%Y%m%d"))
    }
}

/// Parses the trailing sequence of a number, if it has one.
pub fn parse_sequence(number: &str) -> Option<u32> {
    number.rsplit('-').next()?.parse().ok()
}

/// Next number for `day`, given the latest number already issued that day.
///
/// An unparseable `latest` is treated as no prior number.
///
/// ```rust
/// use chrono::NaiveDate;
/// use clinic_core::numbering::{next_number, DocumentKind};
///
/// let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
/// assert_eq!(next_number(DocumentKind::Order, day, None), "ORD-20261019-0001");
/// assert_eq!(
///     next_number(DocumentKind::Order, day, Some("ORD-20261019-0009")),
///     "ORD-20261019-0010"
/// );
/// ```
pub fn next_number(kind: DocumentKind, day: NaiveDate, latest: Option<&str>) -> String {
    let prefix = kind.day_prefix(day);
    let next = latest
        .filter(|n| n.starts_with(&prefix))
        .and_then(parse_sequence)
        .map_or(1, |seq| seq + 1);
    format!("{}{:0width$}", prefix, next, width = SEQUENCE_WIDTH)
}
