//! Daily document numbers, looked up inside the caller's transaction.
//!
//! SQLite serializes writers and the lookup runs in the inserting
//! transaction, so a collision is not expected in practice. The retry on a
//! UNIQUE violation is a guard only: callers retry up to
//! [`MAX_NUMBER_ATTEMPTS`] times and then report the conflict.

use chrono::{NaiveDate, Utc};
use clinic_core::numbering::{self, DocumentKind};
use sqlx::SqliteConnection;

use crate::error::DbResult;

/// Insert attempts before a number collision is reported.
pub(crate) const MAX_NUMBER_ATTEMPTS: u32 = 3;

/// Latest number issued on `day` for `kind`, if any.
///
/// Ordered by length first so that `...-10000` sorts after `...-9999`.
async fn latest_on(
    conn: &mut SqliteConnection,
    kind: DocumentKind,
    day: NaiveDate,
) -> DbResult<Option<String>> {
    let sql = match kind {
        DocumentKind::Order => {
            "SELECT order_number FROM orders WHERE order_number LIKE ?1 \
             ORDER BY LENGTH(order_number) DESC, order_number DESC LIMIT 1"
        }
        DocumentKind::Issuance => {
            "SELECT issuance_number FROM issuance_records WHERE issuance_number LIKE ?1 \
             ORDER BY LENGTH(issuance_number) DESC, issuance_number DESC LIMIT 1"
        }
    };
    let pattern = format!("{}%", kind.day_prefix(day));

    let latest: Option<String> = sqlx::query_scalar(sql)
        .bind(pattern)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(latest)
}

/// Next number for today.
pub(crate) async fn next_number(conn: &mut SqliteConnection, kind: DocumentKind) -> DbResult<String> {
    let today = Utc::now().date_naive();
    let latest = latest_on(conn, kind, today).await?;
    Ok(numbering::next_number(kind, today, latest.as_deref()))
}
