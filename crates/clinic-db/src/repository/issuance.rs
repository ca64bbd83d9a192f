//! # Issuance Repository
//!
//! The issuance workflow: the only path by which stock leaves inventory and
//! attaches to an order, and the only path by which it comes back.
//!
//! ## Issue Stock to Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request.validate()                                   (no transaction)  │
//! │       │                                                                 │
//! │  BEGIN                                                                  │
//! │       ├── 1. load order            ──► OrderNotFound                    │
//! │       ├── 2. order open?           ──► InvalidOrderState                │
//! │       ├── 3. load stock item       ──► StockItemNotFound                │
//! │       ├── 4. enough on hand?       ──► InsufficientStock                │
//! │       │                                                                 │
//! │       ├── insert issuance record (ISS-YYYYMMDD-NNNN, retried)           │
//! │       ├── ledger decrement (guarded)                                    │
//! │       └── pending ──► processing                                        │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any `?` before COMMIT drops the transaction: nothing is written.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The issuance record doubles as the audit log. A record in `issued` status
//! is exactly the stock currently held by an order.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::numbering::{next_number, MAX_NUMBER_ATTEMPTS};
use crate::repository::{order, stock};
use clinic_core::issuance::{
    append_remarks, ensure_available, ensure_issued, ensure_order_open, status_after_issue,
    IssueRequest,
};
use clinic_core::numbering::DocumentKind;
use clinic_core::validation::validate_remarks;
use clinic_core::{CoreError, IssuanceRecord, IssuanceStatus, IssueOutcome};

/// Repository for the issuance workflow.
#[derive(Debug, Clone)]
pub struct IssuanceRepository {
    pool: SqlitePool,
}

impl IssuanceRepository {
    /// Creates a new IssuanceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        IssuanceRepository { pool }
    }

    /// Issues `request.quantity` units of a stock item to an order.
    ///
    /// Preconditions are checked in order and the first failure wins.
    /// Returns the new record and the quantity left on the stock item.
    pub async fn issue_stock_to_order(
        &self,
        order_id: &str,
        request: &IssueRequest,
    ) -> DbResult<IssueOutcome> {
        request.validate()?;

        let mut tx = self.pool.begin().await?;

        let order = order::fetch(&mut tx, order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))?;
        ensure_order_open(&order)?;

        let item = stock::fetch(&mut tx, &request.stock_item_id)
            .await?
            .ok_or_else(|| CoreError::StockItemNotFound(request.stock_item_id.clone()))?;
        ensure_available(&item, request.quantity)?;

        let mut record = IssuanceRecord {
            id: Uuid::new_v4().to_string(),
            issuance_number: String::new(),
            stock_item_id: item.id.clone(),
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            customer_name: order.customer_name.clone(),
            issued_quantity: request.quantity,
            issued_by: request.issued_by.trim().to_string(),
            issued_at: Utc::now(),
            remarks: append_remarks(None, request.remarks.as_deref()),
            status: IssuanceStatus::Issued,
            return_date: None,
        };

        let mut attempt = 1;
        loop {
            record.issuance_number = next_number(&mut tx, DocumentKind::Issuance).await?;
            match insert_record(&mut tx, &record).await {
                Ok(()) => break,
                Err(err)
                    if err.is_unique_violation_on("issuance_number")
                        && attempt < MAX_NUMBER_ATTEMPTS =>
                {
                    debug!(issuance_number = %record.issuance_number, attempt, "Issuance number taken, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }

        let remaining_stock = stock::decrement(&mut tx, &item.id, request.quantity).await?;

        let next_status = status_after_issue(order.status);
        if next_status != order.status {
            order::set_status(&mut tx, &order.id, order.status, next_status).await?;
        }

        tx.commit().await?;

        info!(
            issuance_number = %record.issuance_number,
            order_number = %record.order_number,
            batch_number = %item.batch_number,
            quantity = record.issued_quantity,
            remaining_stock,
            "Stock issued"
        );

        Ok(IssueOutcome {
            issuance: record,
            remaining_stock,
        })
    }

    /// Returns issued stock to inventory.
    ///
    /// Restores `issued_quantity` to the stock item (uncapped), marks the
    /// record `returned`, stamps `return_date` and appends `remarks`.
    pub async fn return_stock(
        &self,
        issuance_id: &str,
        remarks: Option<&str>,
    ) -> DbResult<IssuanceRecord> {
        validate_remarks(remarks)?;

        let mut tx = self.pool.begin().await?;

        let record = fetch(&mut tx, issuance_id)
            .await?
            .ok_or_else(|| CoreError::IssuanceNotFound(issuance_id.to_string()))?;
        ensure_issued(&record)?;

        let remarks = append_remarks(record.remarks.as_deref(), remarks);
        let updated = close_record(
            &mut tx,
            &record,
            IssuanceStatus::Returned,
            Some(Utc::now()),
            remarks,
        )
        .await?;

        let item = stock::increment(&mut tx, &record.stock_item_id, record.issued_quantity).await?;

        tx.commit().await?;

        info!(
            issuance_number = %updated.issuance_number,
            batch_number = %item.batch_number,
            quantity = updated.issued_quantity,
            current_quantity = item.current_quantity,
            "Stock returned"
        );

        Ok(updated)
    }

    /// Marks issued stock as damaged. Stock is not restored.
    pub async fn mark_damaged(
        &self,
        issuance_id: &str,
        remarks: Option<&str>,
    ) -> DbResult<IssuanceRecord> {
        validate_remarks(remarks)?;

        let mut conn = self.pool.acquire().await?;

        let record = fetch(&mut conn, issuance_id)
            .await?
            .ok_or_else(|| CoreError::IssuanceNotFound(issuance_id.to_string()))?;
        ensure_issued(&record)?;

        let remarks = append_remarks(record.remarks.as_deref(), remarks);
        let updated =
            close_record(&mut conn, &record, IssuanceStatus::Damaged, None, remarks).await?;

        info!(
            issuance_number = %updated.issuance_number,
            quantity = updated.issued_quantity,
            "Issuance marked damaged"
        );

        Ok(updated)
    }

    /// Gets an issuance record by ID.
    pub async fn get(&self, id: &str) -> DbResult<IssuanceRecord> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id)
            .await?
            .ok_or_else(|| CoreError::IssuanceNotFound(id.to_string()).into())
    }

    /// All issuances against an order, oldest first.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<IssuanceRecord>> {
        let records = sqlx::query_as::<_, IssuanceRecord>(
            "SELECT * FROM issuance_records WHERE order_id = ?1 ORDER BY issued_at, issuance_number",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// All issuances of a stock item, newest first.
    pub async fn list_for_stock_item(&self, stock_item_id: &str) -> DbResult<Vec<IssuanceRecord>> {
        let records = sqlx::query_as::<_, IssuanceRecord>(
            "SELECT * FROM issuance_records WHERE stock_item_id = ?1 \
             ORDER BY issued_at DESC, issuance_number DESC",
        )
        .bind(stock_item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<IssuanceRecord>> {
    let record = sqlx::query_as::<_, IssuanceRecord>("SELECT * FROM issuance_records WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(record)
}

async fn insert_record(conn: &mut SqliteConnection, record: &IssuanceRecord) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO issuance_records (
            id, issuance_number, stock_item_id, order_id, order_number,
            customer_name, issued_quantity, issued_by, issued_at,
            remarks, status, return_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&record.id)
    .bind(&record.issuance_number)
    .bind(&record.stock_item_id)
    .bind(&record.order_id)
    .bind(&record.order_number)
    .bind(&record.customer_name)
    .bind(record.issued_quantity)
    .bind(&record.issued_by)
    .bind(record.issued_at)
    .bind(&record.remarks)
    .bind(record.status)
    .bind(record.return_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Moves an `issued` record to a terminal status.
///
/// Guarded on `status = 'issued'`: when a concurrent writer got there first
/// the record is re-read and the matching `Already*` error returned.
async fn close_record(
    conn: &mut SqliteConnection,
    record: &IssuanceRecord,
    status: IssuanceStatus,
    return_date: Option<chrono::DateTime<Utc>>,
    remarks: Option<String>,
) -> DbResult<IssuanceRecord> {
    let updated = sqlx::query_as::<_, IssuanceRecord>(
        r#"
        UPDATE issuance_records
        SET status = ?2, return_date = COALESCE(?3, return_date), remarks = ?4
        WHERE id = ?1 AND status = 'issued'
        RETURNING *
        "#,
    )
    .bind(&record.id)
    .bind(status)
    .bind(return_date)
    .bind(remarks)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(updated) => Ok(updated),
        None => {
            let current = fetch(conn, &record.id)
                .await?
                .ok_or_else(|| CoreError::IssuanceNotFound(record.id.clone()))?;
            Err(DbError::Rule(CoreError::issuance_closed(
                &current.issuance_number,
                current.status,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use clinic_core::{Department, NewOrder, NewOrderLine, NewStockItem, OrderStatus};

    struct Fixture {
        db: Database,
        stock_id: String,
        order_id: String,
    }

    /// Stock item with 5 units and one pending order.
    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db
            .stock()
            .create(&NewStockItem {
                batch_number: "GL-2026-07".to_string(),
                product_name: "Polycarbonate lens".to_string(),
                product_type: "glass".to_string(),
                specification: Some("-1.25 / 70mm".to_string()),
                department: Department::Optical,
                quantity: 5,
                unit_price_cents: 3000,
                low_stock_threshold: 1,
            })
            .await
            .unwrap();
        let order = db
            .orders()
            .create(&NewOrder {
                customer_name: "Jane Doe".to_string(),
                customer_phone: None,
                items: vec![NewOrderLine {
                    stock_item_id: item.id.clone(),
                    quantity: 3,
                    unit_price_cents: 3000,
                    discount_cents: 0,
                }],
                amount_paid_cents: 0,
                notes: None,
            })
            .await
            .unwrap();

        Fixture {
            db,
            stock_id: item.id,
            order_id: order.order.id,
        }
    }

    fn request(stock_id: &str, quantity: i64) -> IssueRequest {
        IssueRequest {
            stock_item_id: stock_id.to_string(),
            quantity,
            issued_by: "optician.amina".to_string(),
            remarks: None,
        }
    }

    async fn current_quantity(f: &Fixture) -> i64 {
        f.db.stock().get(&f.stock_id).await.unwrap().current_quantity
    }

    #[tokio::test]
    async fn test_issue_decrements_and_advances_order() {
        let f = fixture().await;

        let outcome = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 3))
            .await
            .unwrap();

        assert_eq!(outcome.issuance.issued_quantity, 3);
        assert_eq!(outcome.issuance.status, IssuanceStatus::Issued);
        assert_eq!(outcome.issuance.customer_name, "Jane Doe");
        assert!(outcome.issuance.issuance_number.ends_with("-0001"));
        assert_eq!(outcome.remaining_stock, 2);
        assert_eq!(current_quantity(&f).await, 2);

        let order = f.db.orders().get_order(&f.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert_eq!(outcome.issuance.order_number, order.order_number);
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let f = fixture().await;
        f.db.issuances()
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 3))
            .await
            .unwrap();
        let order_before = f.db.orders().get_order(&f.order_id).await.unwrap();

        let err = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 5))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Rule(CoreError::InsufficientStock { .. })));
        assert!(err.to_string().contains("Available: 2, Requested: 5"));
        assert_eq!(current_quantity(&f).await, 2);
        assert_eq!(f.db.orders().get_order(&f.order_id).await.unwrap(), order_before);
        assert_eq!(f.db.issuances().list_for_order(&f.order_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_atomic_on_first_issue_failure() {
        let f = fixture().await;

        let err = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 6))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Rule(CoreError::InsufficientStock { .. })));
        let order = f.db.orders().get_order(&f.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(current_quantity(&f).await, 5);
        assert!(f.db.issuances().list_for_stock_item(&f.stock_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_order_rejects_issue() {
        let f = fixture().await;
        f.db.orders()
            .update_status(&f.order_id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let err = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Rule(CoreError::InvalidOrderState { .. })));
        assert_eq!(current_quantity(&f).await, 5);
        assert!(f.db.issuances().list_for_order(&f.order_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_precondition_order() {
        let f = fixture().await;

        // Missing order wins over missing stock item.
        let err = f
            .db
            .issuances()
            .issue_stock_to_order("missing-order", &request("550e8400-e29b-41d4-a716-446655440000", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::OrderNotFound(_))));

        let err = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &request("550e8400-e29b-41d4-a716-446655440000", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::StockItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_request_is_validation_error() {
        let f = fixture().await;
        let mut req = request(&f.stock_id, 0);

        let err = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &req)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(_))));

        req.quantity = 1;
        req.issued_by = " ".to_string();
        let err = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &req)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::Validation(ref v)) if v.field() == "issuedBy"));
    }

    #[tokio::test]
    async fn test_later_issues_never_move_status_back() {
        let f = fixture().await;
        let issuances = f.db.issuances();

        for _ in 0..2 {
            issuances
                .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 1))
                .await
                .unwrap();
            let order = f.db.orders().get_order(&f.order_id).await.unwrap();
            assert_eq!(order.status, OrderStatus::Processing);
        }

        f.db.orders()
            .update_status(&f.order_id, OrderStatus::Ready)
            .await
            .unwrap();
        issuances
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 1))
            .await
            .unwrap();

        let order = f.db.orders().get_order(&f.order_id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Ready);
    }

    #[tokio::test]
    async fn test_return_restores_stock() {
        let f = fixture().await;
        let issued = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 3))
            .await
            .unwrap()
            .issuance;

        let returned = f
            .db
            .issuances()
            .return_stock(&issued.id, Some("wrong power"))
            .await
            .unwrap();

        assert_eq!(returned.status, IssuanceStatus::Returned);
        assert!(returned.return_date.is_some());
        assert_eq!(returned.remarks.as_deref(), Some("wrong power"));
        assert_eq!(returned.issued_quantity, 3);
        assert_eq!(current_quantity(&f).await, 5);
    }

    #[tokio::test]
    async fn test_double_return_is_rejected() {
        let f = fixture().await;
        let issued = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 3))
            .await
            .unwrap()
            .issuance;

        f.db.issuances().return_stock(&issued.id, None).await.unwrap();
        let err = f
            .db
            .issuances()
            .return_stock(&issued.id, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Rule(CoreError::AlreadyReturned(_))));
        assert_eq!(current_quantity(&f).await, 5);
    }

    #[tokio::test]
    async fn test_damage_keeps_stock_out() {
        let f = fixture().await;
        let issued = f
            .db
            .issuances()
            .issue_stock_to_order(
                &f.order_id,
                &IssueRequest {
                    remarks: Some("fitted".to_string()),
                    ..request(&f.stock_id, 2)
                },
            )
            .await
            .unwrap()
            .issuance;

        let damaged = f
            .db
            .issuances()
            .mark_damaged(&issued.id, Some("cracked during edging"))
            .await
            .unwrap();

        assert_eq!(damaged.status, IssuanceStatus::Damaged);
        assert_eq!(damaged.remarks.as_deref(), Some("fitted | cracked during edging"));
        assert!(damaged.return_date.is_none());
        assert_eq!(current_quantity(&f).await, 3);

        let err = f.db.issuances().mark_damaged(&issued.id, None).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::AlreadyDamaged(_))));

        let err = f.db.issuances().return_stock(&issued.id, None).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::AlreadyDamaged(_))));
        assert_eq!(current_quantity(&f).await, 3);
    }

    #[tokio::test]
    async fn test_damage_after_return_is_rejected() {
        let f = fixture().await;
        let issued = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 1))
            .await
            .unwrap()
            .issuance;
        f.db.issuances().return_stock(&issued.id, None).await.unwrap();

        let err = f.db.issuances().mark_damaged(&issued.id, None).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::AlreadyReturned(_))));
    }

    #[tokio::test]
    async fn test_missing_issuance() {
        let f = fixture().await;
        let err = f.db.issuances().return_stock("nope", None).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::IssuanceNotFound(_))));
        let err = f.db.issuances().get("nope").await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::IssuanceNotFound(_))));
    }

    #[tokio::test]
    async fn test_issuance_numbers_are_sequential() {
        let f = fixture().await;
        let issuances = f.db.issuances();

        let first = issuances
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 1))
            .await
            .unwrap()
            .issuance;
        let second = issuances
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 1))
            .await
            .unwrap()
            .issuance;

        let prefix = DocumentKind::Issuance.day_prefix(Utc::now().date_naive());
        assert_eq!(first.issuance_number, format!("{prefix}0001"));
        assert_eq!(second.issuance_number, format!("{prefix}0002"));
    }

    #[tokio::test]
    async fn test_concurrent_issues_never_oversell() {
        let f = fixture().await;
        let a = f.db.issuances();
        let b = f.db.issuances();
        let req = request(&f.stock_id, 3);

        let (first, second) = tokio::join!(
            a.issue_stock_to_order(&f.order_id, &req),
            b.issue_stock_to_order(&f.order_id, &req),
        );

        let successes = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        assert_eq!(current_quantity(&f).await, 2);
    }

    #[tokio::test]
    async fn test_delete_order_blocked_until_returned() {
        let f = fixture().await;
        let issued = f
            .db
            .issuances()
            .issue_stock_to_order(&f.order_id, &request(&f.stock_id, 2))
            .await
            .unwrap()
            .issuance;

        let err = f.db.orders().delete(&f.order_id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::HasIssuances { count: 1, .. })));

        f.db.issuances().return_stock(&issued.id, None).await.unwrap();
        f.db.orders().delete(&f.order_id).await.unwrap();

        // The audit trail survives the order.
        let record = f.db.issuances().get(&issued.id).await.unwrap();
        assert_eq!(record.status, IssuanceStatus::Returned);
    }

    #[tokio::test]
    async fn test_stock_bound_holds_through_workflow() {
        let f = fixture().await;
        let issuances = f.db.issuances();
        let mut issued = Vec::new();

        for qty in [2, 2, 1] {
            let outcome = issuances
                .issue_stock_to_order(&f.order_id, &request(&f.stock_id, qty))
                .await
                .unwrap();
            issued.push(outcome.issuance.id);
            let item = f.db.stock().get(&f.stock_id).await.unwrap();
            assert!(item.within_bounds());
        }
        assert_eq!(current_quantity(&f).await, 0);

        for id in &issued {
            issuances.return_stock(id, None).await.unwrap();
            let item = f.db.stock().get(&f.stock_id).await.unwrap();
            assert!(item.within_bounds());
        }
        assert_eq!(current_quantity(&f).await, 5);
    }
}
