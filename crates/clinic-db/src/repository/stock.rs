//! # Stock Repository
//!
//! Stock intake and lookup, plus the ledger: the only two statements in the
//! codebase that write `current_quantity`.
//!
//! ## Ledger
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decrement(conn, id, n)   issue_stock_to_order only                     │
//! │     UPDATE ... SET current_quantity = current_quantity - n              │
//! │     WHERE id = ? AND current_quantity >= n                              │
//! │     no row back ──► StockItemNotFound or InsufficientStock              │
//! │                                                                         │
//! │  increment(conn, id, n)   return_stock only                             │
//! │     UPDATE ... SET current_quantity = current_quantity + n              │
//! │     result above original_quantity ──► warn!, not capped                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both take a bare connection so that they can only run on the caller's
//! open transaction. The guard in the WHERE clause keeps a concurrent
//! decrement from driving the quantity negative.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use clinic_core::validation::validate_new_stock_item;
use clinic_core::{CoreError, Department, InventorySnapshot, NewStockItem, StockItem};

/// Repository for stock item operations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Receives new stock. `current_quantity` starts equal to
    /// `original_quantity`.
    pub async fn create(&self, new: &NewStockItem) -> DbResult<StockItem> {
        validate_new_stock_item(new)?;

        let now = Utc::now();
        let item = StockItem {
            id: Uuid::new_v4().to_string(),
            batch_number: new.batch_number.trim().to_string(),
            product_name: new.product_name.trim().to_string(),
            product_type: new.product_type.trim().to_string(),
            specification: new
                .specification
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            department: new.department,
            current_quantity: new.quantity,
            original_quantity: new.quantity,
            unit_price_cents: new.unit_price_cents,
            low_stock_threshold: new.low_stock_threshold,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %item.id, batch_number = %item.batch_number, "Inserting stock item");

        sqlx::query(
            r#"
            INSERT INTO stock_items (
                id, batch_number, product_name, product_type, specification,
                department, current_quantity, original_quantity,
                unit_price_cents, low_stock_threshold, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&item.id)
        .bind(&item.batch_number)
        .bind(&item.product_name)
        .bind(&item.product_type)
        .bind(&item.specification)
        .bind(item.department)
        .bind(item.current_quantity)
        .bind(item.original_quantity)
        .bind(item.unit_price_cents)
        .bind(item.low_stock_threshold)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on("batch_number") => {
                DbError::duplicate("batchNumber", &item.batch_number)
            }
            err => err,
        })?;

        info!(
            batch_number = %item.batch_number,
            quantity = item.original_quantity,
            "Stock received"
        );

        Ok(item)
    }

    /// Gets a stock item by ID.
    pub async fn get(&self, id: &str) -> DbResult<StockItem> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id)
            .await?
            .ok_or_else(|| CoreError::StockItemNotFound(id.to_string()).into())
    }

    /// Finds a stock item by its batch number.
    pub async fn find_by_batch(&self, batch_number: &str) -> DbResult<Option<StockItem>> {
        let item = sqlx::query_as::<_, StockItem>(
            "SELECT * FROM stock_items WHERE batch_number = ?1",
        )
        .bind(batch_number.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Lists stock items, optionally for one department, by product name.
    pub async fn list(&self, department: Option<Department>) -> DbResult<Vec<StockItem>> {
        debug!(?department, "Listing stock items");

        let items = match department {
            Some(department) => {
                sqlx::query_as::<_, StockItem>(
                    "SELECT * FROM stock_items WHERE department = ?1 \
                     ORDER BY product_name, batch_number",
                )
                .bind(department)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, StockItem>(
                    "SELECT * FROM stock_items ORDER BY product_name, batch_number",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(items)
    }

    /// Dashboard snapshot, rebuilt from the current rows.
    pub async fn snapshot(&self, department: Option<Department>) -> DbResult<InventorySnapshot> {
        let items = self.list(department).await?;
        Ok(InventorySnapshot::from_items(items))
    }

    /// Counts stock items.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_items")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Ledger (transaction-only)
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<StockItem>> {
    let item = sqlx::query_as::<_, StockItem>("SELECT * FROM stock_items WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

/// Takes `amount` out of stock. Returns the remaining quantity.
pub(crate) async fn decrement(
    conn: &mut SqliteConnection,
    stock_item_id: &str,
    amount: i64,
) -> DbResult<i64> {
    let remaining: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE stock_items
        SET current_quantity = current_quantity - ?2, updated_at = ?3
        WHERE id = ?1 AND current_quantity >= ?2
        RETURNING current_quantity
        "#,
    )
    .bind(stock_item_id)
    .bind(amount)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;

    match remaining {
        Some(remaining) => {
            debug!(stock_item_id, amount, remaining, "Stock decremented");
            Ok(remaining)
        }
        None => {
            let item = fetch(conn, stock_item_id)
                .await?
                .ok_or_else(|| CoreError::StockItemNotFound(stock_item_id.to_string()))?;
            Err(CoreError::InsufficientStock {
                batch_number: item.batch_number,
                available: item.current_quantity,
                requested: amount,
            }
            .into())
        }
    }
}

/// Puts `amount` back into stock. Not capped at `original_quantity`.
pub(crate) async fn increment(
    conn: &mut SqliteConnection,
    stock_item_id: &str,
    amount: i64,
) -> DbResult<StockItem> {
    let item = sqlx::query_as::<_, StockItem>(
        r#"
        UPDATE stock_items
        SET current_quantity = current_quantity + ?2, updated_at = ?3
        WHERE id = ?1
        RETURNING *
        "#,
    )
    .bind(stock_item_id)
    .bind(amount)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| CoreError::StockItemNotFound(stock_item_id.to_string()))?;

    if item.current_quantity > item.original_quantity {
        warn!(
            batch_number = %item.batch_number,
            current = item.current_quantity,
            original = item.original_quantity,
            "Return pushed stock above the quantity received"
        );
    }

    debug!(stock_item_id, amount, current = item.current_quantity, "Stock incremented");
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn lens(batch: &str, quantity: i64) -> NewStockItem {
        NewStockItem {
            batch_number: batch.to_string(),
            product_name: "CR-39 single vision".to_string(),
            product_type: "lens".to_string(),
            specification: Some("  ".to_string()),
            department: Department::Optical,
            quantity,
            unit_price_cents: 4500,
            low_stock_threshold: 2,
        }
    }

    #[tokio::test]
    async fn test_create_sets_current_to_original() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db.stock().create(&lens("GL-1", 5)).await.unwrap();

        assert_eq!(item.current_quantity, 5);
        assert_eq!(item.original_quantity, 5);
        assert_eq!(item.specification, None);

        let loaded = db.stock().get(&item.id).await.unwrap();
        assert_eq!(loaded, item);
        assert_eq!(db.stock().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_batch_number() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.stock().create(&lens("GL-1", 5)).await.unwrap();

        let err = db.stock().create(&lens("GL-1", 3)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "batchNumber"));
    }

    #[tokio::test]
    async fn test_get_missing_is_rule_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.stock().get("nope").await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::StockItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_by_department() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.stock().create(&lens("GL-1", 5)).await.unwrap();
        let mut pill = lens("PH-1", 100);
        pill.department = Department::Pharmacy;
        pill.product_name = "Amoxicillin 500mg".to_string();
        db.stock().create(&pill).await.unwrap();

        assert_eq!(db.stock().list(None).await.unwrap().len(), 2);
        let pharmacy = db.stock().list(Some(Department::Pharmacy)).await.unwrap();
        assert_eq!(pharmacy.len(), 1);
        assert_eq!(pharmacy[0].batch_number, "PH-1");
        assert!(db.stock().find_by_batch("PH-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ledger_guards_decrement() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db.stock().create(&lens("GL-1", 5)).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(decrement(&mut tx, &item.id, 3).await.unwrap(), 2);

        let err = decrement(&mut tx, &item.id, 5).await.unwrap_err();
        assert!(err.to_string().contains("Available: 2, Requested: 5"));

        let restored = increment(&mut tx, &item.id, 3).await.unwrap();
        assert_eq!(restored.current_quantity, 5);
        tx.commit().await.unwrap();

        assert_eq!(db.stock().get(&item.id).await.unwrap().current_quantity, 5);
    }

    #[tokio::test]
    async fn test_snapshot_recomputes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.stock().create(&lens("GL-1", 2)).await.unwrap();
        db.stock().create(&lens("GL-2", 10)).await.unwrap();

        let snap = db.stock().snapshot(None).await.unwrap();
        assert_eq!(snap.items.len(), 2);
        assert_eq!(snap.low_stock_items.len(), 1);
        assert_eq!(snap.total_stock_value_cents, 12 * 4500);
    }
}
