//! # Order Repository
//!
//! Database operations for orders and their lines.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. CREATE                                                              │
//! │     └── create() → Order { status: pending, ORD-YYYYMMDD-NNNN }         │
//! │                                                                         │
//! │  2. FULFIL                                                              │
//! │     └── issuances().issue_stock_to_order() → pending ──► processing     │
//! │                                                                         │
//! │  3. PAY (any time before cancel)                                        │
//! │     └── record_payment() → amount_paid += n, balance recomputed         │
//! │                                                                         │
//! │  4. HAND OVER                                                           │
//! │     └── update_status() → ready ──► delivered | installed               │
//! │                                                                         │
//! │  5. (OPTIONAL) DELETE                                                   │
//! │     └── delete() → refused while any issuance is not returned           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::numbering::{next_number, MAX_NUMBER_ATTEMPTS};
use crate::repository::stock;
use clinic_core::numbering::DocumentKind;
use clinic_core::order::{apply_payment, compute_totals, ensure_deletable, ensure_transition, line_total};
use clinic_core::validation::validate_new_order;
use clinic_core::{CoreError, NewOrder, Order, OrderItem, OrderStatus, OrderWithItems};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Creates a pending order with its lines.
    ///
    /// ## What This Does
    /// 1. Validates fields and computes totals (deposit ≤ total)
    /// 2. Checks every line's stock item exists
    /// 3. Generates the order number and inserts, retrying on collision
    /// 4. Inserts the lines with frozen prices
    pub async fn create(&self, new: &NewOrder) -> DbResult<OrderWithItems> {
        validate_new_order(new)?;
        let totals = compute_totals(&new.items, new.amount_paid_cents)?;

        let mut tx = self.pool.begin().await?;

        for line in &new.items {
            if stock::fetch(&mut tx, &line.stock_item_id).await?.is_none() {
                return Err(CoreError::StockItemNotFound(line.stock_item_id.clone()).into());
            }
        }

        let now = Utc::now();
        let mut order = Order {
            id: Uuid::new_v4().to_string(),
            order_number: String::new(),
            customer_name: new.customer_name.trim().to_string(),
            customer_phone: new
                .customer_phone
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            total_amount_cents: totals.total_amount.cents(),
            amount_paid_cents: totals.amount_paid.cents(),
            balance_due_cents: totals.balance_due.cents(),
            status: OrderStatus::Pending,
            notes: new.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut attempt = 1;
        loop {
            order.order_number = next_number(&mut tx, DocumentKind::Order).await?;
            match insert_order(&mut tx, &order).await {
                Ok(()) => break,
                Err(err) if err.is_unique_violation_on("order_number") && attempt < MAX_NUMBER_ATTEMPTS => {
                    debug!(order_number = %order.order_number, attempt, "Order number taken, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }

        let mut items = Vec::with_capacity(new.items.len());
        for line in &new.items {
            let item = OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                stock_item_id: line.stock_item_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                discount_cents: line.discount_cents,
                line_total_cents: line_total(line)?.cents(),
            };

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, stock_item_id, quantity,
                    unit_price_cents, discount_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.stock_item_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.discount_cents)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            total_cents = order.total_amount_cents,
            lines = items.len(),
            "Order created"
        );

        Ok(OrderWithItems { order, items })
    }

    /// Gets an order (without lines) by ID.
    pub async fn get_order(&self, id: &str) -> DbResult<Order> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()).into())
    }

    /// Gets an order with its lines.
    pub async fn get(&self, id: &str) -> DbResult<OrderWithItems> {
        let order = self.get_order(id).await?;
        let items = self.get_items(id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// Gets all lines for an order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT * FROM order_items WHERE order_id = ?1 ORDER BY rowid",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Lists orders, newest first, optionally filtered by status.
    pub async fn list(&self, status: Option<OrderStatus>) -> DbResult<Vec<Order>> {
        debug!(?status, "Listing orders");

        let orders = match status {
            Some(status) => {
                sqlx::query_as::<_, Order>(
                    "SELECT * FROM orders WHERE status = ?1 ORDER BY created_at DESC, order_number DESC",
                )
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Order>(
                    "SELECT * FROM orders ORDER BY created_at DESC, order_number DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(orders)
    }

    /// Records a payment against the balance due.
    ///
    /// The update is guarded on the previous `amount_paid_cents` so two
    /// concurrent payments cannot both apply to the same balance.
    pub async fn record_payment(&self, id: &str, amount_cents: i64) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let order = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;
        let totals = apply_payment(&order, amount_cents)?;

        let updated = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET
                amount_paid_cents = ?2,
                balance_due_cents = ?3,
                updated_at = ?4
            WHERE id = ?1 AND amount_paid_cents = ?5
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(totals.amount_paid.cents())
        .bind(totals.balance_due.cents())
        .bind(Utc::now())
        .bind(order.amount_paid_cents)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::Internal(format!("Order {} changed during payment", order.order_number)))?;

        tx.commit().await?;

        info!(
            order_number = %updated.order_number,
            amount_cents,
            balance_due_cents = updated.balance_due_cents,
            "Payment recorded"
        );

        Ok(updated)
    }

    /// Moves an order to `next` through a manual transition.
    pub async fn update_status(&self, id: &str, next: OrderStatus) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let order = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;
        ensure_transition(order.status, next)?;

        set_status(&mut tx, id, order.status, next).await?;
        let updated = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;

        tx.commit().await?;

        info!(
            order_number = %updated.order_number,
            from = %order.status,
            to = %next,
            "Order status changed"
        );

        Ok(updated)
    }

    /// Deletes an order and its lines.
    ///
    /// Refused with `HasIssuances` while any issuance against the order is
    /// still `issued` or `damaged`.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let order = fetch(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(id.to_string()))?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM issuance_records WHERE order_id = ?1 AND status != 'returned'",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        ensure_deletable(&order, active)?;

        sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(order_number = %order.order_number, "Order deleted");
        Ok(())
    }
}

// =============================================================================
// Transaction helpers
// =============================================================================

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(order)
}

/// Sets the status, guarded on the status the caller read.
pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    from: OrderStatus,
    to: OrderStatus,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::Internal(format!(
            "Order {id} left status {from} during update"
        )));
    }

    Ok(())
}

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number, customer_name, customer_phone,
            total_amount_cents, amount_paid_cents, balance_due_cents,
            status, notes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.customer_name)
    .bind(&order.customer_phone)
    .bind(order.total_amount_cents)
    .bind(order.amount_paid_cents)
    .bind(order.balance_due_cents)
    .bind(order.status)
    .bind(&order.notes)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use clinic_core::{Department, NewOrderLine, NewStockItem};

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = db
            .stock()
            .create(&NewStockItem {
                batch_number: "FR-01".to_string(),
                product_name: "Titanium frame".to_string(),
                product_type: "frame".to_string(),
                specification: None,
                department: Department::Optical,
                quantity: 10,
                unit_price_cents: 12000,
                low_stock_threshold: 1,
            })
            .await
            .unwrap();
        (db, item.id)
    }

    fn new_order(stock_item_id: &str, deposit: i64) -> NewOrder {
        NewOrder {
            customer_name: "Jane Doe".to_string(),
            customer_phone: Some("0700 000 000".to_string()),
            items: vec![NewOrderLine {
                stock_item_id: stock_item_id.to_string(),
                quantity: 2,
                unit_price_cents: 12000,
                discount_cents: 4000,
            }],
            amount_paid_cents: deposit,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_create_order() {
        let (db, stock_id) = setup().await;
        let created = db.orders().create(&new_order(&stock_id, 5000)).await.unwrap();

        assert_eq!(created.order.status, OrderStatus::Pending);
        assert!(created.order.order_number.starts_with("ORD-"));
        assert!(created.order.order_number.ends_with("-0001"));
        assert_eq!(created.order.total_amount_cents, 20000);
        assert_eq!(created.order.balance_due_cents, 15000);
        assert_eq!(created.items[0].line_total_cents, 20000);

        let loaded = db.orders().get(&created.order.id).await.unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert!(loaded.order.balance_is_consistent());
    }

    #[tokio::test]
    async fn test_order_numbers_are_sequential() {
        let (db, stock_id) = setup().await;
        let first = db.orders().create(&new_order(&stock_id, 0)).await.unwrap();
        let second = db.orders().create(&new_order(&stock_id, 0)).await.unwrap();

        assert!(first.order.order_number.ends_with("-0001"));
        assert!(second.order.order_number.ends_with("-0002"));
    }

    #[tokio::test]
    async fn test_duplicate_order_number_is_unique_violation() {
        let (db, stock_id) = setup().await;
        let created = db.orders().create(&new_order(&stock_id, 0)).await.unwrap();

        let mut clash = created.order.clone();
        clash.id = Uuid::new_v4().to_string();
        let mut conn = db.pool().acquire().await.unwrap();
        let err = insert_order(&mut conn, &clash).await.unwrap_err();

        assert!(err.is_unique_violation_on("order_number"), "{err:?}");
        assert_eq!(db.orders().list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_unknown_stock_item() {
        let (db, _) = setup().await;
        let err = db
            .orders()
            .create(&new_order("550e8400-e29b-41d4-a716-446655440000", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::StockItemNotFound(_))));
        assert!(db.orders().list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_line_total_rejected() {
        let (db, stock_id) = setup().await;
        let mut order = new_order(&stock_id, 0);
        order.items[0].quantity = 3;
        order.items[0].unit_price_cents = i64::MAX / 2;
        order.items[0].discount_cents = 0;

        let err = db.orders().create(&order).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rule(CoreError::Validation(ref v)) if v.field() == "unitPriceCents"
        ));
        assert!(db.orders().list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payments_keep_balance() {
        let (db, stock_id) = setup().await;
        let created = db.orders().create(&new_order(&stock_id, 0)).await.unwrap();
        let id = created.order.id;

        let paid = db.orders().record_payment(&id, 7500).await.unwrap();
        assert_eq!(paid.amount_paid_cents, 7500);
        assert_eq!(paid.balance_due_cents, 12500);
        assert!(paid.balance_is_consistent());

        let err = db.orders().record_payment(&id, 12501).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InvalidPayment { .. })));

        let settled = db.orders().record_payment(&id, 12500).await.unwrap();
        assert_eq!(settled.balance_due_cents, 0);
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let (db, stock_id) = setup().await;
        let id = db.orders().create(&new_order(&stock_id, 0)).await.unwrap().order.id;

        let err = db
            .orders()
            .update_status(&id, OrderStatus::Delivered)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::InvalidStatusTransition { .. })));

        for next in [OrderStatus::Processing, OrderStatus::Ready, OrderStatus::Installed] {
            let order = db.orders().update_status(&id, next).await.unwrap();
            assert_eq!(order.status, next);
        }

        let filtered = db.orders().list(Some(OrderStatus::Installed)).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert!(db.orders().list(Some(OrderStatus::Pending)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_order_without_issuances() {
        let (db, stock_id) = setup().await;
        let id = db.orders().create(&new_order(&stock_id, 0)).await.unwrap().order.id;

        db.orders().delete(&id).await.unwrap();

        let err = db.orders().get(&id).await.unwrap_err();
        assert!(matches!(err, DbError::Rule(CoreError::OrderNotFound(_))));
        assert!(db.orders().get_items(&id).await.unwrap().is_empty());
    }
}
