//! # Order Repository
//!
//! Committed orders, their line snapshots and status transitions.
//!
//! Orders are only created by [`CheckoutCoordinator`](super::checkout::CheckoutCoordinator);
//! this repository reads them and moves them through the status machine.
//!
//! ## Status Changes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  set_status(number, paid | cancelled)                                   │
//! │                                                                         │
//! │  UPDATE orders SET status = :to                                         │
//! │  WHERE order_number = :number AND status = 'pending'                    │
//! │       │                                                                 │
//! │       ├── 1 row  → done                                                 │
//! │       └── 0 rows → order missing         → NOT_FOUND                    │
//! │                    order already final   → INVALID_STATUS_TRANSITION    │
//! │                                                                         │
//! │  cancel(number, restock = true)                                         │
//! │       same update + each line's quantity back to its product,           │
//! │       all inside one BEGIN IMMEDIATE transaction                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::begin_immediate;
use crate::repository::stock::adjust_in;
use shopfront_core::{
    CoreError, Order, OrderDetails, OrderLine, OrderStatus, PricedLine, Quote, UserId,
};

const ORDER_COLUMNS: &str = "id, order_number, user_id, total_price, discount_percent, \
                             final_price, status, created_at, updated_at";

const LINE_COLUMNS: &str = "id, order_id, product_id, product_name, quantity, price_per_item, subtotal";

/// Repository for committed orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order and its lines by order number.
    pub async fn get(&self, order_number: &str) -> DbResult<Option<OrderDetails>> {
        let mut conn = self.pool.acquire().await?;

        let Some(order) = find_in(&mut conn, order_number).await? else {
            return Ok(None);
        };
        let lines = lines_in(&mut conn, order.id).await?;

        Ok(Some(OrderDetails { order, lines }))
    }

    /// Lists every order, newest first.
    pub async fn list_all(&self) -> DbResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY id DESC");

        let orders = sqlx::query_as::<_, Order>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Lists one user's orders, newest first.
    pub async fn list_for_user(&self, user_id: UserId) -> DbResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?1 ORDER BY id DESC");

        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(orders)
    }

    /// Lines of an order, in the order they were written.
    pub async fn lines(&self, order_id: i64) -> DbResult<Vec<OrderLine>> {
        let mut conn = self.pool.acquire().await?;
        lines_in(&mut conn, order_id).await
    }

    /// Checks whether an order number is taken.
    pub async fn exists(&self, order_number: &str) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        exists_in(&mut conn, order_number).await
    }

    /// Moves a pending order to `status`.
    ///
    /// ## Returns
    /// * `Ok(Order)` - The updated order
    /// * `Err(DbError::NotFound)` - No such order
    /// * `Err(DbError::Core(InvalidStatusTransition))` - Order is not pending,
    ///   or `status` is `Pending`
    pub async fn set_status(&self, order_number: &str, status: OrderStatus) -> DbResult<Order> {
        let mut conn = self.pool.acquire().await?;
        let order = transition_in(&mut conn, order_number, status).await?;

        info!(order_number = %order_number, status = %status, "Order status changed");
        Ok(order)
    }

    /// Marks a pending order as paid.
    pub async fn mark_paid(&self, order_number: &str) -> DbResult<Order> {
        self.set_status(order_number, OrderStatus::Paid).await
    }

    /// Cancels a pending order, optionally returning its units to stock.
    ///
    /// Lines whose product has since been deleted are skipped.
    pub async fn cancel(&self, order_number: &str, restock: bool) -> DbResult<Order> {
        let mut tx = begin_immediate(&self.pool).await?;

        let order = transition_in(&mut tx, order_number, OrderStatus::Cancelled).await?;

        if restock {
            for line in lines_in(&mut tx, order.id).await? {
                if let Some(product_id) = line.product_id {
                    adjust_in(&mut tx, product_id, line.quantity).await?;
                }
            }
        }

        tx.commit().await?;

        info!(order_number = %order_number, restock, "Order cancelled");
        Ok(order)
    }

    /// Deletes an order and its lines. Stock is not touched.
    pub async fn delete(&self, order_number: &str) -> DbResult<()> {
        let mut tx = begin_immediate(&self.pool).await?;

        let order = find_in(&mut tx, order_number)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_number))?;

        sqlx::query("DELETE FROM order_lines WHERE order_id = ?1")
            .bind(order.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(order.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(order_number = %order_number, "Order deleted");
        Ok(())
    }

    /// Counts orders.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

pub(crate) async fn find_in(conn: &mut SqliteConnection, order_number: &str) -> DbResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?1");

    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(order_number)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(order)
}

pub(crate) async fn exists_in(conn: &mut SqliteConnection, order_number: &str) -> DbResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = ?1)")
        .bind(order_number)
        .fetch_one(&mut *conn)
        .await?;

    Ok(exists)
}

async fn lines_in(conn: &mut SqliteConnection, order_id: i64) -> DbResult<Vec<OrderLine>> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM order_lines WHERE order_id = ?1 ORDER BY id");

    let lines = sqlx::query_as::<_, OrderLine>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(lines)
}

/// Conditional `pending → status` update on `conn`.
async fn transition_in(
    conn: &mut SqliteConnection,
    order_number: &str,
    status: OrderStatus,
) -> DbResult<Order> {
    debug!(order_number = %order_number, status = %status, "Changing order status");

    if OrderStatus::Pending.can_transition_to(status) {
        let sql = format!(
            "UPDATE orders SET status = ?2, updated_at = ?3 \
             WHERE order_number = ?1 AND status = 'pending' \
             RETURNING {ORDER_COLUMNS}"
        );

        let updated = sqlx::query_as::<_, Order>(&sql)
            .bind(order_number)
            .bind(status)
            .bind(Utc::now())
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(order) = updated {
            return Ok(order);
        }
    }

    let current = find_in(conn, order_number)
        .await?
        .ok_or_else(|| DbError::not_found("Order", order_number))?;

    Err(CoreError::InvalidStatusTransition {
        order_number: order_number.to_string(),
        from: current.status,
        to: status,
    }
    .into())
}

/// Inserts a pending order row for `quote` under `order_number`.
pub(crate) async fn insert_in(
    conn: &mut SqliteConnection,
    order_number: &str,
    user_id: UserId,
    quote: &Quote,
) -> DbResult<Order> {
    let now = Utc::now();
    let sql = format!(
        "INSERT INTO orders \
         (order_number, user_id, total_price, discount_percent, final_price, status, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) \
         RETURNING {ORDER_COLUMNS}"
    );

    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(order_number)
        .bind(user_id)
        .bind(quote.total_price)
        .bind(quote.discount_percent)
        .bind(quote.final_price)
        .bind(OrderStatus::Pending)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    Ok(order)
}

/// Writes the immutable line snapshots of an order.
pub(crate) async fn insert_lines_in(
    conn: &mut SqliteConnection,
    order_id: i64,
    lines: &[PricedLine],
) -> DbResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO order_lines
                (order_id, product_id, product_name, quantity, price_per_item, subtotal)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(order_id)
        .bind(line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.subtotal)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::testing::{memory_db, place_order, product};
    use crate::DbError;
    use shopfront_core::{CoreError, ErrorCode, OrderStatus};

    #[tokio::test]
    async fn test_get_and_list() {
        let db = memory_db().await;
        let tea = product(&db, "Tea", 100, 10).await;
        let cake = product(&db, "Cake", 250, 10).await;

        let first = place_order(&db, 1, &[(tea.id, 2), (cake.id, 1)]).await;
        let second = place_order(&db, 2, &[(tea.id, 1)]).await;
        let third = place_order(&db, 1, &[(cake.id, 3)]).await;

        let details = db.orders().get(&first).await.unwrap().unwrap();
        assert_eq!(details.order.user_id, 1);
        assert_eq!(details.order.status, OrderStatus::Pending);
        assert_eq!(details.lines.len(), 2);
        assert_eq!(details.lines_total(), details.order.total_price);
        assert_eq!(db.orders().lines(details.order.id).await.unwrap(), details.lines);

        let all: Vec<String> = db
            .orders()
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.order_number)
            .collect();
        assert_eq!(all, vec![third.clone(), second, first.clone()]);

        let mine: Vec<String> = db
            .orders()
            .list_for_user(1)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.order_number)
            .collect();
        assert_eq!(mine, vec![third, first]);

        assert!(db.orders().get("ORD-missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_transitions() {
        let db = memory_db().await;
        let tea = product(&db, "Tea", 100, 10).await;
        let number = place_order(&db, 1, &[(tea.id, 1)]).await;

        let paid = db.orders().mark_paid(&number).await.unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);

        let err = db.orders().set_status(&number, OrderStatus::Cancelled).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InvalidStatusTransition {
                from: OrderStatus::Paid,
                to: OrderStatus::Cancelled,
                ..
            })
        ));

        let other = place_order(&db, 1, &[(tea.id, 1)]).await;
        let err = db.orders().set_status(&other, OrderStatus::Pending).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidStatusTransition);

        let err = db.orders().set_status("ORD-nope", OrderStatus::Paid).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_status_change_has_no_stock_effect() {
        let db = memory_db().await;
        let tea = product(&db, "Tea", 100, 10).await;
        let number = place_order(&db, 1, &[(tea.id, 4)]).await;

        db.orders().set_status(&number, OrderStatus::Cancelled).await.unwrap();
        assert_eq!(db.stock().get_available(tea.id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_cancel_with_restock() {
        let db = memory_db().await;
        let tea = product(&db, "Tea", 100, 10).await;
        let cake = product(&db, "Cake", 250, 5).await;
        let number = place_order(&db, 1, &[(tea.id, 4), (cake.id, 2)]).await;

        // A deleted product is skipped, its snapshot stays
        db.products().delete(cake.id).await.unwrap();

        let cancelled = db.orders().cancel(&number, true).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(db.stock().get_available(tea.id).await.unwrap(), 10);

        let details = db.orders().get(&number).await.unwrap().unwrap();
        let cake_line = details.lines.iter().find(|l| l.product_name == "Cake").unwrap();
        assert_eq!(cake_line.product_id, None);
        assert_eq!(cake_line.price_per_item.amount(), 250);

        // Terminal: cancelling again fails and restocks nothing
        assert!(db.orders().cancel(&number, true).await.is_err());
        assert_eq!(db.stock().get_available(tea.id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_cancel_without_restock() {
        let db = memory_db().await;
        let tea = product(&db, "Tea", 100, 10).await;
        let number = place_order(&db, 1, &[(tea.id, 4)]).await;

        db.orders().cancel(&number, false).await.unwrap();
        assert_eq!(db.stock().get_available(tea.id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = memory_db().await;
        let tea = product(&db, "Tea", 100, 10).await;
        let number = place_order(&db, 1, &[(tea.id, 2)]).await;
        let order_id = db.orders().get(&number).await.unwrap().unwrap().order.id;

        db.orders().delete(&number).await.unwrap();

        assert!(!db.orders().exists(&number).await.unwrap());
        assert!(db.orders().lines(order_id).await.unwrap().is_empty());
        assert_eq!(db.stock().get_available(tea.id).await.unwrap(), 8);
        assert_eq!(db.orders().delete(&number).await.unwrap_err().code(), ErrorCode::NotFound);
    }
}
