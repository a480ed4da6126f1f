//! # Cart Store
//!
//! Per-user, per-product desired quantities.
//!
//! Carts are validated against stock but never change it: stock moves exactly
//! once, inside the checkout transaction.
//!
//! ## Add Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add(user, product, qty)                                                │
//! │       │                                                                 │
//! │       ├── 1 ≤ qty ≤ 999?                     no → INVALID_ARGUMENT      │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE                                                        │
//! │       ├── product exists?                    no → NOT_FOUND             │
//! │       ├── new line and cart already has 100? yes → INVALID_ARGUMENT     │
//! │       ├── existing + qty ≤ stock?            no → INSUFFICIENT_STOCK    │
//! │       ▼                                                                 │
//! │  upsert cart line (quantities merged)                                   │
//! │       ▼                                                                 │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::begin_immediate;
use crate::repository::stock::current_stock;
use shopfront_core::validation::{validate_cart_size, validate_quantity};
use shopfront_core::{CartItem, CoreError, DiscountPercent, ProductId, Quote, UserId};

/// Cart lines for every user.
#[derive(Debug, Clone)]
pub struct CartStore {
    pool: SqlitePool,
}

impl CartStore {
    pub fn new(pool: SqlitePool) -> Self {
        CartStore { pool }
    }

    /// Adds `quantity` units of a product to a user's cart.
    ///
    /// Merges into an existing line. Returns the line's new quantity.
    pub async fn add(&self, user_id: UserId, product_id: ProductId, quantity: i64) -> DbResult<i64> {
        validate_quantity(quantity)?;

        debug!(user_id, product_id, quantity, "Adding to cart");

        let mut tx = begin_immediate(&self.pool).await?;

        let existing = quantity_in(&mut tx, user_id, product_id).await?;
        let wanted = existing + quantity;
        validate_quantity(wanted)?;
        ensure_fits(&mut tx, user_id, product_id, existing, wanted).await?;

        upsert_in(&mut tx, user_id, product_id, wanted).await?;
        tx.commit().await?;

        info!(user_id, product_id, quantity = wanted, "Cart line updated");
        Ok(wanted)
    }

    /// Overwrites the quantity of a cart line.
    ///
    /// `quantity <= 0` removes the line (a no-op if it isn't there).
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> DbResult<()> {
        if quantity <= 0 {
            self.remove(user_id, product_id).await?;
            return Ok(());
        }

        validate_quantity(quantity)?;

        debug!(user_id, product_id, quantity, "Setting cart quantity");

        let mut tx = begin_immediate(&self.pool).await?;

        let existing = quantity_in(&mut tx, user_id, product_id).await?;
        ensure_fits(&mut tx, user_id, product_id, existing, quantity).await?;

        upsert_in(&mut tx, user_id, product_id, quantity).await?;
        tx.commit().await?;

        info!(user_id, product_id, quantity, "Cart line updated");
        Ok(())
    }

    /// Removes a product from a user's cart. Returns whether a line was removed.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = ?1 AND product_id = ?2")
            .bind(user_id)
            .bind(product_id)
            .execute(&self.pool)
            .await?;

        debug!(user_id, product_id, removed = result.rows_affected(), "Removed cart line");
        Ok(result.rows_affected() > 0)
    }

    /// Empties a user's cart. Returns the number of lines removed.
    pub async fn clear(&self, user_id: UserId) -> DbResult<u64> {
        let mut conn = self.pool.acquire().await?;
        let removed = clear_in(&mut conn, user_id).await?;

        debug!(user_id, removed, "Cleared cart");
        Ok(removed)
    }

    /// Lists a user's cart joined with current product name, price and stock.
    pub async fn lines(&self, user_id: UserId) -> DbResult<Vec<CartItem>> {
        let mut conn = self.pool.acquire().await?;
        items_in(&mut conn, user_id).await
    }

    /// Quantity of one product in a user's cart, 0 if absent.
    pub async fn quantity_of(&self, user_id: UserId, product_id: ProductId) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        quantity_in(&mut conn, user_id, product_id).await
    }

    /// Prices a user's cart at current prices with `discount` applied.
    ///
    /// For display only; checkout re-prices inside its own transaction.
    pub async fn summary(&self, user_id: UserId, discount: DiscountPercent) -> DbResult<Quote> {
        let items = self.lines(user_id).await?;
        Ok(Quote::compute(&items, discount)?)
    }
}

/// Fails unless `wanted` units fit in stock and a new line fits in the cart.
async fn ensure_fits(
    conn: &mut SqliteConnection,
    user_id: UserId,
    product_id: ProductId,
    existing: i64,
    wanted: i64,
) -> DbResult<()> {
    let available = current_stock(conn, product_id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", product_id))?;

    if existing == 0 {
        let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_lines WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;
        validate_cart_size(lines as usize)?;
    }

    if wanted > available {
        return Err(CoreError::InsufficientStock {
            product_id,
            available,
            requested: wanted,
        }
        .into());
    }

    Ok(())
}

async fn upsert_in(
    conn: &mut SqliteConnection,
    user_id: UserId,
    product_id: ProductId,
    quantity: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cart_lines (user_id, product_id, quantity, added_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = excluded.quantity
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn quantity_in(
    conn: &mut SqliteConnection,
    user_id: UserId,
    product_id: ProductId,
) -> DbResult<i64> {
    let quantity: Option<i64> = sqlx::query_scalar(
        "SELECT quantity FROM cart_lines WHERE user_id = ?1 AND product_id = ?2",
    )
    .bind(user_id)
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(quantity.unwrap_or(0))
}

/// Cart items on `conn`, ordered by product name.
pub(crate) async fn items_in(conn: &mut SqliteConnection, user_id: UserId) -> DbResult<Vec<CartItem>> {
    let items = sqlx::query_as::<_, CartItem>(
        r#"
        SELECT
            c.product_id,
            p.name,
            p.price AS unit_price,
            p.stock,
            c.quantity
        FROM cart_lines c
        INNER JOIN products p ON p.id = c.product_id
        WHERE c.user_id = ?1
        ORDER BY p.name
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

pub(crate) async fn clear_in(conn: &mut SqliteConnection, user_id: UserId) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = ?1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use crate::testing::{memory_db, product};
    use crate::DbError;
    use shopfront_core::{CoreError, DiscountPercent, ErrorCode, MAX_CART_LINES};

    #[tokio::test]
    async fn test_add_merges_quantities() {
        let db = memory_db().await;
        let p = product(&db, "Tea", 100, 5).await;
        let carts = db.carts();

        assert_eq!(carts.add(1, p.id, 2).await.unwrap(), 2);
        assert_eq!(carts.add(1, p.id, 1).await.unwrap(), 3);

        let lines = carts.lines(1).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[0].unit_price.amount(), 100);

        // Carts never touch stock
        assert_eq!(db.stock().get_available(p.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_add_beyond_stock_is_rejected() {
        let db = memory_db().await;
        let p = product(&db, "Tea", 100, 5).await;
        let carts = db.carts();

        let err = carts.add(1, p.id, 6).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientStock);
        assert!(carts.lines(1).await.unwrap().is_empty());
        assert_eq!(db.stock().get_available(p.id).await.unwrap(), 5);

        carts.add(1, p.id, 4).await.unwrap();
        let err = carts.add(1, p.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            })
        ));
        assert_eq!(carts.quantity_of(1, p.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_quantity_and_unknown_product() {
        let db = memory_db().await;
        let p = product(&db, "Tea", 100, 5000).await;
        let carts = db.carts();

        assert_eq!(carts.add(1, p.id, 0).await.unwrap_err().code(), ErrorCode::InvalidArgument);
        assert_eq!(carts.add(1, p.id, 1000).await.unwrap_err().code(), ErrorCode::InvalidArgument);
        assert!(matches!(carts.add(1, 777, 1).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_cart_line_limit() {
        let db = memory_db().await;
        let carts = db.carts();

        for i in 0..MAX_CART_LINES {
            let p = product(&db, &format!("Item {i:03}"), 1, 1).await;
            carts.add(1, p.id, 1).await.unwrap();
        }

        let extra = product(&db, "One too many", 1, 1).await;
        let err = carts.add(1, extra.id, 1).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        // Another user is unaffected
        carts.add(2, extra.id, 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_quantity() {
        let db = memory_db().await;
        let p = product(&db, "Tea", 100, 5).await;
        let carts = db.carts();

        carts.set_quantity(1, p.id, 4).await.unwrap();
        assert_eq!(carts.quantity_of(1, p.id).await.unwrap(), 4);

        carts.set_quantity(1, p.id, 2).await.unwrap();
        assert_eq!(carts.quantity_of(1, p.id).await.unwrap(), 2);

        assert!(carts.set_quantity(1, p.id, 6).await.is_err());
        assert_eq!(carts.quantity_of(1, p.id).await.unwrap(), 2);

        carts.set_quantity(1, p.id, 0).await.unwrap();
        assert_eq!(carts.quantity_of(1, p.id).await.unwrap(), 0);

        // Deleting an absent line is a no-op
        carts.set_quantity(1, p.id, -3).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_and_clear_are_idempotent() {
        let db = memory_db().await;
        let a = product(&db, "A", 10, 5).await;
        let b = product(&db, "B", 20, 5).await;
        let carts = db.carts();

        assert!(!carts.remove(1, a.id).await.unwrap());
        assert_eq!(db.stock().get_available(a.id).await.unwrap(), 5);

        carts.add(1, a.id, 1).await.unwrap();
        carts.add(1, b.id, 2).await.unwrap();

        assert!(carts.remove(1, a.id).await.unwrap());
        assert!(!carts.remove(1, a.id).await.unwrap());

        assert_eq!(carts.clear(1).await.unwrap(), 1);
        assert_eq!(carts.clear(1).await.unwrap(), 0);
        assert!(carts.lines(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summary_uses_current_prices() {
        let db = memory_db().await;
        let p = product(&db, "Tea", 100, 5).await;
        let carts = db.carts();

        carts.add(1, p.id, 3).await.unwrap();
        db.products().set_price(p.id, 110).await.unwrap();

        let quote = carts.summary(1, DiscountPercent::new(10).unwrap()).await.unwrap();
        assert_eq!(quote.total_price.amount(), 330);
        assert_eq!(quote.final_price.amount(), 297);
        assert_eq!(quote.total_quantity(), 3);
    }
}
