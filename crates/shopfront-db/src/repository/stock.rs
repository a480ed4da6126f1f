//! # Stock Ledger
//!
//! The authoritative available quantity per product.
//!
//! ## Conditional Delta Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ WRONG: read, check, then write                                  │
//! │     SELECT stock ...        (both callers read 1)                   │
//! │     UPDATE ... SET stock = 0                                        │
//! │                                                                     │
//! │  ✅ CORRECT: one conditional statement                              │
//! │     UPDATE products SET stock = stock + :delta                      │
//! │     WHERE id = :id AND stock + :delta >= 0                          │
//! │       AND :delta <= i64::MAX - stock                                │
//! │                                                                     │
//! │  0 rows affected → product missing, stock too low, or the new       │
//! │  level would not fit in an i64.                                     │
//! │  The second caller on the last unit always sees 0 rows.             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::begin_immediate;
use shopfront_core::validation::validate_stock;
use shopfront_core::{CoreError, ProductId, ValidationError};

/// Stock levels per product.
#[derive(Debug, Clone)]
pub struct StockLedger {
    pool: SqlitePool,
}

impl StockLedger {
    pub fn new(pool: SqlitePool) -> Self {
        StockLedger { pool }
    }

    /// Returns the available quantity of a product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn get_available(&self, product_id: ProductId) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        current_stock(&mut conn, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))
    }

    /// Applies a signed change to a product's stock and returns the new level.
    ///
    /// A negative `delta` larger than the available stock fails with
    /// `InsufficientStock` and changes nothing. A positive `delta` that would
    /// push stock past `i64::MAX` fails with `Validation(Overflow)`.
    pub async fn adjust(&self, product_id: ProductId, delta: i64) -> DbResult<i64> {
        let mut tx = begin_immediate(&self.pool).await?;
        let stock = adjust_in(&mut tx, product_id, delta).await?;
        tx.commit().await?;

        info!(product_id, delta, stock, "Stock adjusted");
        Ok(stock)
    }

    /// Adds `quantity` units to a product's stock.
    pub async fn restock(&self, product_id: ProductId, quantity: i64) -> DbResult<i64> {
        if quantity < 1 {
            return Err(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: 1,
                max: i64::MAX,
                value: quantity,
            }
            .into());
        }

        self.adjust(product_id, quantity).await
    }

    /// Overwrites a product's stock with an absolute count (admin edit).
    pub async fn set(&self, product_id: ProductId, stock: i64) -> DbResult<i64> {
        validate_stock(stock)?;

        let result = sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(product_id)
            .bind(stock)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        info!(product_id, stock, "Stock set");
        Ok(stock)
    }
}

/// Reads a product's stock on `conn`, `None` if the product doesn't exist.
pub(crate) async fn current_stock(
    conn: &mut SqliteConnection,
    product_id: ProductId,
) -> DbResult<Option<i64>> {
    let stock = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(stock)
}

/// Conditional stock change on `conn`; usable inside a caller's transaction.
pub(crate) async fn adjust_in(
    conn: &mut SqliteConnection,
    product_id: ProductId,
    delta: i64,
) -> DbResult<i64> {
    debug!(product_id, delta, "Adjusting stock");

    let updated: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE products
        SET stock = stock + ?2, updated_at = ?3
        WHERE id = ?1 AND stock + ?2 >= 0 AND ?2 <= ?4 - stock
        RETURNING stock
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(Utc::now())
    .bind(i64::MAX)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(stock) = updated {
        return Ok(stock);
    }

    match current_stock(conn, product_id).await? {
        None => Err(DbError::not_found("Product", product_id)),
        Some(_) if delta > 0 => Err(ValidationError::Overflow {
            field: "stock".to_string(),
        }
        .into()),
        Some(available) => Err(CoreError::InsufficientStock {
            product_id,
            available,
            requested: delta.saturating_neg(),
        }
        .into()),
    }
}
