//! # Checkout Coordinator
//!
//! Turns a user's cart (and active bonus) into a committed order in one
//! atomic transaction.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN IMMEDIATE  (other writers queue behind us)                       │
//! │       │                                                                 │
//! │  1.   load cart lines + live price/stock      empty → EMPTY_CART        │
//! │  2.   every line qty ≤ stock?                 no    → OUT_OF_STOCK      │
//! │  3-4. price: total, bonus %, final                                      │
//! │       │                                                                 │
//! │  5.   ┌─────────────────────────────────────────────────────────────┐   │
//! │       │ mint order number + INSERT order (pending)                  │   │
//! │       │ INSERT order_lines snapshots                                │   │
//! │       │ conditional stock decrement per line                        │   │
//! │       │ deactivate the bonus that was applied                       │   │
//! │       │ DELETE cart lines                                           │   │
//! │       └─────────────────────────────────────────────────────────────┘   │
//! │       │          any failure → ORDER_CREATION_FAILED                    │
//! │       ▼                                                                 │
//! │  COMMIT           (or ROLLBACK when the transaction is dropped)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A second checkout racing for the same units waits on the lock, then reads
//! the post-commit stock in step 2 and fails cleanly with `OUT_OF_STOCK`.

use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::begin_immediate;
use crate::repository::order_number::OrderNumberGenerator;
use crate::repository::{bonus, cart, order, stock};
use shopfront_core::pricing::check_availability;
use shopfront_core::{Bonus, CoreError, DiscountPercent, Money, Order, Quote, UserId};

/// What a successful checkout hands back to the front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub order_number: String,
    pub order_id: i64,
    pub total_price: Money,
    pub discount_percent: DiscountPercent,
    pub final_price: Money,
    pub line_count: usize,
}

/// Orchestrates cart, bonus, stock and order writes into one commit.
#[derive(Debug, Clone)]
pub struct CheckoutCoordinator {
    pool: SqlitePool,
    generator: OrderNumberGenerator,
}

impl CheckoutCoordinator {
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutCoordinator {
            pool,
            generator: OrderNumberGenerator::default(),
        }
    }

    /// Replaces the order-number generator.
    pub fn with_generator(mut self, generator: OrderNumberGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Commits the user's cart as a pending order.
    ///
    /// ## Returns
    /// * `Ok(CheckoutReceipt)` - Order committed, stock decremented, cart cleared
    /// * `Err(Core(EmptyCart))` - Nothing to check out
    /// * `Err(Core(OutOfStock))` - A line exceeds current stock; nothing changed
    /// * `Err(OrderCreationFailed)` - The commit step failed; nothing changed
    /// * `Err(Busy)` - Could not get the write lock in time; safe to retry
    pub async fn checkout(&self, user_id: UserId) -> DbResult<CheckoutReceipt> {
        debug!(user_id, "Starting checkout");

        let mut tx = begin_immediate(&self.pool).await?;

        let (quote, applied) = price_in(&mut tx, user_id).await?;
        if quote.is_empty() {
            return Err(CoreError::EmptyCart { user_id }.into());
        }

        let order = match self.commit_in(&mut tx, user_id, &quote, applied.as_ref()).await {
            Ok(order) => order,
            Err(err) => {
                warn!(user_id, error = %err, "Checkout rolled back");
                return Err(DbError::order_creation_failed(err));
            }
        };

        tx.commit()
            .await
            .map_err(|e| DbError::order_creation_failed(e.into()))?;

        info!(
            user_id,
            order_number = %order.order_number,
            total = %order.total_price,
            discount = %order.discount_percent,
            final_price = %order.final_price,
            lines = quote.line_count(),
            "Order created"
        );

        Ok(CheckoutReceipt {
            order_number: order.order_number,
            order_id: order.id,
            total_price: order.total_price,
            discount_percent: order.discount_percent,
            final_price: order.final_price,
            line_count: quote.line_count(),
        })
    }

    /// Prices the user's cart the way checkout would right now, without writing.
    ///
    /// Unlike checkout, an empty cart yields an empty quote.
    pub async fn quote(&self, user_id: UserId) -> DbResult<Quote> {
        let mut conn = self.pool.acquire().await?;
        let (quote, _) = price_in(&mut conn, user_id).await?;
        Ok(quote)
    }

    /// Step 5: every write of the checkout, on the open transaction.
    async fn commit_in(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
        quote: &Quote,
        applied: Option<&Bonus>,
    ) -> DbResult<Order> {
        let order = self.generator.insert_order_in(conn, user_id, quote).await?;

        order::insert_lines_in(conn, order.id, &quote.lines).await?;

        for line in &quote.lines {
            stock::adjust_in(conn, line.product_id, -line.quantity).await?;
        }

        if let Some(grant) = applied {
            bonus::spend_in(conn, grant.id).await?;
        }

        cart::clear_in(conn, user_id).await?;

        Ok(order)
    }
}

/// Steps 1-4: read the cart, re-validate stock, apply the bonus.
///
/// Returns the bonus only if it was applied.
async fn price_in(conn: &mut SqliteConnection, user_id: UserId) -> DbResult<(Quote, Option<Bonus>)> {
    let items = cart::items_in(conn, user_id).await?;
    check_availability(&items)?;

    let applied = if bonus::use_bonus_in(conn, user_id).await? {
        bonus::active_in(conn, user_id).await?
    } else {
        None
    };

    let discount = applied
        .as_ref()
        .map(|b| b.discount_percent)
        .unwrap_or(DiscountPercent::ZERO);

    Ok((Quote::compute(&items, discount)?, applied))
}
