//! # Order Number Generator
//!
//! Mints externally visible order numbers that are unique for the lifetime
//! of the store.
//!
//! ## Format
//! ```text
//! ORD-260418153012345-3FA9C1
//!     └──────┬──────┘ └──┬─┘
//!   yyMMddHHmmssSSS    6 hex digits from a random v4 UUID
//! ```
//!
//! ## Minting Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for attempt in 1..=max_attempts                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  candidate = timestamp + random suffix                                  │
//! │       │                                                                 │
//! │       ├── already in orders?            → warn, next attempt            │
//! │       ▼                                                                 │
//! │  INSERT INTO orders (order_number, ...)                                 │
//! │       │                                                                 │
//! │       ├── UNIQUE(orders.order_number)   → warn, next attempt            │
//! │       └── ok                            → done                          │
//! │                                                                         │
//! │  attempts used up                       → GENERATION_EXHAUSTED          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Never derive numbers from a row count: two concurrent checkouts would
//! read the same count and mint the same number.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::order::{exists_in, insert_in};
use shopfront_core::{Order, Quote, UserId, DEFAULT_ORDER_NUMBER_ATTEMPTS};

const ORDER_NUMBER_UNIQUE: &str = "orders.order_number";

type CandidateSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Collision-checked order-number minting.
#[derive(Clone)]
pub struct OrderNumberGenerator {
    max_attempts: u32,
    source: CandidateSource,
}

impl OrderNumberGenerator {
    /// Generator with random timestamped candidates and `max_attempts` tries.
    pub fn new(max_attempts: u32) -> Self {
        Self::with_source(max_attempts, random_candidate)
    }

    /// Generator drawing candidates from `source`.
    ///
    /// ## Example
    /// ```rust,ignore
    /// // Always collides once "ORD-1" exists
    /// let generator = OrderNumberGenerator::with_source(3, || "ORD-1".to_string());
    /// ```
    pub fn with_source<F>(max_attempts: u32, source: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        OrderNumberGenerator {
            max_attempts: max_attempts.max(1),
            source: Arc::new(source),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draws one candidate without checking it against the store.
    pub fn candidate(&self) -> String {
        (self.source)()
    }

    /// Returns a candidate that no existing order uses.
    ///
    /// Only a pre-check: a concurrent checkout may still take the number
    /// before it is inserted. Checkout relies on the UNIQUE constraint too.
    pub async fn mint(&self, pool: &SqlitePool) -> DbResult<String> {
        let mut conn = pool.acquire().await?;

        for attempt in 1..=self.max_attempts {
            let candidate = self.candidate();
            if !exists_in(&mut conn, &candidate).await? {
                return Ok(candidate);
            }
            warn!(attempt, candidate = %candidate, "Order number collision");
        }

        Err(DbError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Mints a number and inserts the pending order row for `quote` on `conn`.
    pub(crate) async fn insert_order_in(
        &self,
        conn: &mut SqliteConnection,
        user_id: UserId,
        quote: &Quote,
    ) -> DbResult<Order> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.candidate();

            if exists_in(conn, &candidate).await? {
                warn!(attempt, candidate = %candidate, "Order number collision");
                continue;
            }

            match insert_in(conn, &candidate, user_id, quote).await {
                Ok(order) => {
                    debug!(attempt, order_number = %order.order_number, "Order number minted");
                    return Ok(order);
                }
                Err(err) if err.is_unique_violation_on(ORDER_NUMBER_UNIQUE) => {
                    warn!(attempt, candidate = %candidate, "Order number taken on insert");
                }
                Err(err) => return Err(err),
            }
        }

        Err(DbError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        OrderNumberGenerator::new(DEFAULT_ORDER_NUMBER_ATTEMPTS)
    }
}

impl fmt::Debug for OrderNumberGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderNumberGenerator")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// `ORD-<yyMMddHHmmssSSS>-<6 uppercase hex>`.
pub fn random_candidate() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "ORD-{}-{}",
        Utc::now().format("%y%m%d%H%M%S%3f"),
        suffix[..6].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{memory_db, place_order, product};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_candidate_format() {
        let candidate = random_candidate();
        let parts: Vec<&str> = candidate.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert_eq!(parts[1].len(), 15);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_candidates_are_distinct() {
        let generator = OrderNumberGenerator::default();
        let seen: HashSet<String> = (0..100).map(|_| generator.candidate()).collect();
        assert_eq!(seen.len(), 100);
        assert_eq!(generator.max_attempts(), 100);
    }

    #[tokio::test]
    async fn test_mint_skips_taken_numbers() {
        let db = memory_db().await;
        let tea = product(&db, "Tea", 100, 10).await;
        let taken = place_order(&db, 1, &[(tea.id, 1)]).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let first = taken.clone();
        let generator = OrderNumberGenerator::with_source(5, move || {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => first.clone(),
                _ => "ORD-FRESH".to_string(),
            }
        });

        assert_eq!(generator.mint(db.pool()).await.unwrap(), "ORD-FRESH");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_mint_exhausts() {
        let db = memory_db().await;
        let tea = product(&db, "Tea", 100, 10).await;
        let taken = place_order(&db, 1, &[(tea.id, 1)]).await;

        let generator = OrderNumberGenerator::with_source(3, move || taken.clone());
        let err = generator.mint(db.pool()).await.unwrap_err();

        assert!(matches!(err, DbError::GenerationExhausted { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_recognised_as_collision() {
        let db = memory_db().await;
        let tea = product(&db, "Tea", 100, 10).await;
        db.carts().add(1, tea.id, 1).await.unwrap();
        let quote = db.carts().summary(1, shopfront_core::DiscountPercent::ZERO).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        insert_in(&mut conn, "ORD-SAME", 1, &quote).await.unwrap();
        let err = insert_in(&mut conn, "ORD-SAME", 1, &quote).await.unwrap_err();

        assert!(err.is_unique_violation_on(ORDER_NUMBER_UNIQUE));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(OrderNumberGenerator::new(0).max_attempts(), 1);
    }
}
