//! # Bonus Ledger
//!
//! Percentage discount grants per user, each good for one order.
//!
//! ## Lifecycle
//! ```text
//! grant / welcome bonus ──► active ──► checkout spends it ──► inactive
//!                              │
//!                              └─────► deactivate (admin) ──► inactive
//! ```
//!
//! A user may turn spending off (`set_use_bonus(false)`); checkout then
//! charges full price and leaves the grant active.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use shopfront_core::{Bonus, DiscountPercent, UserId, DEFAULT_WELCOME_BONUS_PERCENT};

const BONUS_COLUMNS: &str = "id, user_id, discount_percent, is_active, created_at";

/// Discount grants for every user.
#[derive(Debug, Clone)]
pub struct BonusLedger {
    pool: SqlitePool,
    welcome_percent: DiscountPercent,
}

impl BonusLedger {
    pub fn new(pool: SqlitePool) -> Self {
        BonusLedger {
            pool,
            welcome_percent: default_welcome_percent(),
        }
    }

    /// Replaces the percentage used by [`BonusLedger::grant_welcome_bonus`].
    pub fn with_welcome_percent(mut self, percent: DiscountPercent) -> Self {
        self.welcome_percent = percent;
        self
    }

    pub fn welcome_percent(&self) -> DiscountPercent {
        self.welcome_percent
    }

    /// Creates a new active grant of `percent`.
    ///
    /// ## Returns
    /// * `Err(DbError::Core(Validation))` - `percent` outside `[0, 100]`
    pub async fn grant(&self, user_id: UserId, percent: i64) -> DbResult<Bonus> {
        let percent = DiscountPercent::new(percent)?;

        let sql = format!(
            "INSERT INTO bonuses (user_id, discount_percent, is_active, created_at) \
             VALUES (?1, ?2, 1, ?3) \
             RETURNING {BONUS_COLUMNS}"
        );

        let bonus = sqlx::query_as::<_, Bonus>(&sql)
            .bind(user_id)
            .bind(percent)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        info!(user_id, bonus_id = bonus.id, percent = %percent, "Bonus granted");
        Ok(bonus)
    }

    /// Returns the most recently granted active bonus, if any.
    pub async fn get_active(&self, user_id: UserId) -> DbResult<Option<Bonus>> {
        let mut conn = self.pool.acquire().await?;
        active_in(&mut conn, user_id).await
    }

    /// Deactivates every active grant of a user. Returns how many changed.
    pub async fn deactivate(&self, user_id: UserId) -> DbResult<u64> {
        let result = sqlx::query("UPDATE bonuses SET is_active = 0 WHERE user_id = ?1 AND is_active = 1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        debug!(user_id, deactivated = result.rows_affected(), "Deactivated bonuses");
        Ok(result.rows_affected())
    }

    /// Grants `percent` unless the user already has an active bonus.
    ///
    /// Returns `true` if a grant was created. The check and the insert are a
    /// single statement, so two concurrent calls create at most one grant.
    pub async fn create_welcome_bonus(&self, user_id: UserId, percent: i64) -> DbResult<bool> {
        let percent = DiscountPercent::new(percent)?;
        self.insert_welcome(user_id, percent).await
    }

    /// [`BonusLedger::create_welcome_bonus`] at the store's configured percentage.
    pub async fn grant_welcome_bonus(&self, user_id: UserId) -> DbResult<bool> {
        self.insert_welcome(user_id, self.welcome_percent).await
    }

    async fn insert_welcome(&self, user_id: UserId, percent: DiscountPercent) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO bonuses (user_id, discount_percent, is_active, created_at)
            SELECT ?1, ?2, 1, ?3
            WHERE NOT EXISTS (
                SELECT 1 FROM bonuses WHERE user_id = ?1 AND is_active = 1
            )
            "#,
        )
        .bind(user_id)
        .bind(percent)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            info!(user_id, percent = %percent, "Welcome bonus granted");
        }
        Ok(created)
    }

    /// All grants of a user, newest first.
    pub async fn list(&self, user_id: UserId) -> DbResult<Vec<Bonus>> {
        let sql = format!("SELECT {BONUS_COLUMNS} FROM bonuses WHERE user_id = ?1 ORDER BY id DESC");

        let bonuses = sqlx::query_as::<_, Bonus>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(bonuses)
    }

    /// Deletes a grant.
    pub async fn remove(&self, bonus_id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM bonuses WHERE id = ?1")
            .bind(bonus_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bonus", bonus_id));
        }

        info!(bonus_id, "Bonus removed");
        Ok(())
    }

    /// Sets whether checkout should spend the user's active bonus.
    pub async fn set_use_bonus(&self, user_id: UserId, enabled: bool) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, use_bonus) VALUES (?1, ?2)
            ON CONFLICT (user_id) DO UPDATE SET use_bonus = excluded.use_bonus
            "#,
        )
        .bind(user_id)
        .bind(enabled)
        .execute(&self.pool)
        .await?;

        debug!(user_id, enabled, "Bonus usage preference updated");
        Ok(())
    }

    /// Whether checkout spends the user's active bonus. Defaults to `true`.
    pub async fn use_bonus(&self, user_id: UserId) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        use_bonus_in(&mut conn, user_id).await
    }
}

/// `DEFAULT_WELCOME_BONUS_PERCENT` as a checked percentage.
pub(crate) fn default_welcome_percent() -> DiscountPercent {
    DiscountPercent::new(DEFAULT_WELCOME_BONUS_PERCENT).unwrap_or(DiscountPercent::ZERO)
}

pub(crate) async fn active_in(conn: &mut SqliteConnection, user_id: UserId) -> DbResult<Option<Bonus>> {
    let sql = format!(
        "SELECT {BONUS_COLUMNS} FROM bonuses \
         WHERE user_id = ?1 AND is_active = 1 \
         ORDER BY id DESC LIMIT 1"
    );

    let bonus = sqlx::query_as::<_, Bonus>(&sql)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(bonus)
}

pub(crate) async fn use_bonus_in(conn: &mut SqliteConnection, user_id: UserId) -> DbResult<bool> {
    let enabled: Option<bool> = sqlx::query_scalar("SELECT use_bonus FROM user_settings WHERE user_id = ?1")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(enabled.unwrap_or(true))
}

/// Marks one grant as used.
pub(crate) async fn spend_in(conn: &mut SqliteConnection, bonus_id: i64) -> DbResult<()> {
    let result = sqlx::query("UPDATE bonuses SET is_active = 0 WHERE id = ?1 AND is_active = 1")
        .bind(bonus_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Bonus", bonus_id));
    }

    Ok(())
}
