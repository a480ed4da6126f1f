//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  Front-end startup                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← Configure pool settings                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                            │
//! │  │            SqlitePool                   │                            │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐        │                            │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...    │  (max_connections)         │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘        │                            │
//! │  └─────────────────────────────────────────┘                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Reads run in parallel (WAL).                                           │
//! │  Writers take BEGIN IMMEDIATE and queue on the busy timeout.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled so that:
//! - Readers don't block writers
//! - Writers don't block readers
//! - Only one writer holds the lock at a time; the rest wait up to `busy_timeout`

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use shopfront_core::DiscountPercent;

use crate::config::StoreConfig;
use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::bonus::{default_welcome_percent, BonusLedger};
use crate::repository::cart::CartStore;
use crate::repository::checkout::CheckoutCoordinator;
use crate::repository::order::OrderRepository;
use crate::repository::order_number::OrderNumberGenerator;
use crate::repository::product::ProductRepository;
use crate::repository::stock::StockLedger;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/shop.db")
///     .max_connections(5)
///     .busy_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long to wait for a free pooled connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps connections open.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// How long a writer waits for the database lock before failing with `Busy`.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the busy timeout.
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None, // Closing the only connection drops the database
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Whether this configuration points at a private in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                // WAL mode: Better concurrent read performance
                .journal_mode(SqliteJournalMode::Wal)
                // NORMAL synchronous: durable across crashes in WAL mode
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true)
        };

        Ok(options
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone: every clone shares the same pool.
///
/// ## Usage from a front-end handler
/// ```rust,ignore
/// async fn on_checkout(db: &Database, user_id: i64) -> Result<String, DbError> {
///     let receipt = db.checkout().checkout(user_id).await?;
///     Ok(receipt.order_number)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,

    /// Generator handed to every checkout coordinator.
    generator: OrderNumberGenerator,

    /// Percentage for [`BonusLedger::grant_welcome_bonus`].
    welcome_percent: DiscountPercent,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads
    ///    - Foreign keys enabled
    ///    - Busy timeout so queued writers wait instead of failing
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_options = config.connect_options()?;

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout);

        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None::<Duration>);
        }

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database {
            pool,
            generator: OrderNumberGenerator::default(),
            welcome_percent: default_welcome_percent(),
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Opens the store described by `config`.
    ///
    /// Checkouts mint numbers with the configured attempt bound and welcome
    /// bonuses use the configured percentage.
    pub async fn from_store_config(config: &StoreConfig) -> DbResult<Self> {
        let mut db = Database::new(config.db_config()).await?;
        db.generator = config.order_number_generator();
        db.welcome_percent = config.welcome_bonus_percent;
        Ok(db)
    }

    /// Runs database migrations.
    ///
    /// Idempotent: already-applied migrations are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the product catalogue.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Returns the stock ledger.
    pub fn stock(&self) -> StockLedger {
        StockLedger::new(self.pool.clone())
    }

    /// Returns the cart store.
    pub fn carts(&self) -> CartStore {
        CartStore::new(self.pool.clone())
    }

    /// Returns the bonus ledger.
    pub fn bonuses(&self) -> BonusLedger {
        BonusLedger::new(self.pool.clone()).with_welcome_percent(self.welcome_percent)
    }

    /// Returns the order repository.
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Returns the checkout coordinator with the store's order-number generator.
    pub fn checkout(&self) -> CheckoutCoordinator {
        CheckoutCoordinator::new(self.pool.clone()).with_generator(self.generator.clone())
    }

    /// Returns a checkout coordinator minting numbers with `generator`.
    pub fn checkout_with(&self, generator: OrderNumberGenerator) -> CheckoutCoordinator {
        CheckoutCoordinator::new(self.pool.clone()).with_generator(generator)
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

/// Opens a write transaction that takes the database lock up front.
///
/// Two `BEGIN IMMEDIATE` writers never interleave: the second waits on the
/// busy timeout until the first commits or rolls back. Dropping the returned
/// transaction without committing rolls it back.
pub(crate) async fn begin_immediate(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    pool.begin_with("BEGIN IMMEDIATE").await.map_err(DbError::from)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_millis(250));

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_store_config_reaches_checkout_and_bonuses() {
        let store = StoreConfig::from_lookup(|key| match key {
            "SHOPFRONT_DB_PATH" => Some(":memory:".to_string()),
            "SHOPFRONT_ORDER_NUMBER_ATTEMPTS" => Some("7".to_string()),
            "SHOPFRONT_WELCOME_BONUS_PERCENT" => Some("25".to_string()),
            _ => None,
        })
        .unwrap();
        let db = Database::from_store_config(&store).await.unwrap();

        assert!(store.db_config().is_in_memory());
        assert_eq!(db.generator.max_attempts(), 7);
        assert_eq!(db.bonuses().welcome_percent().value(), 25);

        assert!(db.bonuses().grant_welcome_bonus(1).await.unwrap());
        let active = db.bonuses().get_active(1).await.unwrap().unwrap();
        assert_eq!(active.discount_percent.value(), 25);

        let plain = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(plain.generator.max_attempts(), 100);
        assert_eq!(plain.bonuses().welcome_percent().value(), 10);
    }

    #[tokio::test]
    async fn test_immediate_transaction_rolls_back_on_drop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        {
            let mut tx = begin_immediate(db.pool()).await.unwrap();
            sqlx::query("INSERT INTO user_settings (user_id, use_bonus) VALUES (1, 0)")
                .execute(&mut *tx)
                .await
                .unwrap();
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_settings")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
