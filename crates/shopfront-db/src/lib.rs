//! # shopfront-db: Storage and Checkout for the Storefront Ledger
//!
//! This crate keeps product stock, carts, discount grants and committed orders
//! consistent under concurrent use. It uses SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopfront Data Flow                              │
//! │                                                                         │
//! │  Chat front-end ("Add to cart", "Checkout", admin "Confirm payment")    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  shopfront-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────────┐  ┌────────────┐  │   │
//! │  │   │   Database    │    │   Repositories     │  │ Migrations │  │   │
//! │  │   │   (pool.rs)   │    │                    │  │ (embedded) │  │   │
//! │  │   │               │    │ StockLedger        │  │            │  │   │
//! │  │   │ SqlitePool    │◄───│ CartStore          │  │ 001_init   │  │   │
//! │  │   │ WAL, busy     │    │ BonusLedger        │  │            │  │   │
//! │  │   │ timeout       │    │ OrderRepository    │  │            │  │   │
//! │  │   │               │    │ CheckoutCoordinator│  │            │  │   │
//! │  │   └───────────────┘    └────────────────────┘  └────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Ledgers, orders and the checkout coordinator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopfront_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("shop.db")).await?;
//!
//! db.carts().add(user_id, product_id, 2).await?;
//! let receipt = db.checkout().checkout(user_id).await?;
//! println!("Order {} for {}", receipt.order_number, receipt.final_price);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, StoreConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bonus::BonusLedger;
pub use repository::cart::CartStore;
pub use repository::checkout::{CheckoutCoordinator, CheckoutReceipt};
pub use repository::order::OrderRepository;
pub use repository::order_number::OrderNumberGenerator;
pub use repository::product::ProductRepository;
pub use repository::stock::StockLedger;

// =============================================================================
// Test Helpers
// =============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use std::path::PathBuf;

    use shopfront_core::{NewProduct, Product, ProductId, UserId};
    use uuid::Uuid;

    use crate::{Database, DbConfig};

    /// Fresh, private in-memory database with migrations applied.
    pub async fn memory_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Removes an on-disk test database (and its WAL files) when dropped.
    pub struct TempDb {
        path: PathBuf,
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            for suffix in ["", "-wal", "-shm"] {
                let mut file = self.path.clone().into_os_string();
                file.push(suffix);
                let _ = std::fs::remove_file(file);
            }
        }
    }

    /// On-disk WAL database with `connections` pooled connections, for
    /// tests where several writers really race.
    pub async fn file_db(connections: u32) -> (Database, TempDb) {
        let path = std::env::temp_dir().join(format!("shopfront-test-{}.db", Uuid::new_v4()));
        let config = DbConfig::new(path.clone()).max_connections(connections);
        let db = Database::new(config).await.unwrap();
        (db, TempDb { path })
    }

    pub async fn product(db: &Database, name: &str, price: i64, stock: i64) -> Product {
        db.products()
            .create(&NewProduct::new(name, price, stock))
            .await
            .unwrap()
    }

    /// Fills a user's cart with `lines` and checks out; returns the order number.
    pub async fn place_order(db: &Database, user_id: UserId, lines: &[(ProductId, i64)]) -> String {
        for &(product_id, quantity) in lines {
            db.carts().add(user_id, product_id, quantity).await.unwrap();
        }
        db.checkout().checkout(user_id).await.unwrap().order_number
    }
}
