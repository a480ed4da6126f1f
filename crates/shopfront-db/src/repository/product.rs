//! # Product Repository
//!
//! The product catalogue: create, look up, reprice and delete products.
//!
//! Stock levels are not changed here; see [`StockLedger`](super::stock::StockLedger).
//!
//! ## Deletion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DELETE FROM products WHERE id = 7                                      │
//! │       │                                                                 │
//! │       ├── cart_lines (product_id = 7)   → deleted  (ON DELETE CASCADE)  │
//! │       │                                                                 │
//! │       └── order_lines (product_id = 7)  → kept, product_id = NULL       │
//! │                                           name/price snapshot intact    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use shopfront_core::validation::{validate_price, validate_product_name, validate_stock};
use shopfront_core::{Money, NewProduct, Product, ProductId};

const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, created_at, updated_at";

/// Repository for product catalogue operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let tea = repo.create(&NewProduct::new("Green tea", 100, 5)).await?;
/// repo.set_price(tea.id, 120).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with its generated id
    /// * `Err(DbError::Core(Validation))` - Blank/long name, negative price or stock
    /// * `Err(DbError::UniqueViolation)` - Name already exists
    pub async fn create(&self, product: &NewProduct) -> DbResult<Product> {
        let name = product.name.trim();
        validate_product_name(name)?;
        validate_price(product.price.amount())?;
        validate_stock(product.stock)?;

        debug!(name = %name, "Inserting product");

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO products (name, description, price, stock, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) \
             RETURNING {PRODUCT_COLUMNS}"
        );

        let created = sqlx::query_as::<_, Product>(&sql)
            .bind(name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.stock)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, name),
                other => other,
            })?;

        info!(id = created.id, name = %created.name, stock = created.stock, "Product created");
        Ok(created)
    }

    /// Gets a product by its ID.
    pub async fn get(&self, id: ProductId) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its exact name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE name = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists the whole catalogue, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name");

        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Changes a product's unit price.
    ///
    /// Orders already placed keep the price they were committed with.
    pub async fn set_price(&self, id: ProductId, price: i64) -> DbResult<Product> {
        validate_price(price)?;

        debug!(id, price, "Updating price");

        let sql = format!(
            "UPDATE products SET price = ?2, updated_at = ?3 WHERE id = ?1 \
             RETURNING {PRODUCT_COLUMNS}"
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(Money::new(price))
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        info!(id, price, "Product repriced");
        Ok(product)
    }

    /// Deletes a product.
    ///
    /// Removes it from every cart; order history keeps its snapshots.
    pub async fn delete(&self, id: ProductId) -> DbResult<()> {
        debug!(id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id, "Product deleted");
        Ok(())
    }

    /// Counts products in the catalogue.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::memory_db;
    use crate::DbError;
    use shopfront_core::{CoreError, ErrorCode, NewProduct};

    #[tokio::test]
    async fn test_create_and_get() {
        let db = memory_db().await;
        let repo = db.products();

        let tea = repo
            .create(&NewProduct::new("  Green tea ", 100, 5).with_description("Loose leaf"))
            .await
            .unwrap();

        assert_eq!(tea.name, "Green tea");
        assert_eq!(tea.price.amount(), 100);
        assert_eq!(tea.stock, 5);

        let fetched = repo.get(tea.id).await.unwrap().unwrap();
        assert_eq!(fetched, tea);
        assert_eq!(repo.get_by_name("Green tea").await.unwrap().unwrap().id, tea.id);
        assert!(repo.get(tea.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_is_constraint_violation() {
        let db = memory_db().await;
        let repo = db.products();

        repo.create(&NewProduct::new("Coffee", 150, 1)).await.unwrap();
        let err = repo.create(&NewProduct::new("Coffee", 90, 3)).await.unwrap_err();

        assert!(matches!(&err, DbError::UniqueViolation { value, .. } if value == "Coffee"));
        assert_eq!(err.code(), ErrorCode::ConstraintViolation);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let db = memory_db().await;
        let repo = db.products();

        for bad in [
            NewProduct::new("", 10, 1),
            NewProduct::new("Cake", -1, 1),
            NewProduct::new("Cake", 10, -1),
        ] {
            let err = repo.create(&bad).await.unwrap_err();
            assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
        }
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_price_and_list() {
        let db = memory_db().await;
        let repo = db.products();

        let b = repo.create(&NewProduct::new("Bagel", 40, 10)).await.unwrap();
        repo.create(&NewProduct::new("Apple pie", 300, 2)).await.unwrap();

        let repriced = repo.set_price(b.id, 45).await.unwrap();
        assert_eq!(repriced.price.amount(), 45);

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Apple pie", "Bagel"]);

        assert!(matches!(repo.set_price(999, 1).await, Err(DbError::NotFound { .. })));
        assert!(repo.set_price(b.id, -5).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_from_carts() {
        let db = memory_db().await;
        let repo = db.products();

        let p = repo.create(&NewProduct::new("Muffin", 60, 4)).await.unwrap();
        db.carts().add(1, p.id, 2).await.unwrap();

        repo.delete(p.id).await.unwrap();

        assert!(repo.get(p.id).await.unwrap().is_none());
        assert!(db.carts().lines(1).await.unwrap().is_empty());
        assert!(matches!(repo.delete(p.id).await, Err(DbError::NotFound { .. })));
    }
}
