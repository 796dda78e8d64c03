//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - Substring search over name and code, with limit/offset paging
//! - CRUD with field validation at the boundary
//! - Guarded stock adjustment (never below zero)
//! - Protected delete: a product referenced by sale lines stays put

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use ventas_core::validation::{
    validate_price_cents, validate_product_code, validate_product_name, validate_stock,
};
use ventas_core::{NewProduct, Product};

const PRODUCT_COLUMNS: &str = "id, code, name, price_cents, stock, created_at, updated_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// let page = repo.search("café", 10, 0).await?;
/// let product = repo.get_by_code("CAFE-250").await?;
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

    /// Searches products by name or code substring, case-insensitive.
    ///
    /// An empty query lists the whole catalog. Results are ordered by
    /// code and paged with `limit`/`offset`; pair with [`count`] for a
    /// pager.
    ///
    /// [`count`]: ProductRepository::count
    pub async fn search(&self, query: &str, limit: u32, offset: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit, offset, "Searching products");

        let products = if query.is_empty() {
            sqlx::query_as::<_, Product>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY code LIMIT ?1 OFFSET ?2"
            ))
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?
        } else {
            let pattern = format!("%{query}%");
            sqlx::query_as::<_, Product>(&format!(
                "SELECT {PRODUCT_COLUMNS} FROM products
                 WHERE name LIKE ?1 OR code LIKE ?1
                 ORDER BY code LIMIT ?2 OFFSET ?3"
            ))
            .bind(pattern)
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await?
        };

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Counts products matching a search query (empty = whole catalog).
    pub async fn count(&self, query: &str) -> DbResult<i64> {
        let query = query.trim();

        let count: i64 = if query.is_empty() {
            sqlx::query_scalar("SELECT COUNT(*) FROM products")
                .fetch_one(&self.pool)
                .await?
        } else {
            let pattern = format!("%{query}%");
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE name LIKE ?1 OR code LIKE ?1")
                .bind(pattern)
                .fetch_one(&self.pool)
                .await?
        };

        Ok(count)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// Validates every field first, then inserts with a generated ID and
    /// timestamps.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::Invalid)` - A field failed validation
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_product_code(&new.code)?;
        validate_product_name(&new.name)?;
        validate_price_cents(new.price_cents)?;
        validate_stock(new.stock)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: new.code.trim().to_string(),
            name: new.name.trim().to_string(),
            price_cents: new.price_cents,
            stock: new.stock,
            created_at: now,
            updated_at: now,
        };

        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            "INSERT INTO products (id, code, name, price_cents, stock, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Updates an existing product's code, name, price, and stock.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_product_code(&product.code)?;
        validate_product_name(&product.name)?;
        validate_price_cents(product.price_cents)?;
        validate_stock(product.stock)?;

        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET code = ?2, name = ?3, price_cents = ?4, stock = ?5, updated_at = ?6
             WHERE id = ?1",
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Adjusts product stock by a delta (positive = restock, negative =
    /// correction).
    ///
    /// The update re-checks the level in the same statement so stock can
    /// never land below zero, no matter what the caller last read.
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET stock = stock + ?2, updated_at = ?3
             WHERE id = ?1 AND stock + ?2 >= 0",
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing product from an underflow
            return match self.get_by_id(id).await? {
                None => Err(DbError::not_found("Product", id)),
                Some(product) => Err(DbError::CheckViolation {
                    message: format!(
                        "stock for {} cannot go below zero (current {}, delta {})",
                        product.code, product.stock, delta
                    ),
                }),
            };
        }

        Ok(())
    }

    /// Deletes a product, unless any sale line references it.
    ///
    /// The schema enforces this with ON DELETE RESTRICT; the explicit
    /// check turns the constraint trip into a precise error naming the
    /// reference count.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let references: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sale_lines WHERE product_id = ?1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if references > 0 {
            return Err(DbError::ForeignKeyViolation {
                message: format!("product {id} is referenced by {references} sale line(s)"),
            });
        }

        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_product(code: &str, name: &str, price_cents: i64, stock: i64) -> NewProduct {
        NewProduct {
            code: code.to_string(),
            name: name.to_string(),
            price_cents,
            stock,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.products();

        let product = repo
            .insert(&new_product("CAFE-250", "Café molido 250g", 459_000, 12))
            .await
            .unwrap();

        let by_id = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(by_id.code, "CAFE-250");
        assert_eq!(by_id.price_cents, 459_000);
        assert_eq!(by_id.stock, 12);

        let by_code = repo.get_by_code("CAFE-250").await.unwrap().unwrap();
        assert_eq!(by_code.id, product.id);

        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_fields() {
        let db = test_db().await;
        let repo = db.products();

        let err = repo
            .insert(&new_product("", "Café", 100, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));

        let err = repo
            .insert(&new_product("CAFE", "Café", -1, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));

        let err = repo
            .insert(&new_product("CAFE", "Café", 100, -1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        let repo = db.products();

        repo.insert(&new_product("CAFE-250", "Café", 100, 1))
            .await
            .unwrap();
        let err = repo
            .insert(&new_product("CAFE-250", "Otro café", 200, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_search_and_paging() {
        let db = test_db().await;
        let repo = db.products();

        for i in 0..15 {
            repo.insert(&new_product(
                &format!("TE-{i:03}"),
                &format!("Té verde {i}"),
                150_000,
                10,
            ))
            .await
            .unwrap();
        }
        repo.insert(&new_product("CAFE-250", "Café molido", 459_000, 5))
            .await
            .unwrap();

        // Substring match on name or code
        let hits = repo.search("té", 50, 0).await.unwrap();
        assert_eq!(hits.len(), 15);
        let hits = repo.search("CAFE", 50, 0).await.unwrap();
        assert_eq!(hits.len(), 1);

        // Paging: 16 total, pages of 10 ordered by code
        assert_eq!(repo.count("").await.unwrap(), 16);
        let first = repo.search("", 10, 0).await.unwrap();
        let second = repo.search("", 10, 10).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 6);
        assert_eq!(first[0].code, "CAFE-250");

        assert_eq!(repo.count("té").await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_update() {
        let db = test_db().await;
        let repo = db.products();

        let mut product = repo
            .insert(&new_product("CAFE-250", "Café", 100, 1))
            .await
            .unwrap();

        product.name = "Café de grano".to_string();
        product.price_cents = 550_000;
        repo.update(&product).await.unwrap();

        let reloaded = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "Café de grano");
        assert_eq!(reloaded.price_cents, 550_000);

        product.id = "missing".to_string();
        let err = repo.update(&product).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_adjust_stock_guards_against_underflow() {
        let db = test_db().await;
        let repo = db.products();

        let product = repo
            .insert(&new_product("CAFE-250", "Café", 100, 5))
            .await
            .unwrap();

        repo.adjust_stock(&product.id, 3).await.unwrap();
        repo.adjust_stock(&product.id, -8).await.unwrap();
        let reloaded = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(reloaded.stock, 0);

        let err = repo.adjust_stock(&product.id, -1).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        let err = repo.adjust_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_unreferenced_product() {
        let db = test_db().await;
        let repo = db.products();

        let product = repo
            .insert(&new_product("CAFE-250", "Café", 100, 5))
            .await
            .unwrap();

        repo.delete(&product.id).await.unwrap();
        assert!(repo.get_by_id(&product.id).await.unwrap().is_none());

        let err = repo.delete(&product.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
