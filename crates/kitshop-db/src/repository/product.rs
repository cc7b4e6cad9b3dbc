//! # Product Repository
//!
//! Products as the sale recorder sees them: looked up by id, decremented
//! inside the sale transaction. Catalog management is not part of this
//! crate; products are inserted by the seed binary and by tests.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use kitshop_core::Product;

const PRODUCT_COLUMNS: &str = r#"
    id, name, price, sale_price, in_stock, stock_quantity, created_at, updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().get_by_id("uuid-here").await?;
///
/// // Inside a sale transaction
/// let mut tx = db.pool().begin().await?;
/// let sold = ProductRepository::decrement_stock_in(&mut tx, &product.id, 2, now).await?;
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

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_id_in(&mut conn, id).await
    }

    /// Gets a product by ID on a caller-supplied connection or transaction.
    pub async fn fetch_by_id_in(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - ID already exists
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, price, sale_price, in_stock, stock_quantity,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.sale_price)
        .bind(product.in_stock)
        .bind(product.stock_quantity)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product.clone())
    }

    /// Takes `quantity` units out of stock.
    ///
    /// ## Conditional Decrement
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  UPDATE ... SET stock_quantity = stock_quantity - 2                │
    /// │  WHERE id = ? AND in_stock = 1 AND stock_quantity >= 2             │
    /// │                                                                     │
    /// │  stock 5 → 3   in_stock stays 1       returns true                 │
    /// │  stock 2 → 0   in_stock flips to 0    returns true                 │
    /// │  stock 1       row untouched          returns false                │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    /// The check and the write are one statement, so two sales racing for the
    /// last units cannot both succeed.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock decremented
    /// * `Ok(false)` - not enough stock (or the product is flagged out of stock)
    /// * `Err(DbError::NotFound)` - product doesn't exist
    pub async fn decrement_stock_in(
        conn: &mut SqliteConnection,
        id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(id = %id, quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                stock_quantity = stock_quantity - ?2,
                in_stock = CASE WHEN stock_quantity - ?2 <= 0 THEN 0 ELSE in_stock END,
                updated_at = ?3
            WHERE id = ?1 AND in_stock = 1 AND stock_quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        match exists {
            Some(_) => Ok(false),
            None => Err(DbError::not_found("Product", id)),
        }
    }

    /// Counts products (for diagnostics and the seed binary).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
