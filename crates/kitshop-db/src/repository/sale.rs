//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. RECORD (one transaction, driven by the sale service)               │
//! │     └── insert_in() → sales row + sale_items rows                      │
//! │         { bonus_status: pending }                                      │
//! │                                                                         │
//! │  2. CREDIT (batch processor, days later)                               │
//! │     └── mark_bonus_credited_in() → { bonus_status: credited }          │
//! │                                                                         │
//! │  Nothing else ever changes a sale; sales are never deleted.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kitshop_core::{BonusStatus, CoreError, Sale, SaleItem, ValidationError};

const SALE_COLUMNS: &str = r#"
    id, customer_phone, phone_digits, customer_full_name, total_amount,
    bonuses_earned, bonus_status, bonus_credited_at, sale_date
"#;

/// One page of sales plus the unpaged row count.
#[derive(Debug, Clone)]
pub struct SalePage {
    pub sales: Vec<Sale>,
    pub total: i64,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID, with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS);

        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match sale {
            Some(mut sale) => {
                sale.items = self.get_items(&sale.id).await?;
                Ok(Some(sale))
            }
            None => Ok(None),
        }
    }

    /// Inserts a sale and all of its items.
    ///
    /// ## Snapshot Pattern
    /// Product name and prices are copied to each item, so the sale history
    /// survives later price changes.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain(CoreError::InvalidSaleTotal))` - `total_amount`
    ///   is not the sum of the item totals; nothing is written
    pub async fn insert_in(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, items = sale.items.len(), "Inserting sale");

        sale.verify_total()?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, customer_phone, phone_digits, customer_full_name,
                total_amount, bonuses_earned, bonus_status, bonus_credited_at,
                sale_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.customer_phone)
        .bind(&sale.phone_digits)
        .bind(&sale.customer_full_name)
        .bind(sale.total_amount)
        .bind(sale.bonuses_earned)
        .bind(sale.bonus_status)
        .bind(sale.bonus_credited_at)
        .bind(sale.sale_date)
        .execute(&mut *conn)
        .await?;

        for item in &sale.items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, line_no, product_id, product_name,
                    price, sale_price, quantity, total_price
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(item.line_no)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(item.price)
            .bind(item.sale_price)
            .bind(item.quantity)
            .bind(item.total_price)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Gets all items for a sale, in line order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT
                id, sale_id, line_no, product_id, product_name,
                price, sale_price, quantity, total_price
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists sales newest first, optionally only those of one customer.
    ///
    /// ## Arguments
    /// * `phone_digits` - digits-only phone filter; `None` lists everyone
    /// * `page` - 1-based page number
    /// * `limit` - page size
    ///
    /// A page whose offset does not fit in `i64` is rejected as out of range.
    pub async fn list(
        &self,
        phone_digits: Option<&str>,
        page: i64,
        limit: i64,
    ) -> DbResult<SalePage> {
        debug!(?phone_digits, page, limit, "Listing sales");

        let offset = page
            .checked_sub(1)
            .and_then(|skipped| skipped.checked_mul(limit))
            .ok_or_else(|| {
                CoreError::from(ValidationError::OutOfRange {
                    field: "page".to_string(),
                    min: 1,
                    max: i64::MAX / limit.max(1),
                })
            })?;

        let (sales, total) = match phone_digits {
            Some(digits) => {
                let sql = format!(
                    "SELECT {} FROM sales WHERE phone_digits = ?1 \
                     ORDER BY sale_date DESC, id LIMIT ?2 OFFSET ?3",
                    SALE_COLUMNS
                );
                let sales = sqlx::query_as::<_, Sale>(&sql)
                    .bind(digits)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;
                let total: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE phone_digits = ?1")
                        .bind(digits)
                        .fetch_one(&self.pool)
                        .await?;
                (sales, total)
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM sales ORDER BY sale_date DESC, id LIMIT ?1 OFFSET ?2",
                    SALE_COLUMNS
                );
                let sales = sqlx::query_as::<_, Sale>(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(&self.pool)
                    .await?;
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
                    .fetch_one(&self.pool)
                    .await?;
                (sales, total)
            }
        };

        let mut with_items = Vec::with_capacity(sales.len());
        for mut sale in sales {
            sale.items = self.get_items(&sale.id).await?;
            with_items.push(sale);
        }

        Ok(SalePage {
            sales: with_items,
            total,
        })
    }

    /// Marks a sale's bonus as credited.
    ///
    /// ## Returns
    /// * `Ok(true)` - sale found and marked
    /// * `Ok(false)` - no such sale
    pub async fn mark_bonus_credited_in(
        conn: &mut SqliteConnection,
        sale_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sales SET
                bonus_status = ?2,
                bonus_credited_at = COALESCE(bonus_credited_at, ?3)
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(BonusStatus::Credited)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use chrono::{Duration, TimeZone};
    use kitshop_core::Product;

    fn sale_for(product: &Product, digits: &str, sale_date: DateTime<Utc>) -> Sale {
        let id = kitshop_core::new_id();
        let item = SaleItem::snapshot(&id, 0, product, 2);
        Sale {
            id,
            customer_phone: "+7 (777) 123-12-12".to_string(),
            phone_digits: digits.to_string(),
            customer_full_name: Some("Айгерим".to_string()),
            total_amount: item.total_price,
            bonuses_earned: 600,
            bonus_status: BonusStatus::Pending,
            bonus_credited_at: None,
            items: vec![item],
            sale_date,
        }
    }

    async fn setup() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let product = db
            .products()
            .insert(&Product {
                id: kitshop_core::new_id(),
                name: "Chemistry Lab Kit".to_string(),
                price: 10_000,
                sale_price: None,
                in_stock: true,
                stock_quantity: 50,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        (db, product)
    }

    async fn insert(db: &Database, sale: &Sale) {
        let mut conn = db.pool().acquire().await.unwrap();
        SaleRepository::insert_in(&mut conn, sale).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get_with_items() {
        let (db, product) = setup().await;
        let sale = sale_for(&product, "77771231212", Utc::now());
        insert(&db, &sale).await;

        let loaded = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(loaded.total_amount, 20_000);
        assert_eq!(loaded.phone_digits, "77771231212");
        assert_eq!(loaded.bonus_status, BonusStatus::Pending);
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].total_price, 20_000);
        assert_eq!(loaded.items[0].product_name, "Chemistry Lab Kit");
    }

    #[tokio::test]
    async fn test_list_filters_by_digits_and_paginates() {
        let (db, product) = setup().await;
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        for i in 0..3 {
            insert(&db, &sale_for(&product, "77771231212", base + Duration::hours(i))).await;
        }
        insert(&db, &sale_for(&product, "77019998877", base)).await;

        let page = db.sales().list(None, 1, 10).await.unwrap();
        assert_eq!(page.total, 4);
        assert_eq!(page.sales.len(), 4);

        let page = db.sales().list(Some("77771231212"), 1, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.sales.len(), 2);
        // Newest first
        assert!(page.sales[0].sale_date > page.sales[1].sale_date);

        let page = db.sales().list(Some("77771231212"), 2, 2).await.unwrap();
        assert_eq!(page.sales.len(), 1);
    }

    #[tokio::test]
    async fn test_list_rejects_overflowing_page() {
        let (db, product) = setup().await;
        insert(&db, &sale_for(&product, "77771231212", Utc::now())).await;

        let err = db.sales().list(None, i64::MAX, 20).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        // Past the last row is just an empty page
        let page = db.sales().list(None, 1_000, 20).await.unwrap();
        assert!(page.sales.is_empty());
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_mismatched_total() {
        let (db, product) = setup().await;
        let mut sale = sale_for(&product, "77771231212", Utc::now());
        sale.total_amount += 1;

        let mut conn = db.pool().acquire().await.unwrap();
        let err = SaleRepository::insert_in(&mut conn, &sale).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidSaleTotal {
                expected: 20_000,
                actual: 20_001
            })
        ));
        drop(conn);

        assert!(db.sales().get_by_id(&sale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_bonus_credited() {
        let (db, product) = setup().await;
        let sale = sale_for(&product, "77771231212", Utc::now());
        insert(&db, &sale).await;

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(SaleRepository::mark_bonus_credited_in(&mut conn, &sale.id, Utc::now())
            .await
            .unwrap());
        assert!(!SaleRepository::mark_bonus_credited_in(&mut conn, "missing", Utc::now())
            .await
            .unwrap());
        drop(conn);

        let loaded = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(loaded.bonus_status, BonusStatus::Credited);
        assert!(loaded.bonus_credited_at.is_some());
    }
}
