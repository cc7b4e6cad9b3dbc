//! # Pending Bonus Repository
//!
//! Storage for deferred accruals. Rows are written by the sale transaction,
//! read by lookups and stats, and flipped to processed by the batch
//! processor. They are never deleted.
//!
//! ## Claim
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Batch run A                        Batch run B                        │
//! │  ───────────                        ───────────                        │
//! │  UPDATE ... SET is_processed = 1                                       │
//! │  WHERE id = X AND is_processed = 0                                     │
//! │  → 1 row: A credits the ledger                                         │
//! │                                     UPDATE ... WHERE id = X            │
//! │                                       AND is_processed = 0             │
//! │                                     → 0 rows: B skips X                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The claim runs in the same transaction as the ledger credit, so a failed
//! credit releases the claim.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use kitshop_core::phone::extract_digits;
use kitshop_core::{PendingBonus, PendingBonusView, PendingStats};

const PENDING_COLUMNS: &str = r#"
    id, phone_number, phone_digits, full_name, sale_id, bonus_amount,
    available_date, is_processed, processed_at, created_at
"#;

/// Repository for pending bonus operations.
#[derive(Debug, Clone)]
pub struct PendingBonusRepository {
    pool: SqlitePool,
}

impl PendingBonusRepository {
    /// Creates a new PendingBonusRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PendingBonusRepository { pool }
    }

    /// Inserts the pending bonus of a sale.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the sale already has one
    pub async fn insert_in(conn: &mut SqliteConnection, bonus: &PendingBonus) -> DbResult<()> {
        debug!(
            id = %bonus.id,
            sale_id = %bonus.sale_id,
            amount = bonus.bonus_amount,
            "Inserting pending bonus"
        );

        sqlx::query(
            r#"
            INSERT INTO pending_bonuses (
                id, phone_number, phone_digits, full_name, sale_id,
                bonus_amount, available_date, is_processed, processed_at,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&bonus.id)
        .bind(&bonus.phone_number)
        .bind(&bonus.phone_digits)
        .bind(&bonus.full_name)
        .bind(&bonus.sale_id)
        .bind(bonus.bonus_amount)
        .bind(bonus.available_date)
        .bind(bonus.is_processed)
        .bind(bonus.processed_at)
        .bind(bonus.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets a pending bonus by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PendingBonus>> {
        let sql = format!("SELECT {} FROM pending_bonuses WHERE id = ?1", PENDING_COLUMNS);

        let bonus = sqlx::query_as::<_, PendingBonus>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bonus)
    }

    /// Gets the pending bonus seeded by a sale.
    pub async fn get_by_sale_id(&self, sale_id: &str) -> DbResult<Option<PendingBonus>> {
        let sql = format!(
            "SELECT {} FROM pending_bonuses WHERE sale_id = ?1",
            PENDING_COLUMNS
        );

        let bonus = sqlx::query_as::<_, PendingBonus>(&sql)
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bonus)
    }

    /// Unprocessed bonuses of the customer whose phone has the same digits,
    /// split into available and upcoming.
    ///
    /// A phone without digits matches nothing.
    pub async fn find_by_phone(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> DbResult<PendingBonusView> {
        let digits = extract_digits(phone);
        if digits.is_empty() {
            return Ok(PendingBonusView::default());
        }

        let sql = format!(
            "SELECT {} FROM pending_bonuses \
             WHERE phone_digits = ?1 AND is_processed = 0 \
             ORDER BY available_date, id",
            PENDING_COLUMNS
        );

        let records = sqlx::query_as::<_, PendingBonus>(&sql)
            .bind(&digits)
            .fetch_all(&self.pool)
            .await?;

        debug!(digits = %digits, count = records.len(), "Pending bonuses by phone");
        Ok(PendingBonusView::partition(records, now))
    }

    /// Unprocessed bonuses whose full name contains `name`, case-insensitive.
    ///
    /// The comparison runs in Rust: SQLite's `LOWER` only folds ASCII and
    /// customer names are mostly Cyrillic.
    pub async fn find_by_name(&self, name: &str, now: DateTime<Utc>) -> DbResult<PendingBonusView> {
        let needle = name.trim().to_lowercase();

        let records = self
            .list_unprocessed()
            .await?
            .into_iter()
            .filter(|b| {
                b.full_name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
            })
            .collect();

        Ok(PendingBonusView::partition(records, now))
    }

    /// Unprocessed bonuses whose `available_date` has been reached, oldest first.
    pub async fn find_ready_for_processing(
        &self,
        now: DateTime<Utc>,
    ) -> DbResult<Vec<PendingBonus>> {
        let sql = format!(
            "SELECT {} FROM pending_bonuses \
             WHERE is_processed = 0 AND available_date <= ?1 \
             ORDER BY available_date, id",
            PENDING_COLUMNS
        );

        let records = sqlx::query_as::<_, PendingBonus>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = records.len(), "Pending bonuses ready for processing");
        Ok(records)
    }

    /// All unprocessed bonuses, oldest first.
    pub async fn list_unprocessed(&self) -> DbResult<Vec<PendingBonus>> {
        let sql = format!(
            "SELECT {} FROM pending_bonuses WHERE is_processed = 0 \
             ORDER BY available_date, id",
            PENDING_COLUMNS
        );

        let records = sqlx::query_as::<_, PendingBonus>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Flips a bonus to processed if nobody has done so yet.
    ///
    /// ## Returns
    /// * `Ok(true)` - this call performed the transition
    /// * `Ok(false)` - already processed (or no such row)
    pub async fn mark_processed_in(
        conn: &mut SqliteConnection,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE pending_bonuses
            SET is_processed = 1, processed_at = ?2
            WHERE id = ?1 AND is_processed = 0
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Aggregate counts and amounts plus the per-customer rollup.
    pub async fn stats(&self, now: DateTime<Utc>) -> DbResult<PendingStats> {
        let unprocessed = self.list_unprocessed().await?;

        let (processed_count, processed_amount): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(bonus_amount), 0)
            FROM pending_bonuses
            WHERE is_processed = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PendingStats::compute(
            unprocessed,
            processed_count as usize,
            processed_amount,
            now,
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sale::SaleRepository;
    use crate::{Database, DbConfig, DbError};
    use chrono::{Duration, TimeZone};
    use kitshop_core::{BonusStatus, Sale};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, 12, 0, 0).unwrap()
    }

    /// Inserts a bare sale plus its pending bonus and returns the bonus.
    async fn seed(
        db: &Database,
        phone: &str,
        name: Option<&str>,
        amount: i64,
        sale_day: u32,
    ) -> PendingBonus {
        let sale = Sale {
            id: kitshop_core::new_id(),
            customer_phone: phone.to_string(),
            phone_digits: extract_digits(phone),
            customer_full_name: name.map(str::to_string),
            items: Vec::new(),
            total_amount: 0,
            bonuses_earned: amount,
            bonus_status: BonusStatus::Pending,
            bonus_credited_at: None,
            sale_date: day(sale_day),
        };
        let bonus = PendingBonus {
            id: kitshop_core::new_id(),
            phone_number: phone.to_string(),
            phone_digits: extract_digits(phone),
            full_name: name.map(str::to_string),
            sale_id: sale.id.clone(),
            bonus_amount: amount,
            available_date: day(sale_day) + Duration::days(10),
            is_processed: false,
            processed_at: None,
            created_at: day(sale_day),
        };

        let mut tx = db.pool().begin().await.unwrap();
        SaleRepository::insert_in(&mut tx, &sale).await.unwrap();
        PendingBonusRepository::insert_in(&mut tx, &bonus).await.unwrap();
        tx.commit().await.unwrap();
        bonus
    }

    #[tokio::test]
    async fn test_find_by_phone_matches_digits() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db, "+7 (777) 123-12-12", None, 300, 1).await;
        seed(&db, "+7 (777) 123-12-12", None, 200, 15).await;
        seed(&db, "+7 (701) 000-00-00", None, 999, 1).await;

        let view = db
            .pending_bonuses()
            .find_by_phone("7 777 123 12 12", day(20))
            .await
            .unwrap();
        assert_eq!(view.available.len(), 1);
        assert_eq!(view.total_available, 300);
        assert_eq!(view.upcoming.len(), 1);
        assert_eq!(view.total_upcoming, 200);

        // 8-prefix is a different digit string
        let view = db
            .pending_bonuses()
            .find_by_phone("87771231212", day(20))
            .await
            .unwrap();
        assert!(view.available.is_empty() && view.upcoming.is_empty());

        let view = db.pending_bonuses().find_by_phone("n/a", day(20)).await.unwrap();
        assert!(view.available.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_name_is_case_insensitive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db, "+7 (777) 123-12-12", Some("Айгерим Садыкова"), 300, 1).await;
        seed(&db, "+7 (701) 000-00-00", Some("Ержан"), 100, 1).await;

        let view = db
            .pending_bonuses()
            .find_by_name("айгерим", day(20))
            .await
            .unwrap();
        assert_eq!(view.available.len(), 1);
        assert_eq!(view.total_available, 300);
    }

    #[tokio::test]
    async fn test_ready_and_claim_once() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let due = seed(&db, "+7 (777) 123-12-12", None, 300, 1).await;
        seed(&db, "+7 (777) 123-12-12", None, 200, 15).await;

        let repo = db.pending_bonuses();
        assert!(repo.find_ready_for_processing(day(5)).await.unwrap().is_empty());

        let ready = repo.find_ready_for_processing(day(11)).await.unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, due.id);

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(PendingBonusRepository::mark_processed_in(&mut conn, &due.id, day(11))
            .await
            .unwrap());
        assert!(!PendingBonusRepository::mark_processed_in(&mut conn, &due.id, day(12))
            .await
            .unwrap());
        drop(conn);

        let loaded = repo.get_by_id(&due.id).await.unwrap().unwrap();
        assert!(loaded.is_processed);
        assert_eq!(loaded.processed_at, Some(day(11)));
        assert!(repo.find_ready_for_processing(day(11)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_pending_bonus_per_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let first = seed(&db, "+7 (777) 123-12-12", None, 300, 1).await;

        let duplicate = PendingBonus {
            id: kitshop_core::new_id(),
            ..first.clone()
        };
        let mut conn = db.pool().acquire().await.unwrap();
        let err = PendingBonusRepository::insert_in(&mut conn, &duplicate)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
        drop(conn);

        let by_sale = db
            .pending_bonuses()
            .get_by_sale_id(&first.sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_sale.id, first.id);
    }

    #[tokio::test]
    async fn test_stats() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let done = seed(&db, "+7 (777) 123-12-12", Some("Айгерим"), 300, 1).await;
        seed(&db, "+7 (777) 123-12-12", Some("Айгерим"), 150, 2).await;
        seed(&db, "+7 (701) 000-00-00", None, 200, 15).await;

        let mut conn = db.pool().acquire().await.unwrap();
        PendingBonusRepository::mark_processed_in(&mut conn, &done.id, day(11))
            .await
            .unwrap();
        drop(conn);

        let stats = db.pending_bonuses().stats(day(20)).await.unwrap();
        assert_eq!(stats.processed_count, 1);
        assert_eq!(stats.processed_amount, 300);
        assert_eq!(stats.pending_count, 2);
        assert_eq!(stats.ready_count, 1);
        assert_eq!(stats.ready_amount, 150);
        assert_eq!(stats.upcoming_amount, 200);
        assert_eq!(stats.customers.len(), 2);
    }
}
