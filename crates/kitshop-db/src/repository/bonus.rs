//! # Bonus Ledger Repository
//!
//! One row per customer, keyed by phone digits.
//!
//! ## Balance Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  credit   INSERT ... ON CONFLICT(phone_digits) DO UPDATE               │
//! │             total     = total + amount                                 │
//! │             available = total + amount - used                          │
//! │             full_name = COALESCE(full_name, new name)                  │
//! │             phone     = new phone if canonical                         │
//! │                                                                         │
//! │  deduct   UPDATE ... SET used = used + amount,                         │
//! │                          available = available - amount                │
//! │           WHERE phone_digits = ? AND available >= amount               │
//! │                                                                         │
//! │  Every write recomputes `available` from the same row in the same      │
//! │  statement; the table CHECK rejects anything else.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kitshop_core::phone::{display_form, extract_digits, is_canonical};
use kitshop_core::{BonusAccount, CoreError, ValidationError};

const ACCOUNT_COLUMNS: &str = r#"
    id, phone_number, phone_digits, full_name, total_bonuses, used_bonuses,
    available_bonuses, last_updated, created_at
"#;

/// Repository for the bonus ledger.
#[derive(Debug, Clone)]
pub struct BonusRepository {
    pool: SqlitePool,
}

impl BonusRepository {
    /// Creates a new BonusRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BonusRepository { pool }
    }

    /// Gets the ledger row whose phone has the same digits, if any.
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<BonusAccount>> {
        let digits = extract_digits(phone);
        if digits.is_empty() {
            return Ok(None);
        }

        let mut conn = self.pool.acquire().await?;
        Self::fetch_by_digits_in(&mut conn, &digits).await
    }

    /// Gets a ledger row by phone digits on a caller-supplied connection.
    pub async fn fetch_by_digits_in(
        conn: &mut SqliteConnection,
        digits: &str,
    ) -> DbResult<Option<BonusAccount>> {
        let sql = format!(
            "SELECT {} FROM bonus_accounts WHERE phone_digits = ?1",
            ACCOUNT_COLUMNS
        );

        let account = sqlx::query_as::<_, BonusAccount>(&sql)
            .bind(digits)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(account)
    }

    /// Looks up a customer by phone, creating a zero-balance row if none exists.
    ///
    /// First-time customers get a deterministic zero instead of "not found".
    /// The new row stores the phone in canonical form when the digits allow
    /// it, so `77771231212` is shown as `+7 (777) 123-12-12`.
    pub async fn lookup_by_phone(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> DbResult<BonusAccount> {
        let digits = require_digits(phone)?;
        let display = display_form(phone);
        let mut conn = self.pool.acquire().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO bonus_accounts (
                id, phone_number, phone_digits, full_name,
                total_bonuses, used_bonuses, available_bonuses,
                last_updated, created_at
            ) VALUES (?1, ?2, ?3, NULL, 0, 0, 0, ?4, ?4)
            ON CONFLICT (phone_digits) DO NOTHING
            "#,
        )
        .bind(kitshop_core::new_id())
        .bind(&display)
        .bind(&digits)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if inserted.rows_affected() == 1 {
            info!(digits = %digits, "Created empty bonus account");
        }

        Self::fetch_by_digits_in(&mut conn, &digits)
            .await?
            .ok_or_else(|| DbError::not_found("Bonus account", digits))
    }

    /// Looks up a customer by a case-insensitive substring of the full name.
    ///
    /// When several customers match, the most recently updated wins.
    ///
    /// ## Returns
    /// * `Ok(None)` - nobody matches
    pub async fn lookup_by_name(&self, name: &str) -> DbResult<Option<BonusAccount>> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }

        let sql = format!(
            "SELECT {} FROM bonus_accounts WHERE full_name IS NOT NULL \
             ORDER BY last_updated DESC, id",
            ACCOUNT_COLUMNS
        );

        let accounts = sqlx::query_as::<_, BonusAccount>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(accounts.into_iter().find(|a| {
            a.full_name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().contains(&needle))
        }))
    }

    /// Credits points to a customer (admin credit).
    pub async fn credit(
        &self,
        phone: &str,
        amount: i64,
        full_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<BonusAccount> {
        let mut conn = self.pool.acquire().await?;
        Self::credit_in(&mut conn, phone, amount, full_name, now).await
    }

    /// Credits points on a caller-supplied connection or transaction.
    ///
    /// Creates the row if the customer has none. A name already on the row
    /// is kept; otherwise `full_name` is adopted. A canonical `phone`
    /// replaces whatever display form the row had.
    pub async fn credit_in(
        conn: &mut SqliteConnection,
        phone: &str,
        amount: i64,
        full_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<BonusAccount> {
        if amount < 0 {
            return Err(CoreError::from(ValidationError::MustNotBeNegative {
                field: "bonusesToAdd".to_string(),
            })
            .into());
        }
        let digits = require_digits(phone)?;

        debug!(digits = %digits, amount, "Crediting bonuses");

        sqlx::query(
            r#"
            INSERT INTO bonus_accounts (
                id, phone_number, phone_digits, full_name,
                total_bonuses, used_bonuses, available_bonuses,
                last_updated, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?5, ?6, ?6)
            ON CONFLICT (phone_digits) DO UPDATE SET
                total_bonuses = total_bonuses + excluded.total_bonuses,
                available_bonuses = total_bonuses + excluded.total_bonuses - used_bonuses,
                full_name = COALESCE(full_name, excluded.full_name),
                phone_number = CASE WHEN ?7 THEN excluded.phone_number ELSE phone_number END,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(kitshop_core::new_id())
        .bind(phone.trim())
        .bind(&digits)
        .bind(full_name)
        .bind(amount)
        .bind(now)
        .bind(is_canonical(phone.trim()))
        .execute(&mut *conn)
        .await?;

        Self::fetch_by_digits_in(conn, &digits)
            .await?
            .ok_or_else(|| DbError::not_found("Bonus account", digits))
    }

    /// Redeems points.
    ///
    /// ## Returns
    /// * `Err(Domain(CustomerNotFound))` - no ledger row for these digits
    /// * `Err(Domain(InsufficientBonuses))` - `amount > available`
    /// * `Err(Domain(Validation))` - `amount <= 0`
    pub async fn deduct(
        &self,
        phone: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> DbResult<BonusAccount> {
        if amount <= 0 {
            return Err(CoreError::from(ValidationError::MustBePositive {
                field: "bonusesToDeduct".to_string(),
            })
            .into());
        }
        let digits = require_digits(phone)?;

        debug!(digits = %digits, amount, "Deducting bonuses");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE bonus_accounts SET
                used_bonuses = used_bonuses + ?2,
                available_bonuses = available_bonuses - ?2,
                last_updated = ?3
            WHERE phone_digits = ?1 AND available_bonuses >= ?2
            "#,
        )
        .bind(&digits)
        .bind(amount)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let account = Self::fetch_by_digits_in(&mut tx, &digits).await?;

        let account = match (result.rows_affected(), account) {
            (_, None) => return Err(CoreError::CustomerNotFound(phone.trim().to_string()).into()),
            (0, Some(account)) => {
                return Err(CoreError::InsufficientBonuses {
                    available: account.available_bonuses,
                    requested: amount,
                }
                .into())
            }
            (_, Some(account)) => account,
        };

        tx.commit().await?;

        info!(
            digits = %digits,
            amount,
            available = account.available_bonuses,
            "Bonuses deducted"
        );
        Ok(account)
    }
}

/// Digits of a phone, or a validation error if it has none.
fn require_digits(phone: &str) -> DbResult<String> {
    let digits = extract_digits(phone);
    if digits.is_empty() {
        return Err(CoreError::from(ValidationError::InvalidFormat {
            field: "phoneNumber".to_string(),
            reason: "must contain digits".to_string(),
        })
        .into());
    }
    Ok(digits)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{Duration, TimeZone};

    const PHONE: &str = "+7 (777) 123-12-12";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_lookup_by_phone_creates_zero_row_once() {
        let db = db().await;
        let repo = db.bonuses();

        let first = repo.lookup_by_phone(PHONE, t0()).await.unwrap();
        assert_eq!(first.total_bonuses, 0);
        assert_eq!(first.available_bonuses, 0);
        assert_eq!(first.phone_digits, "77771231212");

        // Same digits, different formatting: same row
        let second = repo.lookup_by_phone("7 777 123 12 12", t0()).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.phone_number, PHONE);
    }

    #[tokio::test]
    async fn test_lookup_by_raw_digits_stores_canonical_phone() {
        let db = db().await;
        let repo = db.bonuses();

        let acc = repo.lookup_by_phone(" 77771231212 ", t0()).await.unwrap();
        assert_eq!(acc.phone_number, PHONE);
        assert_eq!(acc.phone_digits, "77771231212");

        // Digits that have no canonical shape are kept as typed
        let acc = repo.lookup_by_phone("8 777 123 12 12", t0()).await.unwrap();
        assert_eq!(acc.phone_number, "8 777 123 12 12");
    }

    #[tokio::test]
    async fn test_canonical_credit_refreshes_display_phone() {
        let db = db().await;
        let repo = db.bonuses();

        repo.credit("+7-777-123-1212", 100, None, t0()).await.unwrap();
        let acc = repo.get_by_phone(PHONE).await.unwrap().unwrap();
        assert_eq!(acc.phone_number, "+7-777-123-1212");

        let acc = repo.credit(PHONE, 50, None, t0()).await.unwrap();
        assert_eq!(acc.phone_number, PHONE);
        assert_eq!(acc.total_bonuses, 150);

        // A non-canonical credit never overwrites the canonical form
        let acc = repo.credit("7 777 123 12 12", 10, None, t0()).await.unwrap();
        assert_eq!(acc.phone_number, PHONE);
    }

    #[tokio::test]
    async fn test_credit_creates_and_accumulates() {
        let db = db().await;
        let repo = db.bonuses();

        let acc = repo.credit(PHONE, 600, Some("Айгерим"), t0()).await.unwrap();
        assert_eq!(acc.total_bonuses, 600);
        assert_eq!(acc.available_bonuses, 600);
        assert_eq!(acc.full_name.as_deref(), Some("Айгерим"));

        let later = t0() + Duration::days(1);
        let acc = repo.credit("+7-777-123-1212", 150, Some("Other"), later).await.unwrap();
        assert_eq!(acc.total_bonuses, 750);
        assert_eq!(acc.available_bonuses, 750);
        assert_eq!(acc.full_name.as_deref(), Some("Айгерим"));
        assert_eq!(acc.last_updated, later);
        assert!(acc.is_consistent());
    }

    #[tokio::test]
    async fn test_credit_adopts_name_when_missing() {
        let db = db().await;
        let repo = db.bonuses();

        repo.lookup_by_phone(PHONE, t0()).await.unwrap();
        let acc = repo.credit(PHONE, 0, Some("Ержан"), t0()).await.unwrap();
        assert_eq!(acc.full_name.as_deref(), Some("Ержан"));
        assert_eq!(acc.total_bonuses, 0);
    }

    #[tokio::test]
    async fn test_credit_rejects_negative() {
        let db = db().await;
        let err = db.bonuses().credit(PHONE, -1, None, t0()).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_deduct_boundary() {
        let db = db().await;
        let repo = db.bonuses();
        repo.credit(PHONE, 500, None, t0()).await.unwrap();

        let err = repo.deduct(PHONE, 501, t0()).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientBonuses {
                available: 500,
                requested: 501
            })
        ));

        let acc = repo.deduct(PHONE, 500, t0()).await.unwrap();
        assert_eq!(acc.available_bonuses, 0);
        assert_eq!(acc.used_bonuses, 500);
        assert_eq!(acc.total_bonuses, 500);
        assert!(acc.is_consistent());
    }

    #[tokio::test]
    async fn test_deduct_unknown_customer_and_bad_amounts() {
        let db = db().await;
        let repo = db.bonuses();

        let err = repo.deduct(PHONE, 10, t0()).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CustomerNotFound(_))));

        for amount in [0, -5] {
            let err = repo.deduct(PHONE, amount, t0()).await.unwrap_err();
            assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_lookup_by_name_prefers_recent() {
        let db = db().await;
        let repo = db.bonuses();
        repo.credit(PHONE, 100, Some("Айгерим Садыкова"), t0()).await.unwrap();
        repo.credit(
            "+7 (701) 000-00-00",
            200,
            Some("Айгерим Нурланова"),
            t0() + Duration::days(1),
        )
        .await
        .unwrap();

        let found = repo.lookup_by_name("АЙГЕРИМ").await.unwrap().unwrap();
        assert_eq!(found.total_bonuses, 200);

        let found = repo.lookup_by_name("садык").await.unwrap().unwrap();
        assert_eq!(found.total_bonuses, 100);

        assert!(repo.lookup_by_name("Ержан").await.unwrap().is_none());
    }
}
