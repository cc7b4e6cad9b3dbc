//! Deferred bonus crediting.
//!
//! ## Per-Record Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    claim   UPDATE pending_bonuses SET is_processed = 1                  │
//! │            WHERE id = ? AND is_processed = 0                            │
//! │            0 rows → another run took it, skip                          │
//! │    credit  ledger upsert (total += amount, available recomputed)       │
//! │    mark    sale.bonus_status = credited (missing sale only warns)      │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A record is credited at most once no matter how many runs overlap. A
//! record that fails is rolled back, logged, and retried on the next run.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use kitshop_core::{BatchReport, PendingBonus, PendingStats};
use kitshop_db::{BonusRepository, Database, DbResult, PendingBonusRepository, SaleRepository};

/// Outcome of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Crediting {
    Credited,
    AlreadyClaimed,
}

/// Credits every pending bonus whose date has come.
pub async fn process_pending_bonuses(db: &Database, now: DateTime<Utc>) -> DbResult<BatchReport> {
    let ready = db.pending_bonuses().find_ready_for_processing(now).await?;
    debug!(ready = ready.len(), "Processing pending bonuses");

    let mut report = BatchReport::default();

    for mut bonus in ready {
        match credit_one(db, &bonus, now).await {
            Ok(Crediting::Credited) => {
                bonus.is_processed = true;
                bonus.processed_at = Some(now);
                report.processed.push(bonus);
            }
            Ok(Crediting::AlreadyClaimed) => {
                debug!(id = %bonus.id, "Pending bonus already claimed, skipping");
            }
            Err(e) => {
                error!(
                    id = %bonus.id,
                    sale_id = %bonus.sale_id,
                    error = %e,
                    "Failed to credit pending bonus"
                );
                report.failed_count += 1;
            }
        }
    }

    report.processed_count = report.processed.len();

    if report.processed_count > 0 || report.failed_count > 0 {
        info!(
            processed = report.processed_count,
            failed = report.failed_count,
            "Bonus batch finished"
        );
    }

    Ok(report)
}

async fn credit_one(
    db: &Database,
    bonus: &PendingBonus,
    now: DateTime<Utc>,
) -> DbResult<Crediting> {
    let mut tx = db.pool().begin().await?;

    if !PendingBonusRepository::mark_processed_in(&mut tx, &bonus.id, now).await? {
        return Ok(Crediting::AlreadyClaimed);
    }

    BonusRepository::credit_in(
        &mut tx,
        &bonus.phone_number,
        bonus.bonus_amount,
        bonus.full_name.as_deref(),
        now,
    )
    .await?;

    if !SaleRepository::mark_bonus_credited_in(&mut tx, &bonus.sale_id, now).await? {
        warn!(sale_id = %bonus.sale_id, "Sale for credited bonus not found");
    }

    tx.commit().await?;

    info!(
        id = %bonus.id,
        phone = %bonus.phone_number,
        amount = bonus.bonus_amount,
        "Pending bonus credited"
    );
    Ok(Crediting::Credited)
}

/// Pending, ready, upcoming and processed totals plus the per-customer rollup.
pub async fn stats(db: &Database, now: DateTime<Utc>) -> DbResult<PendingStats> {
    db.pending_bonuses().stats(now).await
}
