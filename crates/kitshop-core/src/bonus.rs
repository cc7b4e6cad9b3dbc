//! # Bonus Rules
//!
//! Accrual policy, ledger arithmetic and the read models built over
//! pending bonuses.
//!
//! ## Bonus Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Sale recorded (day 0)                                                │
//! │        │  bonus = floor(total × rate)                                  │
//! │        ▼                                                                │
//! │   PendingBonus { is_processed: false, available_date: day 0 + delay }  │
//! │        │                                                                │
//! │        │  now < available_date   → "upcoming"                          │
//! │        │  now ≥ available_date   → "available" / ready                 │
//! │        ▼                                                                │
//! │   Batch run: claim → credit ledger → mark sale credited                │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   BonusAccount { total += bonus, available = total - used }            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   Redemption at checkout: used += amount (amount ≤ available)          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{AccrualRate, BonusAccount, PendingBonus};

// =============================================================================
// Bonus Policy
// =============================================================================

/// How much a sale earns and when it becomes creditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusPolicy {
    pub accrual_rate: AccrualRate,
    pub delay_days: i64,
}

impl Default for BonusPolicy {
    fn default() -> Self {
        BonusPolicy {
            accrual_rate: AccrualRate::default(),
            delay_days: crate::DEFAULT_BONUS_DELAY_DAYS,
        }
    }
}

impl BonusPolicy {
    pub fn new(accrual_rate: AccrualRate, delay_days: i64) -> Self {
        BonusPolicy {
            accrual_rate,
            delay_days,
        }
    }

    /// Bonus points earned on a sale total, rounded down.
    pub fn compute_bonus(&self, total: Money) -> Money {
        total.accrue(self.accrual_rate)
    }

    /// Moment the bonus of a sale made at `sale_date` may be credited.
    pub fn available_date(&self, sale_date: DateTime<Utc>) -> DateTime<Utc> {
        sale_date + Duration::days(self.delay_days)
    }
}

// =============================================================================
// Ledger Arithmetic
// =============================================================================

impl BonusAccount {
    /// Creates an empty ledger row for a customer.
    pub fn new(
        phone_number: &str,
        phone_digits: &str,
        full_name: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        BonusAccount {
            id: crate::new_id(),
            phone_number: phone_number.to_string(),
            phone_digits: phone_digits.to_string(),
            full_name,
            total_bonuses: 0,
            used_bonuses: 0,
            available_bonuses: 0,
            last_updated: now,
            created_at: now,
        }
    }

    /// Adds accrued points to the balance.
    ///
    /// A name already on the account is kept; otherwise `full_name` is adopted.
    pub fn credit(
        &mut self,
        amount: Money,
        full_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        if amount.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "bonusesToAdd".to_string(),
            }
            .into());
        }

        self.total_bonuses += amount.tenge();
        self.available_bonuses = self.total_bonuses - self.used_bonuses;
        if self.full_name.is_none() {
            self.full_name = full_name.map(str::to_string);
        }
        self.last_updated = now;
        Ok(())
    }

    /// Redeems points. Spending exactly the available balance is allowed.
    pub fn deduct(&mut self, amount: Money, now: DateTime<Utc>) -> CoreResult<()> {
        if !amount.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "bonusesToDeduct".to_string(),
            }
            .into());
        }

        if amount.tenge() > self.available_bonuses {
            return Err(CoreError::InsufficientBonuses {
                available: self.available_bonuses,
                requested: amount.tenge(),
            });
        }

        self.used_bonuses += amount.tenge();
        self.available_bonuses = self.total_bonuses - self.used_bonuses;
        self.last_updated = now;
        Ok(())
    }

    #[inline]
    pub fn available(&self) -> Money {
        Money::from_tenge(self.available_bonuses)
    }

    /// `available == total - used`
    pub fn is_consistent(&self) -> bool {
        self.available_bonuses == self.total_bonuses - self.used_bonuses
    }
}

/// Balance summary returned next to a freshly recorded sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BonusBalance {
    pub phone_number: String,
    pub full_name: Option<String>,
    pub total_bonuses: i64,
    pub used_bonuses: i64,
    pub available_bonuses: i64,
}

impl BonusBalance {
    /// Balance of a customer with no ledger row yet.
    pub fn zero(phone_number: &str) -> Self {
        BonusBalance {
            phone_number: phone_number.to_string(),
            full_name: None,
            total_bonuses: 0,
            used_bonuses: 0,
            available_bonuses: 0,
        }
    }
}

impl From<&BonusAccount> for BonusBalance {
    fn from(account: &BonusAccount) -> Self {
        BonusBalance {
            phone_number: account.phone_number.clone(),
            full_name: account.full_name.clone(),
            total_bonuses: account.total_bonuses,
            used_bonuses: account.used_bonuses,
            available_bonuses: account.available_bonuses,
        }
    }
}

// =============================================================================
// Pending Bonus View
// =============================================================================

/// Unprocessed bonuses of one customer split by eligibility.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PendingBonusView {
    /// `available_date <= now`
    pub available: Vec<PendingBonus>,
    pub upcoming: Vec<PendingBonus>,
    pub total_available: i64,
    pub total_upcoming: i64,
}

impl PendingBonusView {
    /// Splits records on `available_date <= now` and sums each side.
    ///
    /// Already processed records are ignored.
    pub fn partition(records: Vec<PendingBonus>, now: DateTime<Utc>) -> Self {
        let mut view = PendingBonusView::default();

        for record in records.into_iter().filter(|r| !r.is_processed) {
            if record.is_available(now) {
                view.total_available += record.bonus_amount;
                view.available.push(record);
            } else {
                view.total_upcoming += record.bonus_amount;
                view.upcoming.push(record);
            }
        }

        view
    }
}

// =============================================================================
// Batch Statistics
// =============================================================================

/// A pending bonus tagged with whether the next batch run would credit it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PendingEntry {
    #[serde(flatten)]
    pub bonus: PendingBonus,
    pub is_ready: bool,
}

/// Unprocessed bonuses of one customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerPending {
    pub phone_number: String,
    pub full_name: Option<String>,
    pub count: usize,
    pub total_amount: i64,
    pub ready_amount: i64,
    pub bonuses: Vec<PendingEntry>,
}

/// Aggregate figures over the pending-bonus store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PendingStats {
    /// Every unprocessed record.
    pub pending_count: usize,
    pub pending_amount: i64,
    /// Unprocessed and due.
    pub ready_count: usize,
    pub ready_amount: i64,
    /// Unprocessed and not yet due.
    pub upcoming_count: usize,
    pub upcoming_amount: i64,
    pub processed_count: usize,
    pub processed_amount: i64,
    pub customers: Vec<CustomerPending>,
}

impl PendingStats {
    /// Builds stats from the unprocessed records plus processed totals.
    ///
    /// Customers are grouped by phone digits and ordered by them.
    pub fn compute(
        unprocessed: Vec<PendingBonus>,
        processed_count: usize,
        processed_amount: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut stats = PendingStats {
            processed_count,
            processed_amount,
            ..Default::default()
        };
        let mut groups: BTreeMap<String, CustomerPending> = BTreeMap::new();

        for bonus in unprocessed.into_iter().filter(|b| !b.is_processed) {
            let is_ready = bonus.is_available(now);
            let amount = bonus.bonus_amount;

            stats.pending_count += 1;
            stats.pending_amount += amount;
            if is_ready {
                stats.ready_count += 1;
                stats.ready_amount += amount;
            } else {
                stats.upcoming_count += 1;
                stats.upcoming_amount += amount;
            }

            let group = groups
                .entry(bonus.phone_digits.clone())
                .or_insert_with(|| CustomerPending {
                    phone_number: bonus.phone_number.clone(),
                    full_name: None,
                    count: 0,
                    total_amount: 0,
                    ready_amount: 0,
                    bonuses: Vec::new(),
                });
            if group.full_name.is_none() {
                group.full_name = bonus.full_name.clone();
            }
            group.count += 1;
            group.total_amount += amount;
            if is_ready {
                group.ready_amount += amount;
            }
            group.bonuses.push(PendingEntry { bonus, is_ready });
        }

        stats.customers = groups.into_values().collect();
        stats
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BatchReport {
    pub processed_count: usize,
    pub processed: Vec<PendingBonus>,
    /// Records that failed and stay unprocessed for the next run.
    pub failed_count: usize,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn pending(id: &str, digits: &str, amount: i64, available_day: u32) -> PendingBonus {
        PendingBonus {
            id: id.to_string(),
            phone_number: format!("+{}", digits),
            phone_digits: digits.to_string(),
            full_name: Some("Айгерим".to_string()),
            sale_id: format!("sale-{}", id),
            bonus_amount: amount,
            available_date: at(available_day),
            is_processed: false,
            processed_at: None,
            created_at: at(1),
        }
    }

    fn account() -> BonusAccount {
        BonusAccount::new("+7 (777) 123-12-12", "77771231212", None, at(1))
    }

    #[test]
    fn test_policy_defaults() {
        let policy = BonusPolicy::default();
        assert_eq!(policy.accrual_rate.bps(), 300);
        assert_eq!(policy.delay_days, 10);
        assert_eq!(policy.compute_bonus(Money::from_tenge(20_000)).tenge(), 600);
        assert_eq!(policy.available_date(at(1)), at(11));
    }

    #[test]
    fn test_credit_keeps_invariant_and_existing_name() {
        let mut acc = account();
        acc.credit(Money::from_tenge(600), Some("Айгерим"), at(2)).unwrap();
        assert_eq!(acc.total_bonuses, 600);
        assert_eq!(acc.available_bonuses, 600);
        assert_eq!(acc.full_name.as_deref(), Some("Айгерим"));

        acc.credit(Money::from_tenge(100), Some("Other"), at(3)).unwrap();
        assert_eq!(acc.full_name.as_deref(), Some("Айгерим"));
        assert_eq!(acc.last_updated, at(3));
        assert!(acc.is_consistent());
    }

    #[test]
    fn test_credit_rejects_negative() {
        let mut acc = account();
        let err = acc.credit(Money::from_tenge(-1), None, at(2)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(acc.total_bonuses, 0);
    }

    #[test]
    fn test_deduct_boundary() {
        let mut acc = account();
        acc.credit(Money::from_tenge(500), None, at(2)).unwrap();

        let err = acc.deduct(Money::from_tenge(501), at(3)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientBonuses {
                available: 500,
                requested: 501
            }
        ));

        acc.deduct(Money::from_tenge(500), at(3)).unwrap();
        assert_eq!(acc.available_bonuses, 0);
        assert_eq!(acc.used_bonuses, 500);
        assert!(acc.is_consistent());
    }

    #[test]
    fn test_deduct_rejects_non_positive() {
        let mut acc = account();
        acc.credit(Money::from_tenge(500), None, at(2)).unwrap();

        for amount in [0, -10] {
            let err = acc.deduct(Money::from_tenge(amount), at(3)).unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)));
        }
        assert_eq!(acc.available_bonuses, 500);
    }

    #[test]
    fn test_partition() {
        let mut done = pending("d", "7001", 999, 1);
        done.is_processed = true;
        let records = vec![
            pending("a", "7001", 300, 5),
            pending("b", "7001", 200, 20),
            pending("c", "7001", 100, 10),
            done,
        ];

        let view = PendingBonusView::partition(records, at(10));
        assert_eq!(view.available.len(), 2);
        assert_eq!(view.upcoming.len(), 1);
        assert_eq!(view.total_available, 400);
        assert_eq!(view.total_upcoming, 200);
    }

    #[test]
    fn test_stats_groups_by_digits() {
        let records = vec![
            pending("a", "7001", 300, 5),
            pending("b", "7002", 200, 20),
            pending("c", "7001", 100, 20),
        ];

        let stats = PendingStats::compute(records, 4, 1_000, at(10));
        assert_eq!(stats.pending_count, 3);
        assert_eq!(stats.pending_amount, 600);
        assert_eq!(stats.ready_count, 1);
        assert_eq!(stats.ready_amount, 300);
        assert_eq!(stats.upcoming_count, 2);
        assert_eq!(stats.upcoming_amount, 300);
        assert_eq!(stats.processed_count, 4);

        assert_eq!(stats.customers.len(), 2);
        let first = &stats.customers[0];
        assert_eq!(first.count, 2);
        assert_eq!(first.total_amount, 400);
        assert_eq!(first.ready_amount, 300);
        assert!(first.bonuses[0].is_ready);
        assert!(!first.bonuses[1].is_ready);
    }

    #[test]
    fn test_pending_entry_flattens() {
        let entry = PendingEntry {
            bonus: pending("a", "7001", 300, 5),
            is_ready: true,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["bonusAmount"], 300);
        assert_eq!(json["isReady"], true);
        assert!(json.get("phoneDigits").is_none());
    }
}
