//! # Domain Types
//!
//! Core domain types of the kitshop bonus subsystem.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │  PendingBonus   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  sale_id (1:1)  │       │
//! │  │  price          │──►│  items[]        │──►│  bonus_amount   │       │
//! │  │  sale_price?    │   │  total_amount   │   │  available_date │       │
//! │  │  stock_quantity │   │  bonuses_earned │   │  is_processed   │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │ batch run      │
//! │                                                       ▼                │
//! │                        ┌─────────────────┐   ┌─────────────────┐       │
//! │                        │   BonusStatus   │   │  BonusAccount   │       │
//! │                        │  ─────────────  │   │  ─────────────  │       │
//! │                        │  Pending        │   │  phone_digits   │       │
//! │                        │  Credited       │   │  total / used   │       │
//! │                        └─────────────────┘   │  available      │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Phone Keys
//! Every customer-facing record stores the phone twice:
//! - `phone_number`/`customer_phone`: the display form as typed
//! - `phone_digits`: digits only, the key used for matching (see [`crate::phone`])

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Accrual Rate
// =============================================================================

/// Bonus accrual rate in basis points (bps).
///
/// 1 basis point = 0.01%, so 300 bps = 3%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AccrualRate(u32);

impl AccrualRate {
    /// Creates an accrual rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        AccrualRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for AccrualRate {
    fn default() -> Self {
        AccrualRate(crate::DEFAULT_ACCRUAL_BPS)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A kit sold in the shop, as far as the bonus subsystem needs it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Regular price in tenge.
    pub price: i64,
    /// Discounted price; takes precedence over `price` when set.
    pub sale_price: Option<i64>,
    pub in_stock: bool,
    pub stock_quantity: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price a customer pays per unit: `sale_price ?? price`.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_tenge(self.sale_price.unwrap_or(self.price))
    }
}

// =============================================================================
// Bonus Status
// =============================================================================

/// Whether a sale's bonus has reached the customer's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum BonusStatus {
    /// Bonus is waiting in `pending_bonuses`.
    #[default]
    Pending,
    /// Batch processor has credited the bonus.
    Credited,
}

// =============================================================================
// Sale
// =============================================================================

/// One purchase transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Canonical display form, e.g. `+7 (777) 123-12-12`.
    pub customer_phone: String,
    #[serde(skip)]
    pub phone_digits: String,
    pub customer_full_name: Option<String>,
    /// Loaded separately from `sale_items`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<SaleItem>,
    pub total_amount: i64,
    pub bonuses_earned: i64,
    pub bonus_status: BonusStatus,
    #[ts(as = "Option<String>")]
    pub bonus_credited_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
}

impl Sale {
    /// Returns the sale total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_tenge(self.total_amount)
    }

    /// Checks that `total_amount` is the sum of the line totals.
    pub fn verify_total(&self) -> CoreResult<()> {
        let expected: Money = self.items.iter().map(SaleItem::line_total).sum();
        if expected != self.total() {
            return Err(CoreError::InvalidSaleTotal {
                expected: expected.tenge(),
                actual: self.total_amount,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    /// Position of the line in the order, starting at 0.
    pub line_no: i64,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    /// Regular price at time of sale (frozen).
    pub price: i64,
    /// Sale price at time of sale (frozen).
    pub sale_price: Option<i64>,
    pub quantity: i64,
    /// `(sale_price ?? price) × quantity`.
    pub total_price: i64,
}

impl SaleItem {
    /// Builds a line item snapshot from the product as it is now.
    pub fn snapshot(
        sale_id: &str,
        line_no: i64,
        product: &Product,
        quantity: i64,
    ) -> Self {
        SaleItem {
            id: crate::new_id(),
            sale_id: sale_id.to_string(),
            line_no,
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            price: product.price,
            sale_price: product.sale_price,
            quantity,
            total_price: product.unit_price().multiply_quantity(quantity).tenge(),
        }
    }

    /// Returns the unit price the customer paid.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_tenge(self.sale_price.unwrap_or(self.price))
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_tenge(self.total_price)
    }
}

// =============================================================================
// Pending Bonus
// =============================================================================

/// One deferred accrual obligation, seeded by a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PendingBonus {
    pub id: String,
    pub phone_number: String,
    #[serde(skip)]
    pub phone_digits: String,
    pub full_name: Option<String>,
    pub sale_id: String,
    pub bonus_amount: i64,
    /// Earliest moment the batch processor may credit this bonus.
    #[ts(as = "String")]
    pub available_date: DateTime<Utc>,
    pub is_processed: bool,
    #[ts(as = "Option<String>")]
    pub processed_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PendingBonus {
    /// Returns true once `available_date` has been reached.
    #[inline]
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.available_date <= now
    }
}

// =============================================================================
// Bonus Account (ledger row)
// =============================================================================

/// Per-customer bonus balance.
///
/// Invariant: `available_bonuses == total_bonuses - used_bonuses`.
/// The mutating methods live in [`crate::bonus`] and keep it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BonusAccount {
    pub id: String,
    pub phone_number: String,
    #[serde(skip)]
    pub phone_digits: String,
    pub full_name: Option<String>,
    pub total_bonuses: i64,
    pub used_bonuses: i64,
    pub available_bonuses: i64,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kit(price: i64, sale_price: Option<i64>, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p-1".to_string(),
            name: "Chemistry Lab Kit".to_string(),
            price,
            sale_price,
            in_stock: stock > 0,
            stock_quantity: stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_unit_price_prefers_sale_price() {
        assert_eq!(kit(10_000, None, 5).unit_price().tenge(), 10_000);
        assert_eq!(kit(10_000, Some(8_500), 5).unit_price().tenge(), 8_500);
    }

    fn sale_of(items: Vec<SaleItem>, total_amount: i64) -> Sale {
        Sale {
            id: "s-1".to_string(),
            customer_phone: "+7 (777) 123-12-12".to_string(),
            phone_digits: "77771231212".to_string(),
            customer_full_name: None,
            items,
            total_amount,
            bonuses_earned: 0,
            bonus_status: BonusStatus::Pending,
            bonus_credited_at: None,
            sale_date: Utc::now(),
        }
    }

    #[test]
    fn test_verify_total() {
        let items = vec![
            SaleItem::snapshot("s-1", 0, &kit(10_000, Some(9_000), 5), 2),
            SaleItem::snapshot("s-1", 1, &kit(4_990, None, 5), 1),
        ];
        assert!(sale_of(items.clone(), 22_990).verify_total().is_ok());

        let err = sale_of(items, 23_000).verify_total().unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidSaleTotal {
                expected: 22_990,
                actual: 23_000
            }
        ));
    }

    #[test]
    fn test_sale_item_snapshot() {
        let item = SaleItem::snapshot("s-1", 0, &kit(10_000, Some(9_000), 5), 2);
        assert_eq!(item.price, 10_000);
        assert_eq!(item.sale_price, Some(9_000));
        assert_eq!(item.total_price, 18_000);
        assert_eq!(item.unit_price().tenge(), 9_000);
        assert_eq!(item.product_name, "Chemistry Lab Kit");
    }

    #[test]
    fn test_bonus_status_default() {
        assert_eq!(BonusStatus::default(), BonusStatus::Pending);
    }

    #[test]
    fn test_accrual_rate_percentage() {
        let rate = AccrualRate::from_bps(300);
        assert!((rate.percentage() - 3.0).abs() < f64::EPSILON);
    }
}
