//! Sale recording.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    for each item:                                                       │
//! │      decrement ──► product missing?   → ProductNotFound (404)           │
//! │                ──► too few units?     → InsufficientStock (400)         │
//! │      load product, snapshot line (name, price, sale_price frozen)       │
//! │    insert sale + items (total re-checked against the lines)             │
//! │    insert pending bonus (available_date = sale_date + delay)            │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Any error before COMMIT drops the transaction, which rolls back every
//! stock decrement made for earlier items.
//!
//! The first statement of the transaction is a write. SQLite in WAL mode
//! cannot upgrade a transaction that has already read to a writer once
//! another connection commits, so reading first would make concurrent sales
//! fail with `database is locked` instead of waiting for the lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use kitshop_core::phone::extract_digits;
use kitshop_core::validation::{
    validate_full_name, validate_item_count, validate_page, validate_phone, validate_quantity,
    validate_uuid,
};
use kitshop_core::{
    BonusBalance, BonusPolicy, BonusStatus, CoreError, Money, PendingBonus, Sale, SaleItem,
};
use kitshop_db::{
    Database, DbError, DbResult, PendingBonusRepository, ProductRepository, SalePage,
    SaleRepository,
};

/// Body of `POST /api/sales`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub customer_full_name: Option<String>,
    #[serde(default)]
    pub items: Vec<SaleLineRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// What the bonus of a new sale will be and when it lands.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingBonusSummary {
    pub amount: i64,
    pub available_date: DateTime<Utc>,
}

/// Response of `POST /api/sales`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale: Sale,
    /// Ledger as it stands; the new bonus is not in it yet.
    pub bonus_account: BonusBalance,
    pub pending_bonus: PendingBonusSummary,
}

/// Records a sale and schedules its bonus.
pub async fn record_sale(
    db: &Database,
    policy: &BonusPolicy,
    request: CreateSaleRequest,
    now: DateTime<Utc>,
) -> DbResult<SaleReceipt> {
    let phone = validate_phone("customerPhone", &request.customer_phone).map_err(CoreError::from)?;
    let full_name = validate_full_name("customerFullName", request.customer_full_name.as_deref())
        .map_err(CoreError::from)?;
    validate_item_count(request.items.len()).map_err(CoreError::from)?;
    for line in &request.items {
        validate_uuid("productId", &line.product_id).map_err(CoreError::from)?;
        validate_quantity(line.quantity).map_err(CoreError::from)?;
    }

    let sale_id = kitshop_core::new_id();
    debug!(sale_id = %sale_id, items = request.items.len(), "Recording sale");

    let mut tx = db.pool().begin().await?;

    let mut items = Vec::with_capacity(request.items.len());
    for (line_no, line) in request.items.iter().enumerate() {
        let product_id = line.product_id.trim();

        let decremented = match ProductRepository::decrement_stock_in(
            &mut tx,
            product_id,
            line.quantity,
            now,
        )
        .await
        {
            Ok(decremented) => decremented,
            Err(DbError::NotFound { .. }) => {
                return Err(CoreError::ProductNotFound(product_id.to_string()).into())
            }
            Err(e) => return Err(e),
        };

        let product = ProductRepository::fetch_by_id_in(&mut tx, product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if !decremented {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock_quantity,
                requested: line.quantity,
            }
            .into());
        }

        items.push(SaleItem::snapshot(&sale_id, line_no as i64, &product, line.quantity));
    }

    let total: Money = items.iter().map(SaleItem::line_total).sum();
    let bonus = policy.compute_bonus(total);

    let sale = Sale {
        id: sale_id,
        customer_phone: phone.as_str().to_string(),
        phone_digits: phone.digits().to_string(),
        customer_full_name: full_name.clone(),
        items,
        total_amount: total.tenge(),
        bonuses_earned: bonus.tenge(),
        bonus_status: BonusStatus::Pending,
        bonus_credited_at: None,
        sale_date: now,
    };
    SaleRepository::insert_in(&mut tx, &sale).await?;

    let pending = PendingBonus {
        id: kitshop_core::new_id(),
        phone_number: sale.customer_phone.clone(),
        phone_digits: sale.phone_digits.clone(),
        full_name,
        sale_id: sale.id.clone(),
        bonus_amount: sale.bonuses_earned,
        available_date: policy.available_date(now),
        is_processed: false,
        processed_at: None,
        created_at: now,
    };
    PendingBonusRepository::insert_in(&mut tx, &pending).await?;

    tx.commit().await?;

    info!(
        sale_id = %sale.id,
        total = sale.total_amount,
        bonus = sale.bonuses_earned,
        available_date = %pending.available_date,
        "Sale recorded"
    );

    let bonus_account = db
        .bonuses()
        .get_by_phone(&sale.customer_phone)
        .await?
        .map(|account| BonusBalance::from(&account))
        .unwrap_or_else(|| BonusBalance::zero(&sale.customer_phone));

    Ok(SaleReceipt {
        sale,
        bonus_account,
        pending_bonus: PendingBonusSummary {
            amount: pending.bonus_amount,
            available_date: pending.available_date,
        },
    })
}

/// Loads one sale with its items.
pub async fn get_sale(db: &Database, id: &str) -> DbResult<Sale> {
    validate_uuid("id", id).map_err(CoreError::from)?;

    db.sales()
        .get_by_id(id.trim())
        .await?
        .ok_or_else(|| DbError::from(CoreError::SaleNotFound(id.trim().to_string())))
}

/// Lists sales newest first, optionally for one customer (digit-matched).
pub async fn list_sales(
    db: &Database,
    phone: Option<&str>,
    page: i64,
    limit: i64,
) -> DbResult<SalePage> {
    validate_page(page, limit).map_err(CoreError::from)?;

    let digits = phone.map(extract_digits);

    // A filter with no digits in it matches no customer.
    if digits.as_deref() == Some("") {
        return Ok(SalePage {
            sales: Vec::new(),
            total: 0,
        });
    }

    db.sales().list(digits.as_deref(), page, limit).await
}
