//! Bonus ledger lookups, admin credits and redemptions.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use kitshop_core::validation::{
    validate_bonus_credit, validate_bonus_deduction, validate_full_name, validate_phone,
    validate_search_term,
};
use kitshop_core::{BonusAccount, CoreError, PendingBonusView, ValidationError};
use kitshop_db::{Database, DbResult};

/// Body of `POST /api/bonuses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditRequest {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub bonuses_to_add: i64,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Body of `POST /api/bonuses/deduct`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductRequest {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub bonuses_to_deduct: i64,
}

/// `?phone=` or `?name=`; phone wins when both are present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerQuery {
    pub phone: Option<String>,
    pub name: Option<String>,
}

impl CustomerQuery {
    fn phone(&self) -> Option<&str> {
        self.phone.as_deref().filter(|p| !p.trim().is_empty())
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

fn missing_customer_key() -> CoreError {
    ValidationError::Required {
        field: "phone".to_string(),
    }
    .into()
}

/// Looks up a ledger row.
///
/// An unknown phone gets a zero row created for it; an unknown name is
/// `CustomerNotFound`.
pub async fn lookup(
    db: &Database,
    query: &CustomerQuery,
    now: DateTime<Utc>,
) -> DbResult<BonusAccount> {
    if let Some(phone) = query.phone() {
        return db.bonuses().lookup_by_phone(phone, now).await;
    }

    let name = query.name().ok_or_else(missing_customer_key)?;
    let name = validate_search_term("name", name).map_err(CoreError::from)?;

    Ok(db
        .bonuses()
        .lookup_by_name(&name)
        .await?
        .ok_or(CoreError::CustomerNotFound(name))?)
}

/// Admin credit.
pub async fn credit(
    db: &Database,
    request: CreditRequest,
    now: DateTime<Utc>,
) -> DbResult<BonusAccount> {
    let phone = validate_phone("phoneNumber", &request.phone_number).map_err(CoreError::from)?;
    validate_bonus_credit(request.bonuses_to_add).map_err(CoreError::from)?;
    let full_name =
        validate_full_name("fullName", request.full_name.as_deref()).map_err(CoreError::from)?;

    let account = db
        .bonuses()
        .credit(phone.as_str(), request.bonuses_to_add, full_name.as_deref(), now)
        .await?;

    info!(
        phone = %account.phone_number,
        amount = request.bonuses_to_add,
        available = account.available_bonuses,
        "Bonuses credited by admin"
    );
    Ok(account)
}

/// Redemption at checkout.
pub async fn deduct(
    db: &Database,
    request: DeductRequest,
    now: DateTime<Utc>,
) -> DbResult<BonusAccount> {
    let phone = validate_phone("phoneNumber", &request.phone_number).map_err(CoreError::from)?;
    validate_bonus_deduction(request.bonuses_to_deduct).map_err(CoreError::from)?;

    db.bonuses()
        .deduct(phone.as_str(), request.bonuses_to_deduct, now)
        .await
}

/// Unprocessed bonuses of one customer, split into available and upcoming.
pub async fn pending_view(
    db: &Database,
    query: &CustomerQuery,
    now: DateTime<Utc>,
) -> DbResult<PendingBonusView> {
    if let Some(phone) = query.phone() {
        return db.pending_bonuses().find_by_phone(phone, now).await;
    }

    let name = query.name().ok_or_else(missing_customer_key)?;
    let name = validate_search_term("name", name).map_err(CoreError::from)?;

    db.pending_bonuses().find_by_name(&name, now).await
}
