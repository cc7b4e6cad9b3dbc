use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;

use kitshop_core::{BonusAccount, PendingBonusView};

use crate::error::ApiResult;
use crate::services::bonus_service::{self, CreditRequest, CustomerQuery, DeductRequest};
use crate::AppState;

/// `GET /api/bonuses?phone=` or `?name=`
pub async fn lookup(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CustomerQuery>, QueryRejection>,
) -> ApiResult<Json<BonusAccount>> {
    let Query(query) = query?;

    Ok(Json(bonus_service::lookup(&state.db, &query, Utc::now()).await?))
}

/// `POST /api/bonuses`
pub async fn credit(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreditRequest>, JsonRejection>,
) -> ApiResult<Json<BonusAccount>> {
    let Json(request) = body?;

    Ok(Json(bonus_service::credit(&state.db, request, Utc::now()).await?))
}

/// `POST /api/bonuses/deduct`
pub async fn deduct(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DeductRequest>, JsonRejection>,
) -> ApiResult<Json<BonusAccount>> {
    let Json(request) = body?;

    Ok(Json(bonus_service::deduct(&state.db, request, Utc::now()).await?))
}

/// `GET /api/pending-bonuses?phone=` or `?name=`
pub async fn pending(
    State(state): State<Arc<AppState>>,
    query: Result<Query<CustomerQuery>, QueryRejection>,
) -> ApiResult<Json<PendingBonusView>> {
    let Query(query) = query?;

    Ok(Json(bonus_service::pending_view(&state.db, &query, Utc::now()).await?))
}
