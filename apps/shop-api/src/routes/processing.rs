use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use kitshop_core::{BatchReport, PendingStats};

use crate::error::ApiResult;
use crate::services::bonus_processor;
use crate::AppState;

/// `POST /api/process-bonuses`: run the batch now.
pub async fn run(State(state): State<Arc<AppState>>) -> ApiResult<Json<BatchReport>> {
    Ok(Json(
        bonus_processor::process_pending_bonuses(&state.db, Utc::now()).await?,
    ))
}

/// `GET /api/process-bonuses`
pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<PendingStats>> {
    Ok(Json(bonus_processor::stats(&state.db, Utc::now()).await?))
}
