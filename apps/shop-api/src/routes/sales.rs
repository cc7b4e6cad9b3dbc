use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use kitshop_core::{Sale, DEFAULT_PAGE_SIZE};

use crate::error::ApiResult;
use crate::services::sale_service::{self, CreateSaleRequest, SaleReceipt};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListSalesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    fn new(page: i64, limit: i64, total: i64) -> Self {
        Pagination {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleList {
    pub sales: Vec<Sale>,
    pub pagination: Pagination,
}

/// `POST /api/sales`
pub async fn create(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateSaleRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SaleReceipt>)> {
    let Json(request) = body?;

    let receipt = sale_service::record_sale(&state.db, &state.policy(), request, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// `GET /api/sales?page=&limit=&phone=`
pub async fn list(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListSalesQuery>, QueryRejection>,
) -> ApiResult<Json<SaleList>> {
    let Query(query) = query?;
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);

    let result = sale_service::list_sales(&state.db, query.phone.as_deref(), page, limit).await?;

    Ok(Json(SaleList {
        sales: result.sales,
        pagination: Pagination::new(page, limit, result.total),
    }))
}

/// `GET /api/sales/{id}`
pub async fn get(
    State(state): State<Arc<AppState>>,
    id: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Sale>> {
    let Path(id) = id?;

    Ok(Json(sale_service::get_sale(&state.db, &id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).pages, 2);
    }
}
