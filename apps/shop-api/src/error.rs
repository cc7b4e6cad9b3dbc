//! Error types for the Shop API.
//!
//! Every failure a handler can produce ends up as an [`ApiError`], which
//! renders as `{"code": ..., "message": ..., "field": ...}` with a status
//! derived from the code.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use kitshop_core::{CoreError, ValidationError};
use kitshop_db::DbError;

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InsufficientStock,
    InsufficientBonuses,
    NotFound,
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError
            | ErrorCode::InsufficientStock
            | ErrorCode::InsufficientBonuses => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Shop API error, as serialized to clients.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError {
            code: ErrorCode::ValidationError,
            field: Some(err.field().to_string()),
            message: err.to_string(),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => v.into(),
            CoreError::InsufficientStock { .. } => {
                Self::new(ErrorCode::InsufficientStock, err.to_string())
            }
            CoreError::InsufficientBonuses { .. } => {
                Self::new(ErrorCode::InsufficientBonuses, err.to_string())
            }
            CoreError::ProductNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::CustomerNotFound(_) => Self::not_found(err.to_string()),
            CoreError::InvalidSaleTotal { .. } => {
                error!(error = %err, "Sale total check failed");
                Self::new(ErrorCode::InternalError, "Internal server error")
            }
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => core.into(),
            DbError::NotFound { .. } => Self::not_found(err.to_string()),
            other => {
                error!(error = %other, "Database error");
                Self::new(ErrorCode::DatabaseError, "Database error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_keeps_field() {
        let err: ApiError = ValidationError::MustBePositive {
            field: "bonusesToDeduct".to_string(),
        }
        .into();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.field.as_deref(), Some("bonusesToDeduct"));

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[test]
    fn test_domain_errors_map_to_codes() {
        let stock: ApiError = CoreError::InsufficientStock {
            product: "Chemistry Lab Kit".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(stock.code, ErrorCode::InsufficientStock);
        assert_eq!(stock.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = DbError::Domain(CoreError::CustomerNotFound("x".into())).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_errors_are_generic() {
        let err: ApiError = DbError::QueryFailed("no such table: sales".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message.contains("sales"));

        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("field").is_none());
    }
}
