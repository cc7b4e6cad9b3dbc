use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    /// Absent when the database cannot be queried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations: Option<MigrationStatus>,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MigrationStatus {
    pub applied: usize,
    pub total: usize,
}

/// Liveness, a `SELECT 1` against the pool and the schema version.
///
/// Degraded (503) when the database is unreachable or migrations are
/// still pending.
pub async fn check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database_ok = state.db.health_check().await;

    if !database_ok {
        warn!("Health check: database unreachable");
    }

    let migrations = if database_ok {
        match state.db.migration_status().await {
            Ok((total, applied)) => Some(MigrationStatus { applied, total }),
            Err(e) => {
                warn!(error = %e, "Health check: migration status unavailable");
                None
            }
        }
    } else {
        None
    };

    let schema_ok = migrations
        .as_ref()
        .is_some_and(|m| m.applied >= m.total);
    if database_ok && !schema_ok {
        warn!(?migrations, "Health check: schema not up to date");
    }

    let (status, body) = if database_ok && schema_ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: body,
            database: if database_ok { "ok" } else { "unavailable" },
            migrations,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
