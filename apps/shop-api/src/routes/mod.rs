//! # HTTP Routes
//!
//! | Method | Path                      | Handler                        |
//! |--------|---------------------------|--------------------------------|
//! | GET    | `/health`                 | [`health::check`]              |
//! | POST   | `/api/sales`              | [`sales::create`]              |
//! | GET    | `/api/sales`              | [`sales::list`]                |
//! | GET    | `/api/sales/{id}`         | [`sales::get`]                 |
//! | GET    | `/api/bonuses`            | [`bonuses::lookup`]            |
//! | POST   | `/api/bonuses`            | [`bonuses::credit`]            |
//! | POST   | `/api/bonuses/deduct`     | [`bonuses::deduct`]            |
//! | GET    | `/api/pending-bonuses`    | [`bonuses::pending`]           |
//! | POST   | `/api/process-bonuses`    | [`processing::run`]            |
//! | GET    | `/api/process-bonuses`    | [`processing::stats`]          |

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod bonuses;
pub mod health;
pub mod processing;
pub mod sales;

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/sales", post(sales::create).get(sales::list))
        .route("/sales/{id}", get(sales::get))
        .route("/bonuses", get(bonuses::lookup).post(bonuses::credit))
        .route("/bonuses/deduct", post(bonuses::deduct))
        .route("/pending-bonuses", get(bonuses::pending))
        .route("/process-bonuses", post(processing::run).get(processing::stats));

    Router::new()
        .route("/health", get(health::check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
