//! # Kitshop Shop API
//!
//! JSON HTTP server for sales, the bonus ledger and deferred crediting.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Shop API Services                               │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  SaleService   │  │  BonusService  │  │  BonusProcessor            ││
//! │  │                │  │                │  │                            ││
//! │  │ • record_sale  │  │ • lookup       │  │ • process_pending_bonuses  ││
//! │  │ • list_sales   │  │ • credit       │  │ • stats                    ││
//! │  │ • get_sale     │  │ • deduct       │  │                            ││
//! │  │                │  │ • pending_view │  │  ▲ BonusScheduler (tokio)  ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  kitshop-db: Database (SQLite pool) + repositories              │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]: `kitshop.toml` plus `KITSHOP_*` environment overrides.

pub mod config;
pub mod error;
pub mod routes;
pub mod scheduler;
pub mod services;

use kitshop_core::BonusPolicy;
use kitshop_db::Database;

// Re-exports
pub use config::AppConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        AppState { db, config }
    }

    /// Accrual rate and delay in effect.
    pub fn policy(&self) -> BonusPolicy {
        self.config.bonus.policy()
    }
}
