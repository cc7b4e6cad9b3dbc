//! # kitshop-db: Database Layer for the Kitshop Bonus Ledger
//!
//! SQLite storage for products, sales, pending bonuses and the bonus
//! ledger, using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kitshop Data Flow                                │
//! │                                                                         │
//! │  shop-api service (record_sale, process_pending_bonuses, ...)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   kitshop-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌─────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories   │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                 │   │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo     │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo        │   │ 001_initial_ │  │   │
//! │  │   │ lifecycle     │    │ PendingBonusRepo│   │   schema.sql │  │   │
//! │  │   │               │    │ BonusRepo       │   │              │  │   │
//! │  │   └───────────────┘    └─────────────────┘   └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kitshop_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./kitshop.db")).await?;
//!
//! let account = db.bonuses().lookup_by_phone("+7 (777) 123-12-12", Utc::now()).await?;
//! println!("available: {}", account.available_bonuses);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bonus::BonusRepository;
pub use repository::pending_bonus::PendingBonusRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::{SalePage, SaleRepository};
