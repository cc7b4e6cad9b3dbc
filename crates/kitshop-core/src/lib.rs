//! # kitshop-core: Pure Business Logic for the Kitshop Bonus Ledger
//!
//! This crate holds the rules of the storefront's bonus subsystem as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Kitshop Bonus Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Storefront / Admin (browser)                   │   │
//! │  │     WhatsApp checkout ──► POST /api/sales ──► bonus lookup      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    shop-api (axum)                              │   │
//! │  │    sale recorder, bonus ledger, batch processor, scheduler     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ kitshop-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────────┐   │   │
//! │  │   │  types   │  │  money   │  │  phone   │  │    bonus     │   │   │
//! │  │   │  Sale    │  │  Money   │  │  digits  │  │ BonusPolicy  │   │   │
//! │  │   │ Pending  │  │  accrue  │  │  match   │  │ ledger math  │   │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  kitshop-db (Database Layer)                    │   │
//! │  │            SQLite queries, migrations, repositories             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, PendingBonus, BonusAccount)
//! - [`money`] - Money type with integer arithmetic
//! - [`phone`] - Digit extraction and customer matching
//! - [`bonus`] - Accrual policy, ledger arithmetic, pending-bonus views
//! - [`error`] - Domain error types
//! - [`validation`] - Request input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use kitshop_core::{BonusPolicy, Money};
//!
//! let policy = BonusPolicy::default(); // 3%, 10 days
//! let bonus = policy.compute_bonus(Money::from_tenge(20_000));
//! assert_eq!(bonus.tenge(), 600);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod bonus;
pub mod error;
pub mod money;
pub mod phone;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use bonus::{
    BatchReport, BonusBalance, BonusPolicy, CustomerPending, PendingBonusView, PendingEntry,
    PendingStats,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use phone::PhoneNumber;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Accrual rate used at sale time when nothing is configured (3%).
pub const DEFAULT_ACCRUAL_BPS: u32 = 300;

/// Days between a sale and the moment its bonus may be credited.
pub const DEFAULT_BONUS_DELAY_DAYS: i64 = 10;

/// Maximum line items in one sale.
pub const MAX_SALE_ITEMS: usize = 100;

/// Maximum quantity on one line item.
///
/// Catches typos like 1000 instead of 10 in the admin form.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Page size for list endpoints when the client sends none.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Upper bound for `limit` on list endpoints.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Upper bound for `page` on list endpoints.
///
/// Keeps `(page - 1) * limit` well inside `i64` for every allowed limit.
pub const MAX_PAGE: i64 = 1_000_000;

/// Generates a new entity id (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
