//! # Repository Module
//!
//! Database repository implementations for the kitshop bonus ledger.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Single statement: method on the repository (uses the pool)            │
//! │                                                                         │
//! │      db.bonuses().lookup_by_phone(phone, now).await?                   │
//! │                                                                         │
//! │  Part of a larger unit of work: `*_in` associated function taking      │
//! │  `&mut SqliteConnection`, called with an open transaction               │
//! │                                                                         │
//! │      let mut tx = db.pool().begin().await?;                            │
//! │      ProductRepository::decrement_stock_in(&mut tx, id, qty, now)?;    │
//! │      SaleRepository::insert_in(&mut tx, &sale)?;                       │
//! │      PendingBonusRepository::insert_in(&mut tx, &pending)?;            │
//! │      tx.commit().await?;                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - product lookup and stock decrement
//! - [`SaleRepository`](sale::SaleRepository) - sales with item snapshots
//! - [`PendingBonusRepository`](pending_bonus::PendingBonusRepository) - deferred accruals
//! - [`BonusRepository`](bonus::BonusRepository) - per-customer ledger

pub mod bonus;
pub mod pending_bonus;
pub mod product;
pub mod sale;
