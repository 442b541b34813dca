//! # perkhub-db: Database Layer for PerkHub
//!
//! This crate provides database access for PerkHub. It uses SQLite with
//! sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PerkHub Data Flow                                │
//! │                                                                         │
//! │  portal-api service (redeem code, purchase voucher, ...)               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     perkhub-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ UserRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ CouponRepo    │    │ 001_initial_ │  │   │
//! │  │   │ begin/commit  │    │ VoucherRepo   │    │   schema.sql │  │   │
//! │  │   │               │    │ ...           │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  │   ./data/perkhub.db                                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration and transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use perkhub_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/perkhub.db")).await?;
//!
//! let vouchers = db.vouchers().list_active().await?;
//!
//! let mut tx = db.begin().await?;
//! let outcome = db.coupons().claim(&mut tx, "ABCD-EFGH-IJKL-MNOP", &user_id, now).await?;
//! Database::commit(tx).await?;
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
pub use pool::{Database, DbConfig, DbTransaction};
pub use repository::{ClaimOutcome, DebitOutcome};

// Repository re-exports for convenience
pub use repository::activity::ActivityRepository;
pub use repository::coupon::CouponRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::redemption_code::RedemptionCodeRepository;
pub use repository::transaction::TransactionRepository;
pub use repository::user::UserRepository;
pub use repository::voucher::VoucherRepository;

// =============================================================================
// Test Fixtures
// =============================================================================
