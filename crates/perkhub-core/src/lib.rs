//! # perkhub-core: Pure Business Logic for PerkHub
//!
//! This crate is the **heart** of PerkHub. It contains the domain types and
//! the business rules of the coin code lifecycle as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PerkHub Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Portal Frontend                              │   │
//! │  │    Redeem Code ──► Marketplace ──► My Vouchers ──► Admin       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    portal-api (axum)                            │   │
//! │  │    routes ──► services (ledger, redemption, purchase)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ perkhub-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   coins   │  │   code    │  │ validation│  │   │
//! │  │   │   User    │  │   Coins   │  │ generate  │  │   rules   │  │   │
//! │  │   │  Coupon   │  │  checked  │  │ normalize │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    perkhub-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (User, Voucher, Coupon, RedemptionCode, ...)
//! - [`coins`] - `Coins` amount type with checked arithmetic
//! - [`code`] - Redemption/coupon code format, generation and normalisation
//! - [`catalog`] - Voucher marketplace filtering
//! - [`credentials`] - Password hashing
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use perkhub_core::code::{generate_code, is_well_formed, normalize_code};
//!
//! let code = generate_code(&mut rand::rng());
//! assert!(is_well_formed(&code));
//!
//! // Users type codes however they like
//! assert_eq!(normalize_code(" abcd efgh-ijkl mnop "), "ABCD-EFGH-IJKL-MNOP");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod code;
pub mod coins;
pub mod credentials;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use coins::Coins;
pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Counterparty recorded on ledger entries that mint coins (coupons).
pub const SYSTEM_USER_ID: &str = "system";

/// Upper bound on regenerate-and-recheck rounds when issuing a code.
///
/// The keyspace is 36^16, so hitting this bound means something is wrong
/// with the random source or the store, not bad luck.
pub const MAX_CODE_ATTEMPTS: u32 = 20;

/// Days until a freshly issued redemption code expires.
pub const REDEMPTION_CODE_TTL_DAYS: i64 = 30;

/// Largest amount a single code, coupon or transfer may carry.
pub const MAX_COIN_GRANT: i64 = 1_000_000;

/// Maximum number of coupons created by one batch request.
pub const MAX_COUPON_BATCH: usize = 100;
