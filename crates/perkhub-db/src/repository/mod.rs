//! # Repository Module
//!
//! Database repository implementations for PerkHub.
//!
//! ## Two Kinds of Methods
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reads and standalone writes        Workflow writes                     │
//! │  ─────────────────────────────      ─────────────────────────────────   │
//! │  &self, uses the pool               &self, conn: &mut SqliteConnection  │
//! │                                                                         │
//! │  db.vouchers().list_active()        let mut tx = db.begin().await?;     │
//! │  db.users().get_by_email(..)        db.coupons().claim(&mut tx, ..)     │
//! │                                     db.users().credit(&mut tx, ..)      │
//! │                                     db.transactions().insert(&mut tx,..)│
//! │                                     Database::commit(tx).await?;        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conditional Updates
//! Every one-shot transition is a single `UPDATE ... WHERE <precondition>`.
//! One row affected means this caller won; zero rows means the precondition
//! did not hold and a follow-up read classifies why ([`ClaimOutcome`],
//! [`DebitOutcome`]).
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Accounts and the balance column
//! - [`voucher::VoucherRepository`] - Marketplace catalog
//! - [`coupon::CouponRepository`] - Fixed-value coupons
//! - [`redemption_code::RedemptionCodeRepository`] - Admin-issued codes
//! - [`purchase::PurchaseRepository`] - Voucher entitlements
//! - [`transaction::TransactionRepository`] - Coin ledger audit rows
//! - [`activity::ActivityRepository`] - Activity log

pub mod activity;
pub mod coupon;
pub mod purchase;
pub mod redemption_code;
pub mod transaction;
pub mod user;
pub mod voucher;

/// Result of a one-shot conditional update (redeem a code, use a purchase).
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimOutcome<T> {
    /// This caller performed the transition; carries the updated record.
    Claimed(T),
    /// No record matches the key.
    NotFound,
    /// The record was already consumed.
    AlreadyClaimed,
    /// The record exists and is unconsumed but past its expiry.
    Expired,
}

impl<T> ClaimOutcome<T> {
    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed(_))
    }
}

/// Result of a guarded balance debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// Debit applied; carries the new balance.
    Applied(i64),
    /// The user does not exist.
    UserMissing,
    /// The balance was below the requested amount.
    Insufficient { available: i64 },
}
