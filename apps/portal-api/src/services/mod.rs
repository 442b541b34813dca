//! # Workflow Services
//!
//! Each service function is one portal operation: it takes the database,
//! an explicit [`Principal`](perkhub_core::Principal) and validated input,
//! opens at most one transaction, and commits it only when every write of
//! the workflow succeeded.
//!
//! ```text
//! routes ──► services ──► perkhub-db repositories ──► SQLite
//!              │
//!              ├── codes      unique code generation
//!              ├── ledger     the only writer of coin_balance
//!              ├── redemption redeem code / coupon
//!              ├── purchase   buy and use vouchers
//!              ├── issuance   issue codes (with email) and coupons
//!              ├── catalog    voucher marketplace
//!              └── stats      employee dashboard reads
//! ```

pub mod catalog;
pub mod codes;
pub mod issuance;
pub mod ledger;
pub mod purchase;
pub mod redemption;
pub mod stats;

use chrono::{DateTime, Utc};
use perkhub_core::{ActivityAction, ActivityLog, CoreError, ValidationError};
use perkhub_db::DbError;
use uuid::Uuid;

/// Errors surfaced by workflow services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(CoreError::Validation(err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Builds an activity entry stamped with `now`.
pub(crate) fn activity(
    user_id: &str,
    action: ActivityAction,
    details: impl Into<String>,
    now: DateTime<Utc>,
) -> ActivityLog {
    ActivityLog {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        action,
        details: details.into(),
        timestamp: now,
    }
}
