//! # Error Types
//!
//! Domain-specific error types for perkhub-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  perkhub-core errors (this file)                                       │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  perkhub-db errors (separate crate)                                    │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  portal-api errors (in app)                                            │
//! │  ├── ServiceError     - Core or Db failure inside a workflow           │
//! │  └── ApiError         - What the browser sees (JSON + status)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → ApiError           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (code, amounts, ids)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to exactly one HTTP status in portal-api

use thiserror::Error;

use crate::types::UserRole;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations in the coin code
/// lifecycle. portal-api translates them to HTTP responses.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// No session was presented (or it failed verification).
    #[error("Not authenticated")]
    Unauthenticated,

    /// A session exists but carries the wrong role.
    #[error("Unauthorized: requires {required}")]
    Unauthorized { required: UserRole },

    /// A referenced record does not exist.
    ///
    /// ## When This Occurs
    /// - Redemption code or coupon was never issued
    /// - Voucher id is unknown or the voucher is inactive
    /// - Purchase id does not belong to the caller
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The user a balance mutation targets does not exist.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The code (or purchase) was already consumed.
    ///
    /// ## User Workflow
    /// ```text
    /// Employee A redeems ABCD-...   Employee B redeems ABCD-...
    ///        │                             │
    ///        ▼                             ▼
    ///   UPDATE ... WHERE is_redeemed = 0   (same statement)
    ///        │                             │
    ///   1 row affected                0 rows affected
    ///        │                             │
    ///        ▼                             ▼
    ///   +500 coins              AlreadyRedeemed { code }
    /// ```
    #[error("{code} has already been redeemed")]
    AlreadyRedeemed { code: String },

    /// The redemption code is past its expiry.
    #[error("{code} has expired")]
    CodeExpired { code: String },

    /// Debit would take the balance below zero.
    #[error("Insufficient coins: available {available}, requested {requested}")]
    InsufficientBalance { available: i64, requested: i64 },

    /// No free code was found within the attempt budget.
    #[error("Could not generate a unique code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    /// A concurrent writer won; the caller may retry.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any transaction is opened.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., bad email, bad date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
