//! # Validation Module
//!
//! Input validation for PerkHub workflows.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: axum extractors (portal-api)                                 │
//! │  └── JSON shape, required fields present                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Business rules: amounts, emails, lengths, dates                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── UNIQUE (users.email, coupons.code, redemption_codes.code)        │
//! │  └── CHECK (coin_balance >= 0)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validators run before a transaction is opened, so a rejected request
//! never touches the database.

use chrono::{DateTime, Utc};

use crate::coins::Coins;
use crate::error::ValidationError;
use crate::types::{NewRedemptionCode, NewVoucher};
use crate::MAX_COUPON_BATCH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 254;
const MAX_TITLE_LEN: usize = 120;
const MAX_DESCRIPTION_LEN: usize = 2_000;
const MAX_CATEGORY_LEN: usize = 50;

// =============================================================================
// String Validators
// =============================================================================

/// Non-empty after trimming and at most `max` characters.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Required, at most 254 characters
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot that is neither first nor last
/// - No whitespace
///
/// ## Example
/// ```rust
/// use perkhub_core::validation::validate_email;
///
/// assert!(validate_email("employeeEmail", "jane@acme.com").is_ok());
/// assert!(validate_email("employeeEmail", "jane@acme").is_err());
/// ```
pub fn validate_email(field: &str, email: &str) -> ValidationResult<()> {
    validate_text(field, email, MAX_EMAIL_LEN)?;
    let email = email.trim();

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("must contain @"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must be name@domain"));
    }

    match domain.find('.') {
        Some(dot) if dot > 0 && !domain.ends_with('.') => Ok(()),
        _ => Err(invalid("domain must contain a dot")),
    }
}

/// Validates an RFC 3339 timestamp and returns it in UTC.
pub fn parse_timestamp(field: &str, value: &str) -> ValidationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates an issuance request and returns the granted amount.
pub fn validate_new_redemption_code(req: &NewRedemptionCode) -> ValidationResult<Coins> {
    validate_email("employeeEmail", &req.employee_email)?;
    validate_text("employeeName", &req.employee_name, MAX_NAME_LEN)?;
    Coins::grant(req.coin_amount, "coinAmount")
}

/// Validates a voucher creation request and returns its parsed expiry.
pub fn validate_new_voucher(req: &NewVoucher) -> ValidationResult<DateTime<Utc>> {
    validate_text("title", &req.title, MAX_TITLE_LEN)?;
    validate_text("description", &req.description, MAX_DESCRIPTION_LEN)?;
    validate_text("category", &req.category, MAX_CATEGORY_LEN)?;
    Coins::positive(req.coin_value, "coinValue")?;
    parse_timestamp("expiryDate", &req.expiry_date)
}

/// Validates a coupon batch: 1..=100 values, each a valid grant.
pub fn validate_coupon_values(values: &[i64]) -> ValidationResult<Vec<Coins>> {
    if values.is_empty() {
        return Err(ValidationError::Required {
            field: "values".to_string(),
        });
    }
    if values.len() > MAX_COUPON_BATCH {
        return Err(ValidationError::OutOfRange {
            field: "values".to_string(),
            min: 1,
            max: MAX_COUPON_BATCH as i64,
        });
    }
    values.iter().map(|v| Coins::grant(*v, "value")).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
