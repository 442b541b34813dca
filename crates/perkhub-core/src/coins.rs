//! # Coins Module
//!
//! Provides the `Coins` type for the portal's internal currency.
//!
//! ## Why a Newtype?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Coins are whole numbers. There is no fractional coin and no            │
//! │  negative balance.                                                      │
//! │                                                                         │
//! │  users.coin_balance        INTEGER  CHECK (coin_balance >= 0)           │
//! │  coin_transactions.amount  INTEGER  always |delta|, direction by type   │
//! │                                                                         │
//! │  A raw i64 travels through the database layer; everything that          │
//! │  decides whether an amount is acceptable goes through `Coins`.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use perkhub_core::Coins;
//!
//! let price = Coins::positive(250, "coinValue").unwrap();
//! let balance = Coins::from_raw(300);
//!
//! assert!(balance.covers(price));
//! assert_eq!(balance.checked_sub(price), Some(Coins::from_raw(50)));
//! assert_eq!(price.to_string(), "250 coins");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::MAX_COIN_GRANT;

// =============================================================================
// Coins Type
// =============================================================================

/// A non-negative whole number of coins.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Coins(i64);

impl Coins {
    /// Zero coins.
    pub const ZERO: Coins = Coins(0);

    /// Wraps a value read from storage without checking it.
    ///
    /// Storage already enforces non-negativity, so this is for balances and
    /// stored amounts only. Caller-supplied amounts go through
    /// [`Coins::positive`].
    #[inline]
    pub const fn from_raw(value: i64) -> Self {
        Coins(value)
    }

    /// Accepts a caller-supplied amount that must be strictly positive.
    ///
    /// `field` names the input in the resulting error.
    pub fn positive(value: i64, field: &str) -> Result<Self, ValidationError> {
        if value <= 0 {
            return Err(ValidationError::MustBePositive {
                field: field.to_string(),
            });
        }
        Ok(Coins(value))
    }

    /// Like [`Coins::positive`], additionally capped at [`MAX_COIN_GRANT`].
    ///
    /// Used for anything an admin mints: codes, coupons, transfers.
    pub fn grant(value: i64, field: &str) -> Result<Self, ValidationError> {
        if !(1..=MAX_COIN_GRANT).contains(&value) {
            return Err(ValidationError::OutOfRange {
                field: field.to_string(),
                min: 1,
                max: MAX_COIN_GRANT,
            });
        }
        Ok(Coins(value))
    }

    /// Returns the raw amount.
    #[inline]
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// Whether this balance can pay `price`.
    #[inline]
    pub fn covers(&self, price: Coins) -> bool {
        self.0 >= price.0
    }

    /// Subtracts, returning `None` instead of going negative.
    pub fn checked_sub(self, rhs: Coins) -> Option<Coins> {
        match self.0.checked_sub(rhs.0) {
            Some(v) if v >= 0 => Some(Coins(v)),
            _ => None,
        }
    }

    /// Adds, returning `None` on overflow.
    pub fn checked_add(self, rhs: Coins) -> Option<Coins> {
        self.0.checked_add(rhs.0).map(Coins)
    }
}

impl Add for Coins {
    type Output = Coins;

    /// Saturating; balances are far from `i64::MAX` in practice.
    fn add(self, rhs: Coins) -> Coins {
        Coins(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 1 {
            write!(f, "1 coin")
        } else {
            write!(f, "{} coins", self.0)
        }
    }
}

impl From<Coins> for i64 {
    fn from(c: Coins) -> i64 {
        c.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
