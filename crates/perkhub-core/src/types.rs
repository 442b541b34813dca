//! # Domain Types
//!
//! Core domain entities for PerkHub.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Entity Relationships                            │
//! │                                                                         │
//! │  ┌──────────────┐  issues   ┌────────────────┐  redeemed by            │
//! │  │ User         │──────────►│ RedemptionCode │──────────┐              │
//! │  │ (admin)      │           └────────────────┘          │              │
//! │  └──────────────┘                                       ▼              │
//! │                             ┌────────────────┐   ┌──────────────┐      │
//! │                             │ Coupon         │──►│ User         │      │
//! │                             │ (any user)     │   │ (employee)   │      │
//! │                             └────────────────┘   └──────┬───────┘      │
//! │                                                         │ buys         │
//! │  ┌──────────────┐   1:N    ┌─────────────────┐          │              │
//! │  │ Voucher      │─────────►│ VoucherPurchase │◄─────────┘              │
//! │  └──────────────┘          └─────────────────┘                         │
//! │                                                                         │
//! │  Every balance change ──► CoinTransaction (append-only)                │
//! │  Every workflow       ──► ActivityLog     (append-only)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All entities serialize with camelCase field names, which is what the
//! portal frontend consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::coins::Coins;
use crate::error::{CoreError, CoreResult};

// =============================================================================
// User Role
// =============================================================================

/// Role carried by every user and session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Platform operator: catalog, coupons, coin allocation.
    Superadmin,
    /// Issues redemption codes to their company's employees.
    CompanyAdmin,
    /// Redeems codes and buys vouchers.
    Employee,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Superadmin => "superadmin",
            UserRole::CompanyAdmin => "company_admin",
            UserRole::Employee => "employee",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// User
// =============================================================================

/// A portal account.
///
/// `coin_balance` is only ever written by the balance ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,

    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,

    pub role: UserRole,
    pub coin_balance: i64,
    pub company_name: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

impl User {
    #[inline]
    pub fn balance(&self) -> Coins {
        Coins::from_raw(self.coin_balance)
    }
}

// =============================================================================
// Voucher
// =============================================================================

/// A marketplace item purchasable with coins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Voucher {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,

    /// Price in coins. Always positive.
    pub coin_value: i64,

    /// Inactive vouchers are hidden from the catalog and cannot be bought.
    pub is_active: bool,

    #[ts(as = "String")]
    pub expiry_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub image_url: Option<String>,
    pub featured: bool,
    pub brand: Option<String>,

    /// Face value shown next to the coin price, e.g. "$25.00".
    pub original_price: Option<String>,
}

impl Voucher {
    #[inline]
    pub fn price(&self) -> Coins {
        Coins::from_raw(self.coin_value)
    }
}

/// Fields an admin supplies when creating a voucher.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewVoucher {
    pub title: String,
    pub description: String,
    pub category: String,
    pub coin_value: i64,
    /// RFC 3339 timestamp.
    pub expiry_date: String,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub original_price: Option<String>,
}

// =============================================================================
// Coupon
// =============================================================================

/// A fixed-value code any authenticated user may redeem once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub value: i64,
    pub is_used: bool,
    pub redeemed_by: Option<String>,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Redemption Code
// =============================================================================

/// A one-time code issued by an admin to a named employee.
///
/// ## Lifecycle
/// ```text
/// Issued ──(redeem before expires_at)──► Redeemed   (terminal)
///    │
///    └──(now >= expires_at)──► rejected with CodeExpired, stays Issued
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionCode {
    pub id: String,
    pub code: String,
    pub coin_amount: i64,
    pub employee_email: String,
    pub employee_name: String,
    pub company_admin_id: String,
    pub is_redeemed: bool,
    #[ts(as = "Option<String>")]
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_by_id: Option<String>,
    pub redeemed_by_email: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub expires_at: DateTime<Utc>,
    pub email_sent: bool,
    pub email_status: Option<String>,
}

impl RedemptionCode {
    /// A code is expired from `expires_at` onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Fields an admin supplies when issuing a redemption code.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewRedemptionCode {
    pub employee_email: String,
    pub employee_name: String,
    pub coin_amount: i64,
}

// =============================================================================
// Voucher Purchase
// =============================================================================

/// An entitlement created when an employee buys a voucher.
///
/// `is_redeemed` tracks whether the voucher was used at the point of sale,
/// which is separate from having bought it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VoucherPurchase {
    pub id: String,
    pub voucher_id: String,
    pub employee_id: String,
    #[ts(as = "String")]
    pub purchased_at: DateTime<Utc>,
    pub is_redeemed: bool,
    #[ts(as = "Option<String>")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

/// A purchase joined with the voucher it refers to ("My Vouchers").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OwnedVoucher {
    pub purchase_id: String,
    pub voucher_id: String,
    pub title: String,
    pub category: String,
    pub brand: Option<String>,
    pub coin_value: i64,
    pub original_price: Option<String>,
    #[ts(as = "String")]
    pub purchased_at: DateTime<Utc>,
    pub is_redeemed: bool,
    #[ts(as = "Option<String>")]
    pub redeemed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Coin Transaction
// =============================================================================

/// What kind of movement a ledger row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Add,
    Remove,
    Request,
    /// Admin-to-admin allocation (one row covers both sides).
    Approve,
    Purchase,
    RedeemCode,
    Coupon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

/// Append-only audit record of a balance change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CoinTransaction {
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Absolute size of the change; direction follows from the type.
    pub amount: i64,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub description: String,
    pub status: TransactionStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Which way a ledger mutation moves a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Credit,
    Debit,
}

/// Caller-supplied description of a ledger mutation.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub transaction_type: TransactionType,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub description: String,
}

// =============================================================================
// Activity Log
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Login,
    RedeemCode,
    RedeemCoupon,
    VoucherPurchase,
    VoucherUse,
    CodeIssue,
    CouponIssue,
    VoucherCreate,
    VoucherToggle,
    CoinTransfer,
}

/// Append-only record of who did what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub user_id: String,
    pub action: ActivityAction,
    pub details: String,
    #[ts(as = "String")]
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Employee Stats
// =============================================================================

/// Dashboard counters for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeStats {
    pub coin_balance: i64,
    /// Redemption codes addressed to this employee's email that were redeemed.
    pub codes_redeemed: i64,
    pub vouchers_purchased: i64,
    /// Purchases already used at the point of sale.
    pub vouchers_redeemed: i64,
}

// =============================================================================
// Principal
// =============================================================================

/// The authenticated caller, threaded explicitly into every workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub role: UserRole,
    pub email: String,
    pub name: String,
    pub company_name: Option<String>,
}

impl Principal {
    /// Fails with `Unauthorized` unless the principal holds one of `roles`.
    ///
    /// The first role in the list is reported as the requirement.
    pub fn require_any(&self, roles: &[UserRole]) -> CoreResult<()> {
        if roles.contains(&self.role) {
            return Ok(());
        }
        Err(CoreError::Unauthorized {
            required: roles.first().copied().unwrap_or(UserRole::Superadmin),
        })
    }

    /// Shorthand for a single required role.
    pub fn require(&self, role: UserRole) -> CoreResult<()> {
        self.require_any(&[role])
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal {
            id: user.id.clone(),
            role: user.role,
            email: user.email.clone(),
            name: user.name.clone(),
            company_name: user.company_name.clone(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn principal(role: UserRole) -> Principal {
        Principal {
            id: "u1".to_string(),
            role,
            email: "a@b.co".to_string(),
            name: "A".to_string(),
            company_name: None,
        }
    }

    #[test]
    fn test_require_role() {
        let admin = principal(UserRole::CompanyAdmin);
        assert!(admin
            .require_any(&[UserRole::CompanyAdmin, UserRole::Superadmin])
            .is_ok());
        assert!(matches!(
            admin.require(UserRole::Superadmin),
            Err(CoreError::Unauthorized {
                required: UserRole::Superadmin
            })
        ));
    }

    #[test]
    fn test_role_serializes_snake_case() {
        let json = serde_json::to_string(&UserRole::CompanyAdmin).unwrap();
        assert_eq!(json, "\"company_admin\"");
        assert_eq!(UserRole::CompanyAdmin.to_string(), "company_admin");
    }

    #[test]
    fn test_user_json_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: "u1".to_string(),
            name: "Jane".to_string(),
            email: "jane@acme.test".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::Employee,
            coin_balance: 500,
            company_name: Some("Acme".to_string()),
            created_at: now,
            last_updated: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["coinBalance"], 500);
        assert_eq!(json["companyName"], "Acme");
    }

    #[test]
    fn test_transaction_type_field_name() {
        let tx = CoinTransaction {
            id: "t1".to_string(),
            transaction_type: TransactionType::RedeemCode,
            amount: 500,
            from_user_id: Some("admin".to_string()),
            to_user_id: Some("emp".to_string()),
            description: "Redeemed code".to_string(),
            status: TransactionStatus::Completed,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "redeem_code");
        assert_eq!(json["status"], "completed");
    }

    #[test]
    fn test_code_expiry_boundary() {
        let now = Utc::now();
        let code = RedemptionCode {
            id: "r1".to_string(),
            code: "ABCD-EFGH-IJKL-MNOP".to_string(),
            coin_amount: 500,
            employee_email: "e@acme.test".to_string(),
            employee_name: "E".to_string(),
            company_admin_id: "admin".to_string(),
            is_redeemed: false,
            redeemed_at: None,
            redeemed_by_id: None,
            redeemed_by_email: None,
            created_at: now,
            expires_at: now + Duration::days(30),
            email_sent: false,
            email_status: None,
        };
        assert!(!code.is_expired_at(now));
        assert!(code.is_expired_at(now + Duration::days(30)));
    }
}
