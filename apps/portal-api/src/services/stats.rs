//! Employee dashboard reads.

use perkhub_core::{
    CoinTransaction, CoreError, EmployeeStats, OwnedVoucher, Principal, UserRole,
};
use perkhub_db::Database;

use super::ServiceResult;

/// Largest page of ledger rows returned to a client.
pub const MAX_TRANSACTION_PAGE: u32 = 100;

pub async fn employee_stats(db: &Database, principal: &Principal) -> ServiceResult<EmployeeStats> {
    principal.require(UserRole::Employee)?;

    let coin_balance = db
        .users()
        .balance(&principal.id)
        .await?
        .ok_or_else(|| CoreError::UserNotFound(principal.id.clone()))?;
    let codes_redeemed = db
        .redemption_codes()
        .count_redeemed_for_email(&principal.email)
        .await?;
    let (vouchers_purchased, vouchers_redeemed) =
        db.purchases().counts_for_employee(&principal.id).await?;

    Ok(EmployeeStats {
        coin_balance,
        codes_redeemed,
        vouchers_purchased,
        vouchers_redeemed,
    })
}

pub async fn my_purchases(db: &Database, principal: &Principal) -> ServiceResult<Vec<OwnedVoucher>> {
    principal.require(UserRole::Employee)?;
    Ok(db.purchases().list_owned(&principal.id).await?)
}

/// Newest ledger rows touching the caller, at most [`MAX_TRANSACTION_PAGE`].
pub async fn my_transactions(
    db: &Database,
    principal: &Principal,
    limit: Option<u32>,
) -> ServiceResult<Vec<CoinTransaction>> {
    principal.require(UserRole::Employee)?;
    let limit = limit.unwrap_or(50).clamp(1, MAX_TRANSACTION_PAGE);
    Ok(db.transactions().list_for_user(&principal.id, limit).await?)
}
