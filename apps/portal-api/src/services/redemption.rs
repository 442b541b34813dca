//! # Redemption Workflow
//!
//! Turns a one-shot code into coins. The conditional update that marks the
//! code consumed runs first in the transaction; the credit, the ledger row
//! and the activity entry follow in the same transaction, so either all of
//! them land or the code stays redeemable.
//!
//! ```text
//! Issued ──redeem──► Redeemed (terminal)
//! ```

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use perkhub_core::code::{mask_code, normalize_code};
use perkhub_core::validation::validate_text;
use perkhub_core::{
    ActivityAction, CoreError, Direction, LedgerEntry, Principal, TransactionType, UserRole,
    SYSTEM_USER_ID,
};
use perkhub_db::{ClaimOutcome, Database};

use super::{activity, ledger, ServiceResult};

const MAX_CODE_INPUT_LEN: usize = 64;

/// Result of a successful redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionReceipt {
    pub coin_amount: i64,
    pub new_balance: i64,
}

/// Redeems an admin-issued redemption code for the calling employee.
pub async fn redeem_code(
    db: &Database,
    principal: &Principal,
    raw_code: &str,
) -> ServiceResult<RedemptionReceipt> {
    principal.require(UserRole::Employee)?;
    validate_text("code", raw_code, MAX_CODE_INPUT_LEN)?;
    let code = normalize_code(raw_code);
    let now = Utc::now();

    debug!(code = %code, user_id = %principal.id, "Redeeming redemption code");

    let mut tx = db.begin().await?;

    let claimed = match db
        .redemption_codes()
        .claim(&mut tx, &code, &principal.id, &principal.email, now)
        .await?
    {
        ClaimOutcome::Claimed(claimed) => claimed,
        ClaimOutcome::NotFound => return Err(CoreError::not_found("Redemption code", code).into()),
        ClaimOutcome::AlreadyClaimed => return Err(CoreError::AlreadyRedeemed { code }.into()),
        ClaimOutcome::Expired => return Err(CoreError::CodeExpired { code }.into()),
    };

    let entry = LedgerEntry {
        transaction_type: TransactionType::RedeemCode,
        from_user_id: Some(claimed.company_admin_id.clone()),
        to_user_id: Some(principal.id.clone()),
        description: format!("Redemption code {} redeemed", claimed.code),
    };
    let new_balance = ledger::apply_delta(
        db,
        &mut tx,
        &principal.id,
        claimed.coin_amount,
        Direction::Credit,
        entry,
        now,
    )
    .await?;

    db.activity()
        .insert(
            &mut tx,
            &activity(
                &principal.id,
                ActivityAction::RedeemCode,
                format!(
                    "Redeemed code {} for {} coins",
                    mask_code(&claimed.code),
                    claimed.coin_amount
                ),
                now,
            ),
        )
        .await?;

    Database::commit(tx).await?;

    info!(
        user_id = %principal.id,
        code = %mask_code(&claimed.code),
        amount = claimed.coin_amount,
        new_balance,
        "Redemption code redeemed"
    );
    Ok(RedemptionReceipt {
        coin_amount: claimed.coin_amount,
        new_balance,
    })
}

/// Redeems a fixed-value coupon for any signed-in user.
pub async fn redeem_coupon(
    db: &Database,
    principal: Option<&Principal>,
    raw_code: &str,
) -> ServiceResult<RedemptionReceipt> {
    let principal = principal.ok_or(CoreError::Unauthenticated)?;
    validate_text("code", raw_code, MAX_CODE_INPUT_LEN)?;
    let code = normalize_code(raw_code);
    let now = Utc::now();

    debug!(code = %code, user_id = %principal.id, "Redeeming coupon");

    let mut tx = db.begin().await?;

    let coupon = match db.coupons().claim(&mut tx, &code, &principal.id, now).await? {
        ClaimOutcome::Claimed(coupon) => coupon,
        ClaimOutcome::NotFound => return Err(CoreError::not_found("Coupon", code).into()),
        ClaimOutcome::AlreadyClaimed | ClaimOutcome::Expired => {
            return Err(CoreError::AlreadyRedeemed { code }.into())
        }
    };

    let entry = LedgerEntry {
        transaction_type: TransactionType::Coupon,
        from_user_id: Some(SYSTEM_USER_ID.to_string()),
        to_user_id: Some(principal.id.clone()),
        description: format!("Coupon code {} redeemed", coupon.code),
    };
    let new_balance = ledger::apply_delta(
        db,
        &mut tx,
        &principal.id,
        coupon.value,
        Direction::Credit,
        entry,
        now,
    )
    .await?;

    db.activity()
        .insert(
            &mut tx,
            &activity(
                &principal.id,
                ActivityAction::RedeemCoupon,
                format!(
                    "Redeemed coupon {} for {} coins",
                    mask_code(&coupon.code),
                    coupon.value
                ),
                now,
            ),
        )
        .await?;

    Database::commit(tx).await?;

    info!(
        user_id = %principal.id,
        code = %mask_code(&coupon.code),
        amount = coupon.value,
        new_balance,
        "Coupon redeemed"
    );
    Ok(RedemptionReceipt {
        coin_amount: coupon.value,
        new_balance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{balance_of, seed_user, test_db};
    use crate::services::ServiceError;
    use chrono::Duration;
    use perkhub_core::{Coupon, RedemptionCode, TransactionStatus};
    use uuid::Uuid;

    async fn seed_code(db: &Database, admin_id: &str, email: &str, code: &str, amount: i64) {
        let now = Utc::now();
        let record = RedemptionCode {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            coin_amount: amount,
            employee_email: email.to_string(),
            employee_name: "Jane".to_string(),
            company_admin_id: admin_id.to_string(),
            is_redeemed: false,
            redeemed_at: None,
            redeemed_by_id: None,
            redeemed_by_email: None,
            created_at: now,
            expires_at: now + Duration::days(30),
            email_sent: false,
            email_status: None,
        };
        db.redemption_codes().insert(&record).await.unwrap();
    }

    async fn seed_coupon(db: &Database, code: &str, value: i64) {
        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            value,
            is_used: false,
            redeemed_by: None,
            issued_at: Utc::now(),
            redeemed_at: None,
        };
        db.coupons().insert(&coupon).await.unwrap();
    }

    #[tokio::test]
    async fn test_redeem_500_coin_code() {
        let db = test_db().await;
        let admin = seed_user(&db, "admin@acme.test", UserRole::CompanyAdmin, 0).await;
        let emp = seed_user(&db, "jane@acme.test", UserRole::Employee, 0).await;
        seed_code(&db, &admin.id, &emp.email, "ABCD-EFGH-IJKL-MNOP", 500).await;

        // Lowercase, undashed input is normalised.
        let receipt = redeem_code(&db, &emp, " abcdefghijklmnop ").await.unwrap();
        assert_eq!(
            receipt,
            RedemptionReceipt {
                coin_amount: 500,
                new_balance: 500
            }
        );
        assert_eq!(balance_of(&db, &emp.id).await, 500);

        let rows = db
            .transactions()
            .list_for_user_by_type(&emp.id, TransactionType::RedeemCode)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 500);
        assert_eq!(rows[0].status, TransactionStatus::Completed);
        assert_eq!(rows[0].from_user_id.as_deref(), Some(admin.id.as_str()));

        let log = db.activity().list_for_user(&emp.id, 10).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].action, ActivityAction::RedeemCode);
    }

    #[tokio::test]
    async fn test_redeem_code_twice() {
        let db = test_db().await;
        let admin = seed_user(&db, "admin@acme.test", UserRole::CompanyAdmin, 0).await;
        let emp = seed_user(&db, "jane@acme.test", UserRole::Employee, 0).await;
        seed_code(&db, &admin.id, &emp.email, "ABCD-EFGH-IJKL-MNOP", 200).await;

        redeem_code(&db, &emp, "ABCD-EFGH-IJKL-MNOP").await.unwrap();
        let err = redeem_code(&db, &emp, "ABCD-EFGH-IJKL-MNOP")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Core(CoreError::AlreadyRedeemed { .. })
        ));
        assert_eq!(balance_of(&db, &emp.id).await, 200);
        assert_eq!(db.transactions().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_redemptions_credit_once() {
        let db = test_db().await;
        let admin = seed_user(&db, "admin@acme.test", UserRole::CompanyAdmin, 0).await;
        let emp = seed_user(&db, "jane@acme.test", UserRole::Employee, 0).await;
        seed_code(&db, &admin.id, &emp.email, "RACE-RACE-RACE-RACE", 300).await;

        let (a, b) = tokio::join!(
            redeem_code(&db, &emp, "RACE-RACE-RACE-RACE"),
            redeem_code(&db, &emp, "RACE-RACE-RACE-RACE"),
        );

        let outcomes = [a, b];
        let wins = outcomes.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(ServiceError::Core(CoreError::AlreadyRedeemed { .. }))
        )));
        assert_eq!(balance_of(&db, &emp.id).await, 300);
        assert_eq!(db.transactions().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_code_credits_nothing() {
        let db = test_db().await;
        let admin = seed_user(&db, "admin@acme.test", UserRole::CompanyAdmin, 0).await;
        let emp = seed_user(&db, "jane@acme.test", UserRole::Employee, 0).await;

        let now = Utc::now();
        let stale = RedemptionCode {
            id: Uuid::new_v4().to_string(),
            code: "OLDX-OLDX-OLDX-OLDX".to_string(),
            coin_amount: 100,
            employee_email: emp.email.clone(),
            employee_name: "Jane".to_string(),
            company_admin_id: admin.id.clone(),
            is_redeemed: false,
            redeemed_at: None,
            redeemed_by_id: None,
            redeemed_by_email: None,
            created_at: now - Duration::days(31),
            expires_at: now - Duration::days(1),
            email_sent: true,
            email_status: None,
        };
        db.redemption_codes().insert(&stale).await.unwrap();

        let err = redeem_code(&db, &emp, "OLDX-OLDX-OLDX-OLDX")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::CodeExpired { .. })));
        assert_eq!(balance_of(&db, &emp.id).await, 0);
        assert_eq!(db.transactions().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_code_and_role() {
        let db = test_db().await;
        let emp = seed_user(&db, "jane@acme.test", UserRole::Employee, 0).await;
        let admin = seed_user(&db, "admin@acme.test", UserRole::CompanyAdmin, 0).await;

        let err = redeem_code(&db, &emp, "NOPE-NOPE-NOPE-NOPE").await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::NotFound { .. })));

        let err = redeem_code(&db, &emp, "   ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Validation(_))));

        let err = redeem_code(&db, &admin, "NOPE-NOPE-NOPE-NOPE").await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::Unauthorized { .. })
        ));
    }

    #[tokio::test]
    async fn test_coupon_redeemed_by_two_users() {
        let db = test_db().await;
        let first = seed_user(&db, "jane@acme.test", UserRole::Employee, 0).await;
        let second = seed_user(&db, "john@acme.test", UserRole::Employee, 0).await;
        seed_coupon(&db, "WXYZ-2345-WXYZ-2345", 250).await;

        let receipt = redeem_coupon(&db, Some(&first), "WXYZ-2345-WXYZ-2345")
            .await
            .unwrap();
        assert_eq!(receipt.new_balance, 250);

        let err = redeem_coupon(&db, Some(&second), "WXYZ-2345-WXYZ-2345")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::AlreadyRedeemed { .. })
        ));
        assert_eq!(balance_of(&db, &second.id).await, 0);

        let rows = db
            .transactions()
            .list_for_user_by_type(&first.id, TransactionType::Coupon)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].from_user_id.as_deref(), Some(SYSTEM_USER_ID));
    }

    #[tokio::test]
    async fn test_coupon_requires_session() {
        let db = test_db().await;
        seed_coupon(&db, "WXYZ-2345-WXYZ-2345", 250).await;

        let err = redeem_coupon(&db, None, "WXYZ-2345-WXYZ-2345")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Unauthenticated)));

        let coupon = db.coupons().get_by_code("WXYZ-2345-WXYZ-2345").await.unwrap().unwrap();
        assert!(!coupon.is_used);
    }

    #[tokio::test]
    async fn test_coupon_rolls_back_when_credit_fails() {
        let db = test_db().await;
        seed_coupon(&db, "WXYZ-2345-WXYZ-2345", 250).await;

        // A principal whose user row no longer exists.
        let ghost = Principal {
            id: "ghost".to_string(),
            role: UserRole::Employee,
            email: "ghost@acme.test".to_string(),
            name: "Ghost".to_string(),
            company_name: None,
        };

        let err = redeem_coupon(&db, Some(&ghost), "WXYZ-2345-WXYZ-2345")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::UserNotFound(_))));

        let coupon = db.coupons().get_by_code("WXYZ-2345-WXYZ-2345").await.unwrap().unwrap();
        assert!(!coupon.is_used);
        assert_eq!(db.transactions().count().await.unwrap(), 0);
    }
}
