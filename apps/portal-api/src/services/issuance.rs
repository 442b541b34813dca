//! # Issuance
//!
//! Admins put coins into circulation by issuing one-shot codes. Issuing
//! moves no coins; value is credited when the code is redeemed.
//!
//! The notification email goes out after the code is stored. Its outcome is
//! recorded on the code and never undoes the issue.

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use perkhub_core::code::{mask_code, CodeKind};
use perkhub_core::validation::{validate_coupon_values, validate_new_redemption_code};
use perkhub_core::{
    ActivityAction, CoreError, Coupon, NewRedemptionCode, Principal, RedemptionCode, UserRole,
    MAX_CODE_ATTEMPTS,
};
use perkhub_db::Database;

use super::{activity, codes, ServiceResult};
use crate::config::PortalConfig;
use crate::mail::{redemption_code_email, Mailer};

/// Batch used when a coupon request names no values.
pub const DEFAULT_COUPON_VALUES: [i64; 10] = [50, 100, 150, 200, 250, 300, 350, 400, 450, 500];

/// Issues a redemption code to an employee and emails it.
pub async fn issue_redemption_code(
    db: &Database,
    mailer: &dyn Mailer,
    config: &PortalConfig,
    principal: &Principal,
    req: &NewRedemptionCode,
) -> ServiceResult<RedemptionCode> {
    principal.require_any(&[UserRole::CompanyAdmin, UserRole::Superadmin])?;
    let amount = validate_new_redemption_code(req)?;
    let now = Utc::now();

    let mut record = RedemptionCode {
        id: Uuid::new_v4().to_string(),
        code: String::new(),
        coin_amount: amount.value(),
        employee_email: req.employee_email.trim().to_lowercase(),
        employee_name: req.employee_name.trim().to_string(),
        company_admin_id: principal.id.clone(),
        is_redeemed: false,
        redeemed_at: None,
        redeemed_by_id: None,
        redeemed_by_email: None,
        created_at: now,
        expires_at: now + Duration::days(config.code_ttl_days),
        email_sent: false,
        email_status: None,
    };

    let mut stored = false;
    for _ in 0..MAX_CODE_ATTEMPTS {
        record.code = codes::unique_code(db, CodeKind::RedemptionCode).await?;
        match db.redemption_codes().insert(&record).await {
            Ok(()) => {
                stored = true;
                break;
            }
            Err(e) if e.is_unique_violation_on("redemption_codes.code") => {
                warn!(code = %mask_code(&record.code), "Lost code insert race, regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }
    if !stored {
        return Err(CoreError::CodeSpaceExhausted {
            attempts: MAX_CODE_ATTEMPTS,
        }
        .into());
    }

    db.activity()
        .record(&activity(
            &principal.id,
            ActivityAction::CodeIssue,
            format!(
                "Issued {} coins to {}",
                record.coin_amount, record.employee_email
            ),
            now,
        ))
        .await?;

    info!(
        admin_id = %principal.id,
        code = %mask_code(&record.code),
        employee = %record.employee_email,
        amount = record.coin_amount,
        "Redemption code issued"
    );

    let company = principal
        .company_name
        .as_deref()
        .unwrap_or(principal.name.as_str());
    let html = redemption_code_email(
        &record.employee_name,
        &record.code,
        record.coin_amount,
        company,
        config.code_ttl_days,
        &config.app_url,
    );
    let outcome = mailer
        .send(
            &record.employee_email,
            &format!("You've received {} coins from {company}", record.coin_amount),
            &html,
        )
        .await;

    if !outcome.success {
        warn!(
            code_id = %record.id,
            reason = %outcome.message,
            "Redemption code email not delivered"
        );
    }
    match db
        .redemption_codes()
        .record_email_status(&record.id, outcome.success, &outcome.message)
        .await
    {
        Ok(()) => {
            record.email_sent = outcome.success;
            record.email_status = Some(outcome.message);
        }
        Err(e) => warn!(code_id = %record.id, error = %e, "Could not record email status"),
    }

    Ok(record)
}

/// Creates one coupon per value. `None` issues [`DEFAULT_COUPON_VALUES`].
pub async fn issue_coupons(
    db: &Database,
    principal: &Principal,
    values: Option<&[i64]>,
) -> ServiceResult<Vec<Coupon>> {
    principal.require(UserRole::Superadmin)?;
    let values = validate_coupon_values(values.unwrap_or(&DEFAULT_COUPON_VALUES))?;
    let now = Utc::now();

    let mut issued = Vec::with_capacity(values.len());
    for value in values {
        let mut coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            code: String::new(),
            value: value.value(),
            is_used: false,
            redeemed_by: None,
            issued_at: now,
            redeemed_at: None,
        };

        let mut stored = false;
        for _ in 0..MAX_CODE_ATTEMPTS {
            coupon.code = codes::unique_code(db, CodeKind::Coupon).await?;
            match db.coupons().insert(&coupon).await {
                Ok(()) => {
                    stored = true;
                    break;
                }
                Err(e) if e.is_unique_violation_on("coupons.code") => {
                    warn!(code = %mask_code(&coupon.code), "Lost code insert race, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        if !stored {
            return Err(CoreError::CodeSpaceExhausted {
                attempts: MAX_CODE_ATTEMPTS,
            }
            .into());
        }
        issued.push(coupon);
    }

    let total: i64 = issued.iter().map(|c| c.value).sum();
    db.activity()
        .record(&activity(
            &principal.id,
            ActivityAction::CouponIssue,
            format!("Issued {} coupons worth {} coins", issued.len(), total),
            now,
        ))
        .await?;

    info!(admin_id = %principal.id, count = issued.len(), total, "Coupons issued");
    Ok(issued)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::testing::RecordingMailer;
    use crate::services::test_support::{balance_of, seed_user, test_db};
    use crate::services::ServiceError;
    use perkhub_core::code::is_well_formed;
    use std::collections::HashSet;

    fn request(email: &str, amount: i64) -> NewRedemptionCode {
        NewRedemptionCode {
            employee_email: email.to_string(),
            employee_name: "Jane Doe".to_string(),
            coin_amount: amount,
        }
    }

    #[tokio::test]
    async fn test_issue_code_and_email() {
        let db = test_db().await;
        let admin = seed_user(&db, "admin@acme.test", UserRole::CompanyAdmin, 0).await;
        let mailer = RecordingMailer::default();
        let config = PortalConfig::default();

        let code = issue_redemption_code(
            &db,
            &mailer,
            &config,
            &admin,
            &request(" Jane@Acme.test ", 500),
        )
        .await
        .unwrap();

        assert!(is_well_formed(&code.code));
        assert_eq!(code.employee_email, "jane@acme.test");
        assert_eq!(code.expires_at - code.created_at, Duration::days(30));
        assert!(code.email_sent);

        let sent = mailer.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jane@acme.test");
        assert!(sent[0].html.contains(&code.code));

        // Issuing does not move coins.
        assert_eq!(balance_of(&db, &admin.id).await, 0);
        assert_eq!(db.transactions().count().await.unwrap(), 0);

        let listed = db.redemption_codes().list_by_admin(&admin.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].email_sent);
    }

    #[tokio::test]
    async fn test_failed_email_keeps_code() {
        let db = test_db().await;
        let admin = seed_user(&db, "admin@acme.test", UserRole::CompanyAdmin, 0).await;
        let mailer = RecordingMailer::failing();

        let code = issue_redemption_code(
            &db,
            &mailer,
            &PortalConfig::default(),
            &admin,
            &request("jane@acme.test", 100),
        )
        .await
        .unwrap();

        assert!(!code.email_sent);
        let stored = db.redemption_codes().get_by_id(&code.id).await.unwrap().unwrap();
        assert!(!stored.is_redeemed);
        assert!(!stored.email_sent);
        assert!(stored
            .email_status
            .as_deref()
            .unwrap()
            .contains("connection refused"));
    }

    #[tokio::test]
    async fn test_issue_code_rejects_bad_input_and_role() {
        let db = test_db().await;
        let admin = seed_user(&db, "admin@acme.test", UserRole::CompanyAdmin, 0).await;
        let emp = seed_user(&db, "jane@acme.test", UserRole::Employee, 0).await;
        let mailer = RecordingMailer::default();
        let config = PortalConfig::default();

        let err = issue_redemption_code(&db, &mailer, &config, &admin, &request("jane@acme.test", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Validation(_))));

        let err = issue_redemption_code(&db, &mailer, &config, &admin, &request("not-an-email", 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Validation(_))));

        let err = issue_redemption_code(&db, &mailer, &config, &emp, &request("jane@acme.test", 10))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::Unauthorized { .. })
        ));

        assert!(mailer.messages().is_empty());
    }

    #[tokio::test]
    async fn test_issue_default_coupon_batch() {
        let db = test_db().await;
        let root = seed_user(&db, "root@perkhub.test", UserRole::Superadmin, 0).await;

        let coupons = issue_coupons(&db, &root, None).await.unwrap();
        assert_eq!(coupons.len(), 10);
        let values: Vec<i64> = coupons.iter().map(|c| c.value).collect();
        assert_eq!(values, DEFAULT_COUPON_VALUES.to_vec());

        let unique: HashSet<&str> = coupons.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(unique.len(), 10);
        assert!(coupons.iter().all(|c| is_well_formed(&c.code) && !c.is_used));
    }

    #[tokio::test]
    async fn test_issue_coupons_validation() {
        let db = test_db().await;
        let root = seed_user(&db, "root@perkhub.test", UserRole::Superadmin, 0).await;
        let admin = seed_user(&db, "admin@acme.test", UserRole::CompanyAdmin, 0).await;

        let err = issue_coupons(&db, &root, Some(&[][..])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Validation(_))));

        let err = issue_coupons(&db, &root, Some(&[100, -5][..])).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Validation(_))));

        let err = issue_coupons(&db, &admin, None).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::Unauthorized { .. })
        ));

        assert!(db.coupons().list_recent(10).await.unwrap().is_empty());
    }
}
