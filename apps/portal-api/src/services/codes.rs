//! Unique code generation.
//!
//! A candidate is drawn, checked against existing codes of the same kind,
//! and redrawn on a hit, at most [`MAX_CODE_ATTEMPTS`] times. The UNIQUE
//! index still has the last word: issuers that lose an insert race call
//! back in here.

use tracing::{debug, warn};

use perkhub_core::code::{generate_code, mask_code, CodeKind};
use perkhub_core::{CoreError, MAX_CODE_ATTEMPTS};
use perkhub_db::Database;

use super::ServiceResult;

/// Generates a code that no record of `kind` currently carries.
pub async fn unique_code(db: &Database, kind: CodeKind) -> ServiceResult<String> {
    unique_code_from(db, kind, || generate_code(&mut rand::rng())).await
}

/// Same as [`unique_code`] with an explicit candidate source.
pub async fn unique_code_from<F>(db: &Database, kind: CodeKind, mut next: F) -> ServiceResult<String>
where
    F: FnMut() -> String + Send,
{
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let candidate = next();
        if !db.code_exists(kind, &candidate).await? {
            return Ok(candidate);
        }
        debug!(
            kind = kind.label(),
            attempt,
            code = %mask_code(&candidate),
            "Code collision, regenerating"
        );
    }

    warn!(kind = kind.label(), attempts = MAX_CODE_ATTEMPTS, "Code space exhausted");
    Err(CoreError::CodeSpaceExhausted {
        attempts: MAX_CODE_ATTEMPTS,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::test_db;
    use crate::services::ServiceError;
    use chrono::Utc;
    use perkhub_core::code::is_well_formed;
    use perkhub_core::Coupon;
    use uuid::Uuid;

    async fn seed_coupon(db: &Database, code: &str) {
        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            value: 50,
            is_used: false,
            redeemed_by: None,
            issued_at: Utc::now(),
            redeemed_at: None,
        };
        db.coupons().insert(&coupon).await.unwrap();
    }

    #[tokio::test]
    async fn test_generated_codes_are_well_formed() {
        let db = test_db().await;
        for _ in 0..50 {
            let code = unique_code(&db, CodeKind::Coupon).await.unwrap();
            assert!(is_well_formed(&code), "{code}");
        }
    }

    #[tokio::test]
    async fn test_collision_is_skipped() {
        let db = test_db().await;
        seed_coupon(&db, "AAAA-AAAA-AAAA-AAAA").await;

        let mut candidates = vec!["BBBB-BBBB-BBBB-BBBB", "AAAA-AAAA-AAAA-AAAA"];
        let code = unique_code_from(&db, CodeKind::Coupon, || {
            candidates.pop().unwrap_or_default().to_string()
        })
        .await
        .unwrap();
        assert_eq!(code, "BBBB-BBBB-BBBB-BBBB");
    }

    #[tokio::test]
    async fn test_uniqueness_is_per_kind() {
        let db = test_db().await;
        seed_coupon(&db, "AAAA-AAAA-AAAA-AAAA").await;

        let code = unique_code_from(&db, CodeKind::RedemptionCode, || {
            "AAAA-AAAA-AAAA-AAAA".to_string()
        })
        .await
        .unwrap();
        assert_eq!(code, "AAAA-AAAA-AAAA-AAAA");
    }

    #[tokio::test]
    async fn test_gives_up_after_attempt_budget() {
        let db = test_db().await;
        seed_coupon(&db, "AAAA-AAAA-AAAA-AAAA").await;

        let mut calls = 0u32;
        let err = unique_code_from(&db, CodeKind::Coupon, || {
            calls += 1;
            "AAAA-AAAA-AAAA-AAAA".to_string()
        })
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Core(CoreError::CodeSpaceExhausted { attempts: 20 })
        ));
        assert_eq!(calls, MAX_CODE_ATTEMPTS);
    }
}
