//! # Coupon Repository
//!
//! Fixed-value coupons: created in batches by a superadmin, redeemed once
//! by any authenticated user.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::ClaimOutcome;
use perkhub_core::Coupon;

const COUPON_COLUMNS: &str = "id, code, value, is_used, redeemed_by, issued_at, redeemed_at";

/// Repository for coupon database operations.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Whether a coupon with this code exists.
    pub async fn code_exists(&self, code: &str) -> DbResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM coupons WHERE code = ?1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?1");
        let coupon = sqlx::query_as::<_, Coupon>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(coupon)
    }

    /// Most recently issued coupons first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons ORDER BY issued_at DESC LIMIT ?1");
        let coupons = sqlx::query_as::<_, Coupon>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(coupons)
    }

    /// Inserts a coupon.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation { field: "coupons.code" }` on a code collision.
    pub async fn insert(&self, coupon: &Coupon) -> DbResult<()> {
        debug!(id = %coupon.id, value = coupon.value, "Inserting coupon");

        sqlx::query(
            r#"
            INSERT INTO coupons (id, code, value, is_used, redeemed_by, issued_at, redeemed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(coupon.value)
        .bind(coupon.is_used)
        .bind(&coupon.redeemed_by)
        .bind(coupon.issued_at)
        .bind(coupon.redeemed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Marks an unused coupon as used by `user_id`.
    ///
    /// The `is_used = 0` predicate makes this the only place a coupon can be
    /// consumed; of two concurrent callers exactly one gets `Claimed`.
    pub async fn claim(
        &self,
        conn: &mut SqliteConnection,
        code: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<ClaimOutcome<Coupon>> {
        let sql = format!(
            r#"
            UPDATE coupons
            SET is_used = 1, redeemed_by = ?1, redeemed_at = ?2
            WHERE code = ?3 AND is_used = 0
            RETURNING {COUPON_COLUMNS}
            "#
        );
        let claimed = sqlx::query_as::<_, Coupon>(&sql)
            .bind(user_id)
            .bind(now)
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(coupon) = claimed {
            debug!(coupon_id = %coupon.id, user_id = %user_id, "Coupon claimed");
            return Ok(ClaimOutcome::Claimed(coupon));
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM coupons WHERE code = ?1)")
            .bind(code)
            .fetch_one(&mut *conn)
            .await?;

        Ok(if exists {
            ClaimOutcome::AlreadyClaimed
        } else {
            ClaimOutcome::NotFound
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_coupon, test_db};

    #[tokio::test]
    async fn test_claim_once() {
        let db = test_db().await;
        let coupon = test_coupon("AAAA-BBBB-CCCC-DDDD", 250);
        db.coupons().insert(&coupon).await.unwrap();
        let repo = db.coupons();

        let mut tx = db.begin().await.unwrap();
        let first = repo.claim(&mut tx, &coupon.code, "user-1", Utc::now()).await.unwrap();
        match first {
            ClaimOutcome::Claimed(c) => {
                assert!(c.is_used);
                assert_eq!(c.redeemed_by.as_deref(), Some("user-1"));
                assert!(c.redeemed_at.is_some());
            }
            other => panic!("expected claim, got {other:?}"),
        }

        let second = repo.claim(&mut tx, &coupon.code, "user-2", Utc::now()).await.unwrap();
        assert_eq!(second, ClaimOutcome::AlreadyClaimed);

        let missing = repo.claim(&mut tx, "ZZZZ-ZZZZ-ZZZZ-ZZZZ", "user-2", Utc::now()).await.unwrap();
        assert_eq!(missing, ClaimOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        db.coupons().insert(&test_coupon("AAAA-BBBB-CCCC-DDDD", 50)).await.unwrap();

        assert!(db.coupons().code_exists("AAAA-BBBB-CCCC-DDDD").await.unwrap());
        assert!(!db.coupons().code_exists("AAAA-BBBB-CCCC-DDDE").await.unwrap());

        let err = db
            .coupons()
            .insert(&test_coupon("AAAA-BBBB-CCCC-DDDD", 100))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation_on("coupons.code"));
    }
}
