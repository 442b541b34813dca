//! # Redemption Code Repository
//!
//! Admin-issued one-time codes.
//!
//! ## Claim
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE redemption_codes                                               │
//! │     SET is_redeemed = 1, redeemed_at, redeemed_by_id, redeemed_by_email│
//! │   WHERE code = ? AND is_redeemed = 0 AND expires_at > now              │
//! │   RETURNING *                                                          │
//! │        │                                                                │
//! │        ├── 1 row  ──► Claimed(code)                                    │
//! │        └── 0 rows ──► SELECT is_redeemed WHERE code = ?                │
//! │                          ├── no row      ──► NotFound                  │
//! │                          ├── redeemed    ──► AlreadyClaimed            │
//! │                          └── not redeemed ─► Expired                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::ClaimOutcome;
use perkhub_core::RedemptionCode;

const CODE_COLUMNS: &str = "id, code, coin_amount, employee_email, employee_name, \
     company_admin_id, is_redeemed, redeemed_at, redeemed_by_id, redeemed_by_email, \
     created_at, expires_at, email_sent, email_status";

/// Repository for redemption code database operations.
#[derive(Debug, Clone)]
pub struct RedemptionCodeRepository {
    pool: SqlitePool,
}

impl RedemptionCodeRepository {
    /// Creates a new RedemptionCodeRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RedemptionCodeRepository { pool }
    }

    /// Whether a redemption code with this value exists.
    pub async fn code_exists(&self, code: &str) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM redemption_codes WHERE code = ?1)")
                .bind(code)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RedemptionCode>> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM redemption_codes WHERE id = ?1");
        let code = sqlx::query_as::<_, RedemptionCode>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(code)
    }

    /// Codes issued by one admin, newest first.
    pub async fn list_by_admin(&self, admin_id: &str) -> DbResult<Vec<RedemptionCode>> {
        let sql = format!(
            "SELECT {CODE_COLUMNS} FROM redemption_codes \
             WHERE company_admin_id = ?1 ORDER BY created_at DESC"
        );
        let codes = sqlx::query_as::<_, RedemptionCode>(&sql)
            .bind(admin_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(codes)
    }

    /// Every code, newest first (superadmin view).
    pub async fn list_all(&self) -> DbResult<Vec<RedemptionCode>> {
        let sql = format!("SELECT {CODE_COLUMNS} FROM redemption_codes ORDER BY created_at DESC");
        let codes = sqlx::query_as::<_, RedemptionCode>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(codes)
    }

    /// Number of redeemed codes addressed to `email`.
    pub async fn count_redeemed_for_email(&self, email: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM redemption_codes WHERE employee_email = ?1 AND is_redeemed = 1",
        )
        .bind(email.trim().to_lowercase())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Inserts a new code.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation { field: "redemption_codes.code" }` on collision.
    pub async fn insert(&self, code: &RedemptionCode) -> DbResult<()> {
        debug!(id = %code.id, amount = code.coin_amount, "Inserting redemption code");

        sqlx::query(
            r#"
            INSERT INTO redemption_codes (
                id, code, coin_amount, employee_email, employee_name,
                company_admin_id, is_redeemed, redeemed_at, redeemed_by_id,
                redeemed_by_email, created_at, expires_at, email_sent, email_status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&code.id)
        .bind(&code.code)
        .bind(code.coin_amount)
        .bind(code.employee_email.trim().to_lowercase())
        .bind(&code.employee_name)
        .bind(&code.company_admin_id)
        .bind(code.is_redeemed)
        .bind(code.redeemed_at)
        .bind(&code.redeemed_by_id)
        .bind(&code.redeemed_by_email)
        .bind(code.created_at)
        .bind(code.expires_at)
        .bind(code.email_sent)
        .bind(&code.email_status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records the delivery result of the notification email.
    pub async fn record_email_status(
        &self,
        id: &str,
        sent: bool,
        status: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE redemption_codes SET email_sent = ?1, email_status = ?2 WHERE id = ?3",
        )
        .bind(sent)
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Redemption code", id));
        }
        Ok(())
    }

    /// Redeems an unredeemed, unexpired code for the given user.
    pub async fn claim(
        &self,
        conn: &mut SqliteConnection,
        code: &str,
        user_id: &str,
        user_email: &str,
        now: DateTime<Utc>,
    ) -> DbResult<ClaimOutcome<RedemptionCode>> {
        let sql = format!(
            r#"
            UPDATE redemption_codes
            SET is_redeemed = 1, redeemed_at = ?1, redeemed_by_id = ?2, redeemed_by_email = ?3
            WHERE code = ?4 AND is_redeemed = 0 AND expires_at > ?1
            RETURNING {CODE_COLUMNS}
            "#
        );
        let claimed = sqlx::query_as::<_, RedemptionCode>(&sql)
            .bind(now)
            .bind(user_id)
            .bind(user_email)
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(claimed) = claimed {
            debug!(code_id = %claimed.id, user_id = %user_id, "Redemption code claimed");
            return Ok(ClaimOutcome::Claimed(claimed));
        }

        let redeemed: Option<bool> =
            sqlx::query_scalar("SELECT is_redeemed FROM redemption_codes WHERE code = ?1")
                .bind(code)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(match redeemed {
            None => ClaimOutcome::NotFound,
            Some(true) => ClaimOutcome::AlreadyClaimed,
            Some(false) => ClaimOutcome::Expired,
        })
    }
}
