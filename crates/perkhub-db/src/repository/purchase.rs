//! # Purchase Repository
//!
//! Voucher entitlements. A purchase row is written inside the purchase
//! transaction (after the debit) and flipped to redeemed exactly once when
//! the voucher is used.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::ClaimOutcome;
use perkhub_core::{OwnedVoucher, VoucherPurchase};

const PURCHASE_COLUMNS: &str =
    "id, voucher_id, employee_id, purchased_at, is_redeemed, redeemed_at";

/// Repository for voucher purchase database operations.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<VoucherPurchase>> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM voucher_purchases WHERE id = ?1");
        let purchase = sqlx::query_as::<_, VoucherPurchase>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(purchase)
    }

    /// An employee's purchases joined with voucher details, newest first.
    pub async fn list_owned(&self, employee_id: &str) -> DbResult<Vec<OwnedVoucher>> {
        let owned = sqlx::query_as::<_, OwnedVoucher>(
            r#"
            SELECT
                p.id AS purchase_id,
                p.voucher_id,
                v.title,
                v.category,
                v.brand,
                v.coin_value,
                v.original_price,
                p.purchased_at,
                p.is_redeemed,
                p.redeemed_at
            FROM voucher_purchases p
            INNER JOIN vouchers v ON v.id = p.voucher_id
            WHERE p.employee_id = ?1
            ORDER BY p.purchased_at DESC
            "#,
        )
        .bind(employee_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(owned)
    }

    /// `(purchased, redeemed)` counts for one employee.
    pub async fn counts_for_employee(&self, employee_id: &str) -> DbResult<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(is_redeemed), 0)
            FROM voucher_purchases
            WHERE employee_id = ?1
            "#,
        )
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    /// Inserts a purchase inside the purchase transaction.
    pub async fn insert(
        &self,
        conn: &mut SqliteConnection,
        purchase: &VoucherPurchase,
    ) -> DbResult<()> {
        debug!(
            id = %purchase.id,
            voucher_id = %purchase.voucher_id,
            employee_id = %purchase.employee_id,
            "Inserting voucher purchase"
        );

        sqlx::query(
            r#"
            INSERT INTO voucher_purchases (
                id, voucher_id, employee_id, purchased_at, is_redeemed, redeemed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.voucher_id)
        .bind(&purchase.employee_id)
        .bind(purchase.purchased_at)
        .bind(purchase.is_redeemed)
        .bind(purchase.redeemed_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Marks an owned, unused purchase as used.
    ///
    /// Purchases owned by someone else report `NotFound`.
    pub async fn mark_used(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        employee_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<ClaimOutcome<VoucherPurchase>> {
        let sql = format!(
            r#"
            UPDATE voucher_purchases
            SET is_redeemed = 1, redeemed_at = ?1
            WHERE id = ?2 AND employee_id = ?3 AND is_redeemed = 0
            RETURNING {PURCHASE_COLUMNS}
            "#
        );
        let used = sqlx::query_as::<_, VoucherPurchase>(&sql)
            .bind(now)
            .bind(id)
            .bind(employee_id)
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(purchase) = used {
            return Ok(ClaimOutcome::Claimed(purchase));
        }

        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM voucher_purchases WHERE id = ?1 AND employee_id = ?2)",
        )
        .bind(id)
        .bind(employee_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(if owned {
            ClaimOutcome::AlreadyClaimed
        } else {
            ClaimOutcome::NotFound
        })
    }
}
