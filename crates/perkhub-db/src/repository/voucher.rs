//! # Voucher Repository
//!
//! Marketplace catalog storage. Filtering by search term, category and
//! price band is done in `perkhub_core::catalog` over [`list_active`].
//!
//! [`list_active`]: VoucherRepository::list_active

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use perkhub_core::Voucher;

const VOUCHER_COLUMNS: &str = "id, title, description, category, coin_value, is_active, \
     expiry_date, created_at, created_by, image_url, featured, brand, original_price";

/// Repository for voucher database operations.
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: SqlitePool,
}

impl VoucherRepository {
    /// Creates a new VoucherRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VoucherRepository { pool }
    }

    /// Gets a voucher by id, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Voucher>> {
        let sql = format!("SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE id = ?1");
        let voucher = sqlx::query_as::<_, Voucher>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(voucher)
    }

    /// Re-reads an active voucher inside a purchase transaction.
    ///
    /// Returns `None` for unknown and for deactivated vouchers alike.
    pub async fn get_active_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Voucher>> {
        let sql = format!("SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE id = ?1 AND is_active = 1");
        let voucher = sqlx::query_as::<_, Voucher>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(voucher)
    }

    /// All active vouchers, featured first then by price.
    pub async fn list_active(&self) -> DbResult<Vec<Voucher>> {
        let sql = format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE is_active = 1 \
             ORDER BY featured DESC, coin_value ASC, title ASC"
        );
        let vouchers = sqlx::query_as::<_, Voucher>(&sql)
            .fetch_all(&self.pool)
            .await?;
        debug!(count = vouchers.len(), "Listed active vouchers");
        Ok(vouchers)
    }

    /// Every voucher including inactive ones, newest first (admin view).
    pub async fn list_all(&self) -> DbResult<Vec<Voucher>> {
        let sql = format!("SELECT {VOUCHER_COLUMNS} FROM vouchers ORDER BY created_at DESC, title ASC");
        let vouchers = sqlx::query_as::<_, Voucher>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(vouchers)
    }

    /// Counts all vouchers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vouchers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts a voucher.
    pub async fn insert(&self, voucher: &Voucher) -> DbResult<()> {
        debug!(id = %voucher.id, title = %voucher.title, "Inserting voucher");

        sqlx::query(
            r#"
            INSERT INTO vouchers (
                id, title, description, category, coin_value, is_active,
                expiry_date, created_at, created_by, image_url, featured,
                brand, original_price
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&voucher.id)
        .bind(&voucher.title)
        .bind(&voucher.description)
        .bind(&voucher.category)
        .bind(voucher.coin_value)
        .bind(voucher.is_active)
        .bind(voucher.expiry_date)
        .bind(voucher.created_at)
        .bind(&voucher.created_by)
        .bind(&voucher.image_url)
        .bind(voucher.featured)
        .bind(&voucher.brand)
        .bind(&voucher.original_price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Activates or deactivates a voucher and returns the updated row.
    ///
    /// ## Errors
    /// `DbError::NotFound` if no voucher has this id.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<Voucher> {
        let sql = format!(
            "UPDATE vouchers SET is_active = ?1 WHERE id = ?2 RETURNING {VOUCHER_COLUMNS}"
        );
        sqlx::query_as::<_, Voucher>(&sql)
            .bind(is_active)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Voucher", id))
    }
}
