//! # Transaction Repository
//!
//! The coin ledger's audit trail. Rows are appended inside the same SQLite
//! transaction as the balance change they describe and are never updated.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use perkhub_core::{CoinTransaction, TransactionType};

const TX_COLUMNS: &str =
    "id, transaction_type, amount, from_user_id, to_user_id, description, status, created_at";

/// Repository for coin transaction rows.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Appends a ledger row.
    pub async fn insert(&self, conn: &mut SqliteConnection, tx: &CoinTransaction) -> DbResult<()> {
        debug!(
            id = %tx.id,
            kind = ?tx.transaction_type,
            amount = tx.amount,
            "Appending coin transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO coin_transactions (
                id, transaction_type, amount, from_user_id, to_user_id,
                description, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&tx.id)
        .bind(tx.transaction_type)
        .bind(tx.amount)
        .bind(&tx.from_user_id)
        .bind(&tx.to_user_id)
        .bind(&tx.description)
        .bind(tx.status)
        .bind(tx.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Rows where the user is sender or receiver, newest first.
    pub async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<CoinTransaction>> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM coin_transactions \
             WHERE from_user_id = ?1 OR to_user_id = ?1 \
             ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        );
        let rows = sqlx::query_as::<_, CoinTransaction>(&sql)
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Rows of one type touching the user, oldest first.
    pub async fn list_for_user_by_type(
        &self,
        user_id: &str,
        kind: TransactionType,
    ) -> DbResult<Vec<CoinTransaction>> {
        let sql = format!(
            "SELECT {TX_COLUMNS} FROM coin_transactions \
             WHERE (from_user_id = ?1 OR to_user_id = ?1) AND transaction_type = ?2 \
             ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query_as::<_, CoinTransaction>(&sql)
            .bind(user_id)
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Total number of ledger rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coin_transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
