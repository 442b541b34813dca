//! # User Repository
//!
//! Accounts and the `coin_balance` column.
//!
//! ## Balance Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  debit(user, 250)                                                       │
//! │                                                                         │
//! │  UPDATE users SET coin_balance = coin_balance - 250                     │
//! │   WHERE id = ? AND coin_balance >= 250                                  │
//! │   RETURNING coin_balance                                                │
//! │        │                                                                │
//! │        ├── 1 row  ──► Applied(new_balance)                              │
//! │        │                                                                │
//! │        └── 0 rows ──► SELECT coin_balance WHERE id = ?                  │
//! │                          ├── no row ──► UserMissing                     │
//! │                          └── balance ─► Insufficient { available }      │
//! │                                                                         │
//! │  The check and the write are one statement: two concurrent debits      │
//! │  can never both pass on the same coins.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `credit` / `debit` are only called by the portal's balance ledger, which
//! writes the matching `coin_transactions` row in the same transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::DebitOutcome;
use perkhub_core::{User, UserRole};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, coin_balance, company_name, created_at, last_updated";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user by application id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Gets a user by email. Emails are stored lowercased.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let email = email.trim().to_lowercase();
        debug!(email = %email, "Looking up user by email");

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Lists users holding `role`, newest first.
    pub async fn list_by_role(&self, role: UserRole) -> DbResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = ?1 ORDER BY created_at DESC"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// Counts all users.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts a new user.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation { field: "users.email" }` if the email is taken.
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, role = %user.role, "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, email, password_hash, role, coin_balance,
                company_name, created_at, last_updated
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(user.email.trim().to_lowercase())
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.coin_balance)
        .bind(&user.company_name)
        .bind(user.created_at)
        .bind(user.last_updated)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts or updates many users in one transaction, keyed by email.
    ///
    /// Existing rows get their name, role and company refreshed. Their
    /// balance and password hash are left alone: balances only move through
    /// the ledger.
    ///
    /// Returns the number of rows written.
    pub async fn upsert_many(&self, users: &[User]) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for user in users {
            let result = sqlx::query(
                r#"
                INSERT INTO users (
                    id, name, email, password_hash, role, coin_balance,
                    company_name, created_at, last_updated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT (email) DO UPDATE SET
                    name = excluded.name,
                    role = excluded.role,
                    company_name = excluded.company_name,
                    last_updated = excluded.last_updated
                "#,
            )
            .bind(&user.id)
            .bind(&user.name)
            .bind(user.email.trim().to_lowercase())
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.coin_balance)
            .bind(&user.company_name)
            .bind(user.created_at)
            .bind(user.last_updated)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        debug!(count = written, "Upserted users");
        Ok(written)
    }

    /// Current balance, or `None` if the user does not exist.
    pub async fn balance(&self, id: &str) -> DbResult<Option<i64>> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT coin_balance FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(balance)
    }

    // =========================================================================
    // Transactional balance mutations
    // =========================================================================

    /// Adds `amount` to the balance. Returns the new balance, or `None` if
    /// the user does not exist.
    pub async fn credit(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Option<i64>> {
        debug!(user_id = %id, amount, "Crediting balance");

        let new_balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET coin_balance = coin_balance + ?1, last_updated = ?2
            WHERE id = ?3
            RETURNING coin_balance
            "#,
        )
        .bind(amount)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(new_balance)
    }

    /// Subtracts `amount` if and only if the balance covers it.
    pub async fn debit(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> DbResult<DebitOutcome> {
        debug!(user_id = %id, amount, "Debiting balance");

        let new_balance: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET coin_balance = coin_balance - ?1, last_updated = ?2
            WHERE id = ?3 AND coin_balance >= ?1
            RETURNING coin_balance
            "#,
        )
        .bind(amount)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(balance) = new_balance {
            return Ok(DebitOutcome::Applied(balance));
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT coin_balance FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(match available {
            None => DebitOutcome::UserMissing,
            Some(available) => DebitOutcome::Insufficient { available },
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
