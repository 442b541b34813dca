//! # Balance Ledger
//!
//! The only code that changes `users.coin_balance`. Every change runs inside
//! the caller's transaction and appends exactly one `completed`
//! [`CoinTransaction`] in that same transaction.
//!
//! ```text
//! apply_delta(user, 100, Debit, entry)
//!   ├── UPDATE users SET coin_balance = coin_balance - 100
//!   │     WHERE id = ? AND coin_balance >= 100        (compare-and-set)
//!   │       0 rows → UserNotFound | InsufficientBalance
//!   └── INSERT INTO coin_transactions (..., amount = 100, status = completed)
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use perkhub_core::{
    ActivityAction, CoinTransaction, Coins, CoreError, Direction, LedgerEntry, Principal,
    TransactionStatus, TransactionType, UserRole, ValidationError,
};
use perkhub_db::{Database, DebitOutcome};

use super::{activity, ServiceResult};

/// Applies one signed balance change and records it.
///
/// Returns the balance after the change.
pub async fn apply_delta(
    db: &Database,
    conn: &mut SqliteConnection,
    user_id: &str,
    amount: i64,
    direction: Direction,
    entry: LedgerEntry,
    now: DateTime<Utc>,
) -> ServiceResult<i64> {
    let amount = Coins::positive(amount, "amount")?;

    let new_balance = match direction {
        Direction::Credit => credit(db, conn, user_id, amount, now).await?,
        Direction::Debit => debit(db, conn, user_id, amount, now).await?,
    };

    record(db, conn, entry, amount, now).await?;

    info!(
        user_id = %user_id,
        amount = amount.value(),
        ?direction,
        new_balance,
        "Balance updated"
    );
    Ok(new_balance)
}

/// Balances after a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub from_balance: i64,
    pub to_balance: i64,
}

/// Moves coins from the superadmin to another account.
///
/// Both sides change in one transaction and a single `approve` row covers
/// them.
pub async fn transfer(
    db: &Database,
    principal: &Principal,
    to_user_id: &str,
    amount: i64,
    description: Option<&str>,
) -> ServiceResult<TransferReceipt> {
    principal.require(UserRole::Superadmin)?;
    let amount = Coins::grant(amount, "amount")?;

    if to_user_id == principal.id {
        return Err(ValidationError::InvalidFormat {
            field: "toUserId".to_string(),
            reason: "cannot transfer to yourself".to_string(),
        }
        .into());
    }

    let now = Utc::now();
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Allocated {amount}"));

    let mut tx = db.begin().await?;

    let from_balance = debit(db, &mut tx, &principal.id, amount, now).await?;
    let to_balance = credit(db, &mut tx, to_user_id, amount, now).await?;

    let entry = LedgerEntry {
        transaction_type: TransactionType::Approve,
        from_user_id: Some(principal.id.clone()),
        to_user_id: Some(to_user_id.to_string()),
        description: description.clone(),
    };
    record(db, &mut tx, entry, amount, now).await?;

    db.activity()
        .insert(
            &mut tx,
            &activity(
                &principal.id,
                ActivityAction::CoinTransfer,
                format!("Transferred {amount} to {to_user_id}: {description}"),
                now,
            ),
        )
        .await?;

    Database::commit(tx).await?;

    info!(
        from = %principal.id,
        to = %to_user_id,
        amount = amount.value(),
        "Coins transferred"
    );
    Ok(TransferReceipt {
        from_balance,
        to_balance,
    })
}

async fn credit(
    db: &Database,
    conn: &mut SqliteConnection,
    user_id: &str,
    amount: Coins,
    now: DateTime<Utc>,
) -> ServiceResult<i64> {
    db.users()
        .credit(conn, user_id, amount.value(), now)
        .await?
        .ok_or_else(|| CoreError::UserNotFound(user_id.to_string()).into())
}

async fn debit(
    db: &Database,
    conn: &mut SqliteConnection,
    user_id: &str,
    amount: Coins,
    now: DateTime<Utc>,
) -> ServiceResult<i64> {
    match db.users().debit(conn, user_id, amount.value(), now).await? {
        DebitOutcome::Applied(balance) => Ok(balance),
        DebitOutcome::UserMissing => Err(CoreError::UserNotFound(user_id.to_string()).into()),
        DebitOutcome::Insufficient { available } => Err(CoreError::InsufficientBalance {
            available,
            requested: amount.value(),
        }
        .into()),
    }
}

async fn record(
    db: &Database,
    conn: &mut SqliteConnection,
    entry: LedgerEntry,
    amount: Coins,
    now: DateTime<Utc>,
) -> ServiceResult<()> {
    let row = CoinTransaction {
        id: Uuid::new_v4().to_string(),
        transaction_type: entry.transaction_type,
        amount: amount.value(),
        from_user_id: entry.from_user_id,
        to_user_id: entry.to_user_id,
        description: entry.description,
        status: TransactionStatus::Completed,
        created_at: now,
    };
    db.transactions().insert(conn, &row).await?;
    Ok(())
}
