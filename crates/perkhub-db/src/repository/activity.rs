//! # Activity Repository
//!
//! Append-only log of who did what. Workflow entries are written inside the
//! workflow's transaction so a rolled-back redemption leaves no trace.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use perkhub_core::ActivityLog;

/// Repository for activity log rows.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    /// Creates a new ActivityRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ActivityRepository { pool }
    }

    /// Appends an entry inside an open transaction.
    pub async fn insert(&self, conn: &mut SqliteConnection, entry: &ActivityLog) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO activity_logs (id, user_id, action, details, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(entry.action)
        .bind(&entry.details)
        .bind(entry.timestamp)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Appends an entry outside any workflow (e.g. login).
    pub async fn record(&self, entry: &ActivityLog) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        self.insert(&mut conn, entry).await
    }

    /// A user's entries, newest first.
    pub async fn list_for_user(&self, user_id: &str, limit: u32) -> DbResult<Vec<ActivityLog>> {
        let rows = sqlx::query_as::<_, ActivityLog>(
            "SELECT id, user_id, action, details, timestamp FROM activity_logs
             WHERE user_id = ?1 ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use chrono::Utc;
    use perkhub_core::ActivityAction;

    #[tokio::test]
    async fn test_record_and_list() {
        let db = test_db().await;
        let entry = ActivityLog {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            action: ActivityAction::Login,
            details: "Signed in".to_string(),
            timestamp: Utc::now(),
        };
        db.activity().record(&entry).await.unwrap();

        let rows = db.activity().list_for_user("u1", 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, ActivityAction::Login);
        assert!(db.activity().list_for_user("u2", 10).await.unwrap().is_empty());
    }
}
