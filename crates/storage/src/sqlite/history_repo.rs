use async_trait::async_trait;
use math_core::model::{ProfileId, SessionSummary};

use super::SqliteRepository;
use super::mapping::{conn, map_history_row, missing_parent_or_conn};
use crate::repository::{HistoryEntry, HistoryRepository, StorageError};

#[async_trait]
impl HistoryRepository for SqliteRepository {
    async fn append_summary(
        &self,
        profile: ProfileId,
        summary: &SessionSummary,
    ) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO session_history (
                    profile_id, completed_at, mode, score, total, difficulty
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(profile.value())
        .bind(summary.completed_at())
        .bind(summary.mode().as_str())
        .bind(i64::from(summary.score()))
        .bind(i64::from(summary.total()))
        .bind(summary.difficulty().as_str())
        .execute(&self.pool)
        .await
        .map_err(missing_parent_or_conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn list_history(
        &self,
        profile: ProfileId,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, profile_id, completed_at, mode, score, total, difficulty
                FROM session_history
                WHERE profile_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(profile.value())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_history_row(&row)?);
        }
        Ok(out)
    }
}
