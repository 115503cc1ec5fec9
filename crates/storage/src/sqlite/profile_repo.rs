use async_trait::async_trait;
use math_core::model::{Profile, ProfileId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, map_profile_row, missing_parent_or_conn};
use crate::repository::{ProfileRepository, StorageError};

#[async_trait]
impl ProfileRepository for SqliteRepository {
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profiles (id, name, age, grade, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                grade = excluded.grade
            ",
        )
        .bind(profile.id().value())
        .bind(profile.name())
        .bind(i64::from(profile.age()))
        .bind(i64::from(profile.grade()))
        .bind(profile.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Profile, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, age, grade, created_at
            FROM profiles
            WHERE id = ?1
            ",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_profile_row(&row)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, age, grade, created_at
            FROM profiles
            ORDER BY created_at ASC, name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_profile_row).collect()
    }

    async fn set_current_profile(&self, id: Option<ProfileId>) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO current_profile (id, profile_id)
            VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET profile_id = excluded.profile_id
            ",
        )
        .bind(id.map(|p| p.value()))
        .execute(&self.pool)
        .await
        .map_err(missing_parent_or_conn)?;

        Ok(())
    }

    async fn current_profile(&self) -> Result<Option<ProfileId>, StorageError> {
        let row = sqlx::query("SELECT profile_id FROM current_profile WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let stored: Option<uuid::Uuid> = row
            .try_get("profile_id")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        Ok(stored.map(ProfileId::from_uuid))
    }
}
