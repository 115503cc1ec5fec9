use chrono::{DateTime, Utc};
use std::sync::Arc;

use math_core::model::{Difficulty, Mode, Profile, ProfileId, SessionSummary};
use storage::repository::{HistoryEntry, HistoryRepository, InMemoryRepository, ProfileRepository};
use tracing::info;

use crate::Clock;
use crate::error::ProfileServiceError;

/// How many history lines a learner sees.
pub const HISTORY_DISPLAY_LIMIT: u32 = 10;

/// Presentation-agnostic history line; formatting is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryListItem {
    pub id: i64,
    pub completed_at: DateTime<Utc>,
    pub mode: Mode,
    pub score: u32,
    pub total: u32,
    pub difficulty: Difficulty,
}

impl HistoryListItem {
    #[must_use]
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        let summary = &entry.summary;
        Self {
            id: entry.id,
            completed_at: summary.completed_at(),
            mode: summary.mode(),
            score: summary.score(),
            total: summary.total(),
            difficulty: summary.difficulty(),
        }
    }
}

/// Learner profiles, the current selection, and per-learner history.
#[derive(Clone)]
pub struct ProfileService {
    clock: Clock,
    profiles: Arc<dyn ProfileRepository>,
    history: Arc<dyn HistoryRepository>,
}

impl ProfileService {
    #[must_use]
    pub fn new(
        clock: Clock,
        profiles: Arc<dyn ProfileRepository>,
        history: Arc<dyn HistoryRepository>,
    ) -> Self {
        Self {
            clock,
            profiles,
            history,
        }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        let repo = InMemoryRepository::new();
        Self::new(clock, Arc::new(repo.clone()), Arc::new(repo))
    }

    /// Create and store a new learner.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Profile` for an empty name, zero age or unknown grade,
    /// or `ProfileServiceError::Storage` if the profile cannot be saved.
    pub async fn create_profile(
        &self,
        name: &str,
        age: u8,
        grade: u8,
    ) -> Result<Profile, ProfileServiceError> {
        let profile = Profile::new(ProfileId::generate(), name, age, grade, self.clock.now())?;
        self.profiles.upsert_profile(&profile).await?;
        info!(profile = %profile.id(), label = %profile.label(), "profile created");
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` on repository failures.
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, ProfileServiceError> {
        Ok(self.profiles.list_profiles().await?)
    }

    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` with `StorageError::NotFound` for unknown ids.
    pub async fn get_profile(&self, id: ProfileId) -> Result<Profile, ProfileServiceError> {
        Ok(self.profiles.get_profile(id).await?)
    }

    /// Make `id` the current learner.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if the profile does not exist.
    pub async fn select_profile(&self, id: ProfileId) -> Result<Profile, ProfileServiceError> {
        let profile = self.profiles.get_profile(id).await?;
        self.profiles.set_current_profile(Some(id)).await?;
        Ok(profile)
    }

    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` on repository failures.
    pub async fn clear_selection(&self) -> Result<(), ProfileServiceError> {
        Ok(self.profiles.set_current_profile(None).await?)
    }

    /// The current learner, if one is selected.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` on repository failures.
    pub async fn current_profile(&self) -> Result<Option<Profile>, ProfileServiceError> {
        match self.profiles.current_profile().await? {
            Some(id) => Ok(Some(self.profiles.get_profile(id).await?)),
            None => Ok(None),
        }
    }

    /// Append a finished session to a learner's history.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` if the learner is unknown or the write fails.
    pub async fn record_summary(
        &self,
        profile: ProfileId,
        summary: &SessionSummary,
    ) -> Result<i64, ProfileServiceError> {
        let id = self.history.append_summary(profile, summary).await?;
        info!(%profile, score = summary.score(), total = summary.total(), "history updated");
        Ok(id)
    }

    /// The learner's latest sessions, newest first, at most `HISTORY_DISPLAY_LIMIT`.
    ///
    /// # Errors
    ///
    /// Returns `ProfileServiceError::Storage` on repository failures.
    pub async fn recent_history(
        &self,
        profile: ProfileId,
    ) -> Result<Vec<HistoryListItem>, ProfileServiceError> {
        let entries = self
            .history
            .list_history(profile, HISTORY_DISPLAY_LIMIT)
            .await?;
        Ok(entries.iter().map(HistoryListItem::from_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use math_core::model::ProfileError;
    use math_core::time::{fixed_clock, fixed_now};
    use storage::repository::StorageError;

    #[tokio::test]
    async fn invalid_profiles_are_not_stored() {
        let service = ProfileService::in_memory(fixed_clock());

        let err = service.create_profile("   ", 7, 2).await.unwrap_err();
        assert!(matches!(err, ProfileServiceError::Profile(ProfileError::EmptyName)));
        let err = service.create_profile("Mia", 7, 9).await.unwrap_err();
        assert!(matches!(
            err,
            ProfileServiceError::Profile(ProfileError::InvalidGrade(9))
        ));
        assert!(service.list_profiles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn selecting_an_unknown_profile_fails() {
        let service = ProfileService::in_memory(fixed_clock());
        let err = service.select_profile(ProfileId::generate()).await.unwrap_err();
        assert!(matches!(
            err,
            ProfileServiceError::Storage(StorageError::NotFound)
        ));
        assert_eq!(service.current_profile().await.unwrap(), None);
    }

    #[tokio::test]
    async fn recent_history_is_capped() {
        let service = ProfileService::in_memory(fixed_clock());
        let mia = service.create_profile("Mia", 7, 2).await.unwrap();

        for i in 0..12 {
            let summary = SessionSummary::from_persisted(
                fixed_now() + Duration::minutes(i),
                Mode::Mixed,
                u32::try_from(i).unwrap() % 11,
                10,
                Difficulty::Medium,
            )
            .unwrap();
            service.record_summary(mia.id(), &summary).await.unwrap();
        }

        let history = service.recent_history(mia.id()).await.unwrap();
        assert_eq!(history.len(), HISTORY_DISPLAY_LIMIT as usize);
        assert_eq!(history[0].completed_at, fixed_now() + Duration::minutes(11));
        assert!(
            history
                .windows(2)
                .all(|pair| pair[0].completed_at >= pair[1].completed_at)
        );
    }
}
