use async_trait::async_trait;
use math_core::model::{Profile, ProfileId, SessionSummary};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// One persisted history line together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: i64,
    pub profile_id: ProfileId,
    pub summary: SessionSummary,
}

/// Repository contract for learner profiles and the currently selected learner.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Persist or update a profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError>;

    /// Fetch a profile by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_profile(&self, id: ProfileId) -> Result<Profile, StorageError>;

    /// All profiles, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_profiles(&self) -> Result<Vec<Profile>, StorageError>;

    /// Remember which learner is selected; `None` clears the selection.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the profile does not exist.
    async fn set_current_profile(&self, id: Option<ProfileId>) -> Result<(), StorageError>;

    /// The selected learner, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn current_profile(&self) -> Result<Option<ProfileId>, StorageError>;
}

/// Append-only session history per learner.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append a finished session and return its storage id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the profile does not exist.
    async fn append_summary(
        &self,
        profile: ProfileId,
        summary: &SessionSummary,
    ) -> Result<i64, StorageError>;

    /// Most recent entries first, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_history(
        &self,
        profile: ProfileId,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, StorageError>;
}

#[derive(Default)]
struct HistoryLog {
    next_id: i64,
    entries: Vec<HistoryEntry>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    profiles: Arc<Mutex<HashMap<ProfileId, Profile>>>,
    current: Arc<Mutex<Option<ProfileId>>>,
    history: Arc<Mutex<HistoryLog>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn has_profile(&self, id: ProfileId) -> Result<bool, StorageError> {
        let guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.contains_key(&id))
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(profile.id(), profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Profile, StorageError> {
        let guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, StorageError> {
        let guard = self
            .profiles
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut profiles: Vec<Profile> = guard.values().cloned().collect();
        profiles.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.name().cmp(b.name()))
        });
        Ok(profiles)
    }

    async fn set_current_profile(&self, id: Option<ProfileId>) -> Result<(), StorageError> {
        if let Some(id) = id {
            if !self.has_profile(id)? {
                return Err(StorageError::NotFound);
            }
        }
        let mut guard = self
            .current
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = id;
        Ok(())
    }

    async fn current_profile(&self) -> Result<Option<ProfileId>, StorageError> {
        let guard = self
            .current
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(*guard)
    }
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn append_summary(
        &self,
        profile: ProfileId,
        summary: &SessionSummary,
    ) -> Result<i64, StorageError> {
        if !self.has_profile(profile)? {
            return Err(StorageError::NotFound);
        }
        let mut guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.next_id += 1;
        let id = guard.next_id;
        guard.entries.push(HistoryEntry {
            id,
            profile_id: profile,
            summary: summary.clone(),
        });
        Ok(id)
    }

    async fn list_history(
        &self,
        profile: ProfileId,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, StorageError> {
        let guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut entries: Vec<HistoryEntry> = guard
            .entries
            .iter()
            .filter(|e| e.profile_id == profile)
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            b.summary
                .completed_at()
                .cmp(&a.summary.completed_at())
                .then_with(|| b.id.cmp(&a.id))
        });
        entries.truncate(limit as usize);
        Ok(entries)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub profiles: Arc<dyn ProfileRepository>,
    pub history: Arc<dyn HistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repo.clone());
        let history: Arc<dyn HistoryRepository> = Arc::new(repo);
        Self { profiles, history }
    }
}
