//! Shared error types for the services crate.

use thiserror::Error;

use math_core::model::{ProfileError, SettingsError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the session engine and settings resolution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no learner profile selected")]
    NoActiveProfile,
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileServiceError {
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
