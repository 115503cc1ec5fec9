use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ProfileId;
use crate::model::settings::{MAX_GRADE, MIN_GRADE};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("profile name cannot be empty")]
    EmptyName,

    #[error("age must be > 0")]
    InvalidAge,

    #[error("grade must be between 1 and 5, got {0}")]
    InvalidGrade(u8),
}

/// A learner whose finished sessions are kept in a history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    id: ProfileId,
    name: String,
    age: u8,
    grade: u8,
    created_at: DateTime<Utc>,
}

impl Profile {
    /// Creates a new profile.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError` if the trimmed name is empty, the age is zero, or the grade is
    /// outside 1..=5.
    pub fn new(
        id: ProfileId,
        name: impl Into<String>,
        age: u8,
        grade: u8,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ProfileError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        if age == 0 {
            return Err(ProfileError::InvalidAge);
        }
        if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
            return Err(ProfileError::InvalidGrade(grade));
        }

        Ok(Self {
            id,
            name,
            age,
            grade,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> ProfileId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn age(&self) -> u8 {
        self.age
    }

    #[must_use]
    pub fn grade(&self) -> u8 {
        self.grade
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Short label for profile lists, e.g. `Mia (Grade 2)`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} (Grade {})", self.name, self.grade)
    }
}
