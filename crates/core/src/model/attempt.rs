use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer {raw:?} is not a whole number")]
    InvalidFormat { raw: String },
}

/// Raw input a learner hands to the engine for the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// An already-parsed number, e.g. from the speech path.
    Value(i64),
    /// Text typed on the keypad or keyboard.
    Typed(String),
    /// Explicit skip, or the countdown ran out.
    Skip,
}

impl Answer {
    /// Resolve the answer into what gets recorded.
    #[must_use]
    pub fn into_submitted(self) -> Submitted {
        match self {
            Answer::Value(v) => Submitted::Value(v),
            Answer::Skip => Submitted::Skipped,
            Answer::Typed(raw) => match parse_typed(&raw) {
                Ok(v) => Submitted::Value(v),
                Err(AnswerError::InvalidFormat { raw }) => Submitted::Invalid(raw),
            },
        }
    }
}

/// Parse typed input as a finite integer.
///
/// # Errors
///
/// Returns `AnswerError::InvalidFormat` for empty or non-numeric text.
pub fn parse_typed(raw: &str) -> Result<i64, AnswerError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| AnswerError::InvalidFormat {
            raw: raw.to_string(),
        })
}

/// What was recorded as the learner's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Submitted {
    Value(i64),
    Invalid(String),
    Skipped,
}

impl Submitted {
    #[must_use]
    pub fn value(&self) -> Option<i64> {
        match self {
            Submitted::Value(v) => Some(*v),
            _ => None,
        }
    }
}

/// Outcome of one question in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub question_text: String,
    pub expected: i64,
    pub submitted: Submitted,
    pub correct: bool,
}

impl AttemptRecord {
    /// Score a submission against the expected answer. Only an exact value match counts.
    #[must_use]
    pub fn score(question_text: impl Into<String>, expected: i64, submitted: Submitted) -> Self {
        let correct = submitted.value() == Some(expected);
        Self {
            question_text: question_text.into(),
            expected,
            submitted,
            correct,
        }
    }
}
