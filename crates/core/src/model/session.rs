use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AttemptRecord, Difficulty, Mode, Question, Settings, Submitted};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("all {total} questions have been asked")]
    Exhausted { total: u32 },

    #[error("a question is already awaiting an answer")]
    QuestionPending,

    #[error("no question is awaiting an answer")]
    NoPendingQuestion,

    #[error("session still has {remaining} questions to go")]
    Incomplete { remaining: u32 },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("score ({score}) exceeds total ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State of one practice run.
///
/// Keeps `0 <= correct <= index <= total` and one attempt record per completed question.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    settings: Settings,
    total: u32,
    index: u32,
    correct: u32,
    current: Option<Question>,
    attempts: Vec<AttemptRecord>,
    started_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(settings: Settings, started_at: DateTime<Utc>) -> Self {
        let total = settings.question_count();
        Self {
            settings,
            total,
            index: 0,
            correct: 0,
            current: None,
            attempts: Vec::with_capacity(total as usize),
            started_at,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// 1-based number of the question most recently asked; 0 before the first.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.index >= self.total
    }

    /// Make `question` the pending question and move the index forward.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::QuestionPending` if the previous question has not been
    /// answered, or `SessionStateError::Exhausted` once every question has been asked.
    pub fn begin_question(&mut self, question: Question) -> Result<u32, SessionStateError> {
        if self.current.is_some() {
            return Err(SessionStateError::QuestionPending);
        }
        if self.is_exhausted() {
            return Err(SessionStateError::Exhausted { total: self.total });
        }
        self.current = Some(question);
        self.index += 1;
        Ok(self.index)
    }

    /// Score the pending question and clear it.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::NoPendingQuestion` if nothing is awaiting an answer.
    pub fn record(&mut self, submitted: Submitted) -> Result<&AttemptRecord, SessionStateError> {
        let question = self
            .current
            .take()
            .ok_or(SessionStateError::NoPendingQuestion)?;
        let record = AttemptRecord::score(question.text(), question.answer(), submitted);
        if record.correct {
            self.correct += 1;
        }
        self.attempts.push(record);
        self.attempts
            .last()
            .ok_or(SessionStateError::NoPendingQuestion)
    }

    /// Summary of a completed session.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::Incomplete` while questions remain or one is pending.
    pub fn summarize(&self, completed_at: DateTime<Utc>) -> Result<SessionSummary, SessionStateError> {
        if !self.is_exhausted() || self.current.is_some() {
            return Err(SessionStateError::Incomplete {
                remaining: self.total.saturating_sub(self.attempts.len() as u32),
            });
        }
        Ok(SessionSummary {
            completed_at,
            mode: self.settings.mode(),
            score: self.correct,
            total: self.total,
            difficulty: self.settings.difficulty(),
        })
    }
}

//
// ─── SUMMARY ───────────────────────────────────────────────────────────────────
//

/// What gets appended to a learner's history when a session finishes normally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    completed_at: DateTime<Utc>,
    mode: Mode,
    score: u32,
    total: u32,
    difficulty: Difficulty,
}

impl SessionSummary {
    /// Rehydrate a summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionSummaryError::ScoreExceedsTotal` if the counts are inconsistent.
    pub fn from_persisted(
        completed_at: DateTime<Utc>,
        mode: Mode,
        score: u32,
        total: u32,
        difficulty: Difficulty,
    ) -> Result<Self, SessionSummaryError> {
        if score > total {
            return Err(SessionSummaryError::ScoreExceedsTotal { score, total });
        }
        Ok(Self {
            completed_at,
            mode,
            score,
            total,
            difficulty,
        })
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }
}
