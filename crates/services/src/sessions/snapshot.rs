use std::fmt;

use math_core::model::Generation;

/// Where the engine is in the question cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingAnswer,
    Evaluating,
}

/// Message shown next to the current question or in place of it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Feedback {
    #[default]
    None,
    Correct,
    Wrong {
        answer: i64,
    },
    Finished {
        score: u32,
        total: u32,
    },
    Stopped,
}

impl Feedback {
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Feedback::None => None,
            Feedback::Correct => Some("Correct!".to_string()),
            Feedback::Wrong { answer } => Some(format!("Wrong. Answer: {answer}")),
            Feedback::Finished { score, total } => {
                Some(format!("Session complete! Score: {score}/{total}"))
            }
            Feedback::Stopped => Some("Quiz stopped.".to_string()),
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message().as_deref().unwrap_or(""))
    }
}

/// Everything a presenter needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub generation: Generation,
    /// 1-based number of the question on screen; 0 before the first.
    pub index: u32,
    pub total: u32,
    pub question_text: Option<String>,
    pub shapes: Option<u32>,
    pub time_left: u32,
    pub feedback: Feedback,
    pub score: u32,
    /// Digits entered on the keypad so far.
    pub input: String,
    pub speech_enabled: bool,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Questions not yet shown.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.index)
    }
}
