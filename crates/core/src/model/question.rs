use serde::{Deserialize, Serialize};

/// Largest count that is drawn as a row of shapes next to a question.
pub const MAX_SHAPES: u32 = 20;

/// One generated arithmetic prompt with its unique correct answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    text: String,
    answer: i64,
    shapes: Option<u32>,
}

impl Question {
    #[must_use]
    pub fn new(text: impl Into<String>, answer: i64) -> Self {
        Self {
            text: text.into(),
            answer,
            shapes: None,
        }
    }

    /// Attach a visual aid of `count` shapes. Counts above `MAX_SHAPES` are dropped.
    #[must_use]
    pub fn with_shapes(mut self, count: i64) -> Self {
        self.shapes = u32::try_from(count).ok().filter(|c| *c <= MAX_SHAPES);
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn answer(&self) -> i64 {
        self.answer
    }

    #[must_use]
    pub fn shapes(&self) -> Option<u32> {
        self.shapes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shapes_above_cap_are_dropped() {
        assert_eq!(Question::new("9 + 9", 18).with_shapes(18).shapes(), Some(18));
        assert_eq!(Question::new("19 + 9", 28).with_shapes(28).shapes(), None);
        assert_eq!(Question::new("x", -1).with_shapes(-1).shapes(), None);
    }
}
