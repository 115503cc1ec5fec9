//! Turns recognized speech into candidate answers.
//!
//! Recognizers hear "for" when a child says "four", so a small homophone table is
//! applied before numbers are read either from digits ("23") or from English number
//! words ("twenty three", "one hundred five").

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest recognizer confidence at which an utterance is considered at all.
pub const MIN_SPEECH_CONFIDENCE: f32 = 0.25;

/// Why a recognized utterance did not produce an answer.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum TranscriptRejected {
    #[error("interim result")]
    Interim,

    #[error("confidence {confidence} below threshold")]
    LowConfidence { confidence: f32 },

    #[error("no number in {text:?}")]
    NoNumber { text: String },
}

/// One result delivered by a speech recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedUtterance {
    pub text: String,
    pub confidence: f32,
    pub is_final: bool,
}

impl RecognizedUtterance {
    /// A final result, as a recognizer reports once the learner stops talking.
    #[must_use]
    pub fn final_result(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            is_final: true,
        }
    }
}

/// Accept or reject an utterance as an answer.
///
/// # Errors
///
/// Returns `TranscriptRejected` for interim results, results below
/// `MIN_SPEECH_CONFIDENCE` (including NaN), or text with no numeric content.
pub fn interpret_utterance(utterance: &RecognizedUtterance) -> Result<i64, TranscriptRejected> {
    if !utterance.is_final {
        return Err(TranscriptRejected::Interim);
    }
    // Written so that NaN is rejected too.
    if !(utterance.confidence >= MIN_SPEECH_CONFIDENCE) {
        return Err(TranscriptRejected::LowConfidence {
            confidence: utterance.confidence,
        });
    }
    parse_spoken_number(&utterance.text).ok_or_else(|| TranscriptRejected::NoNumber {
        text: utterance.text.clone(),
    })
}

/// Read an integer out of recognized text.
///
/// Digits win when present; otherwise English number words are summed short-scale.
/// Returns `None` when nothing numeric was said.
#[must_use]
pub fn parse_spoken_number(utterance: &str) -> Option<i64> {
    let normalized = utterance.to_lowercase();
    if normalized.chars().any(|c| c.is_ascii_digit()) {
        return parse_digits(&normalized);
    }
    words_to_number(&normalized)
}

fn parse_digits(text: &str) -> Option<i64> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    let negative = kept.starts_with('-');
    let digits: String = kept.chars().filter(char::is_ascii_digit).collect();
    let value = digits.parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}

fn homophone(word: &str) -> &str {
    match word {
        "to" | "too" => "two",
        "for" | "fore" => "four",
        "ate" => "eight",
        "free" | "tree" => "three",
        other => other,
    }
}

fn small_number(word: &str) -> Option<i64> {
    let value = match word {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        _ => return None,
    };
    Some(value)
}

fn tens_number(word: &str) -> Option<i64> {
    let value = match word {
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    };
    Some(value)
}

fn words_to_number(text: &str) -> Option<i64> {
    let mut total: i64 = 0;
    let mut current: i64 = 0;
    let mut heard_number = false;
    // Whether a number word was spoken since the last "thousand".
    let mut counted = false;

    let words = text
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .map(homophone);

    for word in words {
        if let Some(value) = small_number(word).or_else(|| tens_number(word)) {
            current = current.saturating_add(value);
            counted = true;
        } else if word == "hundred" {
            // "a hundred" / bare "hundred" means one hundred.
            current = if counted { current.saturating_mul(100) } else { 100 };
            counted = true;
        } else if word == "thousand" {
            let multiplier = if counted { current } else { 1 };
            total = total.saturating_add(multiplier.saturating_mul(1000));
            current = 0;
            counted = false;
        } else {
            continue;
        }
        heard_number = true;
    }

    heard_number.then(|| total.saturating_add(current))
}
