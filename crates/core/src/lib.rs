#![forbid(unsafe_code)]

pub mod generator;
pub mod model;
pub mod speech;
pub mod time;

pub use generator::{QuestionGenerator, generate_question};
pub use speech::{RecognizedUtterance, TranscriptRejected, interpret_utterance, parse_spoken_number};
pub use time::Clock;
