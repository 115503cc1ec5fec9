//! Seams between the session engine and the world around it.
//!
//! The engine calls these synchronously and never waits on them. Hosts that need
//! asynchronous work (audio, persistence, real timers) queue it behind the call.

use std::fmt;
use std::time::Duration;

use math_core::model::{Generation, ProfileId, SessionSummary};
use storage::repository::StorageError;
use thiserror::Error;

use super::snapshot::SessionSnapshot;

/// The speech recognizer is missing or was denied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("speech recognition unavailable: {reason}")]
pub struct SpeechUnavailable {
    pub reason: String,
}

impl SpeechUnavailable {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Renders engine state.
pub trait Presenter: Send {
    fn present(&mut self, snapshot: &SessionSnapshot);
}

/// Reads questions aloud.
pub trait SpeechSink: Send {
    /// Speak `text`, replacing anything still queued.
    fn speak(&mut self, text: &str);
    fn cancel(&mut self);
}

/// Delivers recognized utterances back through `SessionEngine::speech_result`.
pub trait SpeechSource: Send {
    /// Start (or keep) listening for answers to the question issued under `generation`.
    ///
    /// # Errors
    ///
    /// Returns `SpeechUnavailable` when recognition cannot run; the engine then falls
    /// back to keypad input for the rest of its life.
    fn resume_listening(&mut self, generation: Generation) -> Result<(), SpeechUnavailable>;
    fn stop_listening(&mut self);
}

/// Host-side timing. Every callback carries the generation it was scheduled under.
pub trait Timer: Send {
    /// Call `SessionEngine::tick` once per unit, `units` times.
    fn start_countdown(&mut self, generation: Generation, units: u32);
    /// Call `SessionEngine::feedback_elapsed` once after `delay`.
    fn schedule_advance(&mut self, generation: Generation, delay: Duration);
    /// Drop the running countdown and any pending advance.
    fn cancel(&mut self);
}

/// Receives the summary of every session that ran to the end.
pub trait ProfileStore: Send {
    /// # Errors
    ///
    /// Returns `StorageError` if the summary could not be handed off.
    fn record_summary(
        &mut self,
        profile: ProfileId,
        summary: &SessionSummary,
    ) -> Result<(), StorageError>;
}

/// Speech output that says nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSink;

impl SpeechSink for SilentSink {
    fn speak(&mut self, _text: &str) {}
    fn cancel(&mut self) {}
}

/// Keypad-only input.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSpeech;

impl SpeechSource for DisabledSpeech {
    fn resume_listening(&mut self, _generation: Generation) -> Result<(), SpeechUnavailable> {
        Err(SpeechUnavailable::new("speech input disabled"))
    }

    fn stop_listening(&mut self) {}
}

/// Everything the engine talks to, boxed so hosts can mix implementations freely.
pub struct Collaborators {
    pub presenter: Box<dyn Presenter>,
    pub speech_sink: Box<dyn SpeechSink>,
    pub speech_source: Box<dyn SpeechSource>,
    pub timer: Box<dyn Timer>,
    pub store: Box<dyn ProfileStore>,
}

impl Collaborators {
    /// Keypad-only, silent collaborators around the given presenter, timer and store.
    #[must_use]
    pub fn new(
        presenter: impl Presenter + 'static,
        timer: impl Timer + 'static,
        store: impl ProfileStore + 'static,
    ) -> Self {
        Self {
            presenter: Box::new(presenter),
            speech_sink: Box::new(SilentSink),
            speech_source: Box::new(DisabledSpeech),
            timer: Box::new(timer),
            store: Box::new(store),
        }
    }

    #[must_use]
    pub fn with_speech(
        mut self,
        source: impl SpeechSource + 'static,
        sink: impl SpeechSink + 'static,
    ) -> Self {
        self.speech_source = Box::new(source);
        self.speech_sink = Box::new(sink);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
