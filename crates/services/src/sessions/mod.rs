mod collaborators;
mod engine;
mod preset;
mod snapshot;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use collaborators::{
    Collaborators, DisabledSpeech, Presenter, ProfileStore, SilentSink, SpeechSink, SpeechSource,
    SpeechUnavailable, Timer,
};
pub use engine::{
    AdvanceOutcome, FEEDBACK_DELAY, MAX_INPUT_DIGITS, SessionEngine, SpeechOutcome, SubmitOutcome,
    TickOutcome,
};
pub use preset::settings_for_profile;
pub use snapshot::{Feedback, Phase, SessionSnapshot};
