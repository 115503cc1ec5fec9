#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod profile_service;
pub mod sessions;

pub use math_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{AppServicesError, ProfileServiceError, SessionError};
pub use profile_service::{HISTORY_DISPLAY_LIMIT, HistoryListItem, ProfileService};

pub use sessions::{
    AdvanceOutcome, Collaborators, Feedback, Phase, SessionEngine, SessionSnapshot, SpeechOutcome,
    SubmitOutcome, TickOutcome, settings_for_profile,
};
