mod attempt;
mod ids;
mod profile;
mod question;
mod session;
pub mod settings;

pub use ids::{Generation, ParseIdError, ProfileId};

pub use attempt::{Answer, AnswerError, AttemptRecord, Submitted, parse_typed};
pub use profile::{Profile, ProfileError};
pub use question::{MAX_SHAPES, Question};
pub use session::{Session, SessionStateError, SessionSummary, SessionSummaryError};
pub use settings::{
    BeforeAfterKind, Difficulty, Digits, Mode, NumberRange, Offsets, Operator, Settings,
    SettingsDraft, SettingsError,
};
