use std::fmt;
use std::time::Duration;

use math_core::model::{Answer, Generation, ProfileId, Question, Session, SessionSummary, Settings};
use math_core::speech::{RecognizedUtterance, TranscriptRejected, interpret_utterance};
use math_core::{Clock, QuestionGenerator};
use rand::Rng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use super::collaborators::Collaborators;
use super::snapshot::{Feedback, Phase, SessionSnapshot};
use crate::error::SessionError;

/// How long answer feedback stays up before the next question.
pub const FEEDBACK_DELAY: Duration = Duration::from_millis(700);

/// Longest answer the keypad accepts.
pub const MAX_INPUT_DIGITS: usize = 4;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of handing the engine an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Recorded for the current question.
    Accepted { correct: bool },
    /// Not awaiting an answer, or the generation was stale.
    Ignored,
}

impl SubmitOutcome {
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, SubmitOutcome::Accepted { .. })
    }
}

/// Result of one countdown unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Counting { time_left: u32 },
    /// The countdown hit zero and the question was skipped.
    Expired,
    Ignored,
}

/// Result of a recognized utterance.
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechOutcome {
    Accepted { value: i64, correct: bool },
    /// Nothing recorded; listening continues.
    Rejected(TranscriptRejected),
    Ignored,
}

/// Result of the post-feedback advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    NextQuestion { generation: Generation },
    Finished(SessionSummary),
    Ignored,
}

struct ActiveSession {
    owner: ProfileId,
    session: Session,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

/// Runs one practice session at a time for the selected learner.
///
/// The engine never blocks. Timers, speech and keypad input reach it as plain method
/// calls that carry the [`Generation`] they were issued under; anything from an earlier
/// question is ignored, so the first answer for a question wins.
pub struct SessionEngine<R = StdRng> {
    generator: QuestionGenerator<R>,
    clock: Clock,
    collaborators: Collaborators,
    profile: Option<ProfileId>,
    active: Option<ActiveSession>,
    shown: Option<Question>,
    phase: Phase,
    generation: Generation,
    time_left: u32,
    feedback: Feedback,
    input: String,
    speech_enabled: bool,
}

impl SessionEngine<StdRng> {
    #[must_use]
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_generator(QuestionGenerator::from_os_rng(), collaborators)
    }
}

impl<R: Rng> SessionEngine<R> {
    #[must_use]
    pub fn with_generator(generator: QuestionGenerator<R>, collaborators: Collaborators) -> Self {
        Self {
            generator,
            clock: Clock::default(),
            collaborators,
            profile: None,
            active: None,
            shown: None,
            phase: Phase::Idle,
            generation: Generation::default(),
            time_left: 0,
            feedback: Feedback::None,
            input: String::new(),
            speech_enabled: true,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn select_profile(&mut self, profile: ProfileId) {
        self.profile = Some(profile);
    }

    pub fn clear_profile(&mut self) {
        self.profile = None;
    }

    #[must_use]
    pub fn active_profile(&self) -> Option<ProfileId> {
        self.profile
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.active.as_ref().map(|a| &a.session)
    }

    #[must_use]
    pub fn speech_enabled(&self) -> bool {
        self.speech_enabled
    }

    /// Begin a new session for the selected learner, discarding any session in progress.
    ///
    /// Returns the generation of the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveProfile` if no learner is selected.
    pub fn start(&mut self, settings: Settings) -> Result<Generation, SessionError> {
        let owner = self.profile.ok_or(SessionError::NoActiveProfile)?;

        self.teardown();
        if self.active.take().is_some() {
            info!("discarding unfinished session");
        }

        info!(
            mode = %settings.mode(),
            difficulty = %settings.difficulty(),
            questions = settings.question_count(),
            "session started"
        );
        self.active = Some(ActiveSession {
            owner,
            session: Session::new(settings, self.clock.now()),
        });
        self.feedback = Feedback::None;
        self.advance();
        Ok(self.generation)
    }

    /// Answer the question issued under `generation`.
    pub fn submit(&mut self, generation: Generation, answer: Answer) -> SubmitOutcome {
        if self.phase != Phase::AwaitingAnswer || generation != self.generation {
            debug!(%generation, current = %self.generation, "ignoring stale answer");
            return SubmitOutcome::Ignored;
        }
        let Some(active) = self.active.as_mut() else {
            return SubmitOutcome::Ignored;
        };

        let (correct, expected) = match active.session.record(answer.into_submitted()) {
            Ok(record) => (record.correct, record.expected),
            Err(err) => {
                warn!(error = %err, "answer arrived without a pending question");
                return SubmitOutcome::Ignored;
            }
        };
        debug!(index = active.session.index(), correct, "answer recorded");

        self.teardown();
        self.input.clear();
        self.feedback = if correct {
            Feedback::Correct
        } else {
            Feedback::Wrong { answer: expected }
        };
        self.phase = Phase::Evaluating;
        self.collaborators
            .timer
            .schedule_advance(self.generation, FEEDBACK_DELAY);
        self.present();

        SubmitOutcome::Accepted { correct }
    }

    /// Answer whatever question is on screen.
    pub fn submit_current(&mut self, answer: Answer) -> SubmitOutcome {
        self.submit(self.generation, answer)
    }

    /// One countdown unit elapsed for the question issued under `generation`.
    pub fn tick(&mut self, generation: Generation) -> TickOutcome {
        if self.phase != Phase::AwaitingAnswer || generation != self.generation {
            return TickOutcome::Ignored;
        }

        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left > 0 {
            self.present();
            return TickOutcome::Counting {
                time_left: self.time_left,
            };
        }

        debug!(%generation, "time is up");
        match self.submit(generation, Answer::Skip) {
            SubmitOutcome::Accepted { .. } => TickOutcome::Expired,
            SubmitOutcome::Ignored => TickOutcome::Ignored,
        }
    }

    /// The feedback delay scheduled under `generation` has passed.
    pub fn feedback_elapsed(&mut self, generation: Generation) -> AdvanceOutcome {
        if self.phase != Phase::Evaluating || generation != self.generation {
            return AdvanceOutcome::Ignored;
        }
        self.advance()
    }

    /// A recognizer heard something while the question issued under `generation` was up.
    pub fn speech_result(
        &mut self,
        generation: Generation,
        utterance: &RecognizedUtterance,
    ) -> SpeechOutcome {
        if self.phase != Phase::AwaitingAnswer || generation != self.generation {
            return SpeechOutcome::Ignored;
        }

        match interpret_utterance(utterance) {
            Ok(value) => match self.submit(generation, Answer::Value(value)) {
                SubmitOutcome::Accepted { correct } => SpeechOutcome::Accepted { value, correct },
                SubmitOutcome::Ignored => SpeechOutcome::Ignored,
            },
            // The recognizer is still listening after an interim result.
            Err(TranscriptRejected::Interim) => SpeechOutcome::Rejected(TranscriptRejected::Interim),
            Err(reason) => {
                debug!(%reason, text = %utterance.text, "transcript rejected");
                self.resume_listening();
                SpeechOutcome::Rejected(reason)
            }
        }
    }

    /// Append a keypad digit. Returns `false` when the key was not taken.
    pub fn press_digit(&mut self, digit: u8) -> bool {
        if self.phase != Phase::AwaitingAnswer
            || digit > 9
            || self.input.len() >= MAX_INPUT_DIGITS
        {
            return false;
        }
        self.input.push(char::from(b'0' + digit));
        self.present();
        true
    }

    pub fn clear_input(&mut self) {
        if self.phase == Phase::AwaitingAnswer && !self.input.is_empty() {
            self.input.clear();
            self.present();
        }
    }

    /// Submit the keypad buffer. An empty buffer is ignored.
    pub fn confirm_input(&mut self) -> SubmitOutcome {
        if self.input.is_empty() {
            return SubmitOutcome::Ignored;
        }
        let raw = self.input.clone();
        self.submit(self.generation, Answer::Typed(raw))
    }

    /// Abandon the session in progress without recording it. Returns `false` when idle.
    pub fn quit(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        self.teardown();
        info!(
            answered = active.session.attempts().len(),
            total = active.session.total(),
            "session stopped"
        );

        self.generation = self.generation.next();
        self.phase = Phase::Idle;
        self.shown = None;
        self.input.clear();
        self.time_left = 0;
        self.feedback = Feedback::Stopped;
        self.present();
        true
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.session();
        SessionSnapshot {
            phase: self.phase,
            generation: self.generation,
            index: session.map_or(0, Session::index),
            total: session.map_or(0, Session::total),
            question_text: self.shown.as_ref().map(|q| q.text().to_string()),
            shapes: self.shown.as_ref().and_then(Question::shapes),
            time_left: self.time_left,
            feedback: self.feedback.clone(),
            score: session.map_or(0, Session::correct),
            input: self.input.clone(),
            speech_enabled: self.speech_enabled,
        }
    }

    fn advance(&mut self) -> AdvanceOutcome {
        let Some(active) = self.active.as_mut() else {
            return AdvanceOutcome::Ignored;
        };
        if active.session.is_exhausted() {
            return self.finalize();
        }

        let question = self.generator.generate(active.session.settings());
        let time_limit = active.session.settings().difficulty().time_limit();
        if let Err(err) = active.session.begin_question(question.clone()) {
            warn!(error = %err, "could not advance session");
            return AdvanceOutcome::Ignored;
        }
        let index = active.session.index();

        self.generation = self.generation.next();
        self.phase = Phase::AwaitingAnswer;
        self.time_left = time_limit;
        self.feedback = Feedback::None;
        self.input.clear();
        debug!(generation = %self.generation, index, text = question.text(), "question asked");

        self.collaborators
            .timer
            .start_countdown(self.generation, time_limit);
        self.collaborators.speech_sink.speak(question.text());
        self.shown = Some(question);
        self.resume_listening();
        self.present();

        AdvanceOutcome::NextQuestion {
            generation: self.generation,
        }
    }

    fn finalize(&mut self) -> AdvanceOutcome {
        let Some(active) = self.active.take() else {
            return AdvanceOutcome::Ignored;
        };
        self.teardown();

        self.generation = self.generation.next();
        self.phase = Phase::Idle;
        self.shown = None;
        self.time_left = 0;

        let summary = match active.session.summarize(self.clock.now()) {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "finished session could not be summarized");
                self.feedback = Feedback::Stopped;
                self.present();
                return AdvanceOutcome::Ignored;
            }
        };

        let seconds = (summary.completed_at() - active.session.started_at()).num_seconds();
        info!(
            profile = %active.owner,
            score = summary.score(),
            total = summary.total(),
            seconds,
            "session finished"
        );
        if let Err(err) = self
            .collaborators
            .store
            .record_summary(active.owner, &summary)
        {
            warn!(error = %err, "session summary was not saved");
        }

        self.feedback = Feedback::Finished {
            score: summary.score(),
            total: summary.total(),
        };
        self.present();
        AdvanceOutcome::Finished(summary)
    }

    fn resume_listening(&mut self) {
        if !self.speech_enabled {
            return;
        }
        if let Err(err) = self
            .collaborators
            .speech_source
            .resume_listening(self.generation)
        {
            warn!(error = %err, "continuing with keypad input only");
            self.speech_enabled = false;
        }
    }

    fn teardown(&mut self) {
        self.collaborators.timer.cancel();
        if self.speech_enabled {
            self.collaborators.speech_source.stop_listening();
        }
        self.collaborators.speech_sink.cancel();
    }

    fn present(&mut self) {
        let snapshot = self.snapshot();
        self.collaborators.presenter.present(&snapshot);
    }
}

impl<R> fmt::Debug for SessionEngine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("profile", &self.profile)
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("time_left", &self.time_left)
            .field("speech_enabled", &self.speech_enabled)
            .finish_non_exhaustive()
    }
}
