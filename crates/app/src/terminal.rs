//! Line-based quiz host: stdin for answers, tokio tasks for the countdown and the
//! feedback pause, stdout for questions.

use std::time::Duration;

use math_core::model::{Answer, Generation, ProfileId, SessionSummary, Settings, parse_typed};
use math_core::speech::RecognizedUtterance;
use services::session::{Presenter, ProfileStore, Timer};
use services::{
    AdvanceOutcome, Collaborators, Feedback, Phase, ProfileService, SessionEngine, SessionSnapshot,
    SpeechOutcome,
};
use storage::repository::StorageError;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

const TICK: Duration = Duration::from_secs(1);

/// Countdown units at or below which the remaining time is printed.
const LOW_TIME_WARNING: u32 = 5;

#[derive(Debug, Clone, Copy)]
enum HostEvent {
    Tick(Generation),
    Advance(Generation),
}

//
// ─── TIMER ─────────────────────────────────────────────────────────────────────
//

struct TokioTimer {
    events: mpsc::UnboundedSender<HostEvent>,
    countdown: Option<JoinHandle<()>>,
    advance: Option<JoinHandle<()>>,
}

impl TokioTimer {
    fn new(events: mpsc::UnboundedSender<HostEvent>) -> Self {
        Self {
            events,
            countdown: None,
            advance: None,
        }
    }
}

impl Timer for TokioTimer {
    fn start_countdown(&mut self, generation: Generation, units: u32) {
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            for _ in 0..units {
                tokio::time::sleep(TICK).await;
                if events.send(HostEvent::Tick(generation)).is_err() {
                    break;
                }
            }
        });
        if let Some(previous) = self.countdown.replace(task) {
            previous.abort();
        }
    }

    fn schedule_advance(&mut self, generation: Generation, delay: Duration) {
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(HostEvent::Advance(generation));
        });
        if let Some(previous) = self.advance.replace(task) {
            previous.abort();
        }
    }

    fn cancel(&mut self) {
        for task in [self.countdown.take(), self.advance.take()].into_iter().flatten() {
            task.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

//
// ─── PRESENTER ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct TerminalPresenter {
    shown: Option<Generation>,
    feedback: Feedback,
    time_left: u32,
}

impl Presenter for TerminalPresenter {
    fn present(&mut self, snapshot: &SessionSnapshot) {
        if snapshot.phase == Phase::AwaitingAnswer && self.shown != Some(snapshot.generation) {
            self.shown = Some(snapshot.generation);
            self.time_left = snapshot.time_left;
            let text = snapshot.question_text.as_deref().unwrap_or_default();
            println!();
            println!(
                "Question {}/{}  (score {}, {} to go, {}s)",
                snapshot.index,
                snapshot.total,
                snapshot.score,
                snapshot.remaining(),
                snapshot.time_left
            );
            match snapshot.shapes {
                Some(count) => println!("  {text}   {}", "●".repeat(count as usize)),
                None => println!("  {text}"),
            }
        }

        if snapshot.phase == Phase::AwaitingAnswer
            && snapshot.time_left != self.time_left
            && snapshot.time_left <= LOW_TIME_WARNING
        {
            println!("  … {}s left", snapshot.time_left);
        }
        self.time_left = snapshot.time_left;

        if snapshot.feedback != self.feedback {
            self.feedback = snapshot.feedback.clone();
            if let Some(message) = snapshot.feedback.message() {
                println!("  {message}");
            }
        }
    }
}

//
// ─── SUMMARY HAND-OFF ──────────────────────────────────────────────────────────
//

struct ChannelStore(mpsc::UnboundedSender<(ProfileId, SessionSummary)>);

impl ProfileStore for ChannelStore {
    fn record_summary(
        &mut self,
        profile: ProfileId,
        summary: &SessionSummary,
    ) -> Result<(), StorageError> {
        self.0
            .send((profile, summary.clone()))
            .map_err(|err| StorageError::Connection(err.to_string()))
    }
}

//
// ─── LOOP ──────────────────────────────────────────────────────────────────────
//

fn print_controls() {
    println!("Type the answer and press Enter. Number words work too (\"twenty three\").");
    println!("  s = skip, c = clear, q = quit");
}

/// Run one quiz on the terminal. Returns the summary when the learner finishes.
///
/// # Errors
///
/// Returns `SessionError::NoActiveProfile` without a learner, or a storage error if
/// the finished session cannot be saved.
pub async fn play(
    profiles: &ProfileService,
    learner: Option<ProfileId>,
    settings: Settings,
) -> Result<Option<SessionSummary>, Box<dyn std::error::Error>> {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let (summary_tx, mut summaries) = mpsc::unbounded_channel();

    let collaborators = Collaborators::new(
        TerminalPresenter::default(),
        TokioTimer::new(events_tx),
        ChannelStore(summary_tx),
    );
    let mut engine = SessionEngine::new(collaborators);
    if let Some(id) = learner {
        engine.select_profile(id);
    }

    print_controls();
    engine.start(settings)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut finished = None;
    // Finishing and quitting both leave the engine idle.
    while engine.snapshot().is_active() {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => handle_line(&mut engine, line.trim()),
                None => {
                    engine.quit();
                }
            },
            Some(event) = events.recv() => match event {
                HostEvent::Tick(generation) => {
                    engine.tick(generation);
                }
                HostEvent::Advance(generation) => {
                    if let AdvanceOutcome::Finished(summary) = engine.feedback_elapsed(generation) {
                        finished = Some(summary);
                    }
                }
            },
        }
    }
    drop(engine);

    while let Some((owner, summary)) = summaries.recv().await {
        profiles.record_summary(owner, &summary).await?;
    }
    Ok(finished)
}

/// Route one line of input.
fn handle_line(engine: &mut SessionEngine, line: &str) {
    match line {
        "" => {}
        "q" | "quit" => {
            engine.quit();
        }
        "s" | "skip" => {
            engine.submit_current(Answer::Skip);
        }
        "c" | "clear" => engine.clear_input(),
        digits if is_keypad_entry(digits) => {
            for d in digits.bytes() {
                engine.press_digit(d - b'0');
            }
            engine.confirm_input();
        }
        other if parse_typed(other).is_ok() => {
            engine.submit_current(Answer::Typed(other.to_string()));
        }
        words => {
            let utterance = RecognizedUtterance::final_result(words, 1.0);
            if let SpeechOutcome::Rejected(reason) =
                engine.speech_result(engine.generation(), &utterance)
            {
                warn!(%reason, "typed words not understood");
                println!("  Didn't catch a number, try again.");
            }
        }
    }
}

fn is_keypad_entry(line: &str) -> bool {
    (1..=services::session::MAX_INPUT_DIGITS).contains(&line.len())
        && line.bytes().all(|b| b.is_ascii_digit())
}
