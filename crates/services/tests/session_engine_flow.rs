use std::time::Duration;

use math_core::QuestionGenerator;
use math_core::model::{Answer, Generation, Mode, ProfileId, SessionSummary, SettingsDraft};
use math_core::time::fixed_clock;
use services::session::{Presenter, ProfileStore, Timer};
use services::{
    AdvanceOutcome, AppServices, Collaborators, Feedback, SessionEngine, SessionSnapshot,
    settings_for_profile,
};
use storage::repository::StorageError;
use tokio::sync::mpsc;

struct Quiet;

impl Presenter for Quiet {
    fn present(&mut self, _snapshot: &SessionSnapshot) {}
}

impl Timer for Quiet {
    fn start_countdown(&mut self, _generation: Generation, _units: u32) {}
    fn schedule_advance(&mut self, _generation: Generation, _delay: Duration) {}
    fn cancel(&mut self) {}
}

struct ChannelStore(mpsc::UnboundedSender<(ProfileId, SessionSummary)>);

impl ProfileStore for ChannelStore {
    fn record_summary(
        &mut self,
        profile: ProfileId,
        summary: &SessionSummary,
    ) -> Result<(), StorageError> {
        self.0
            .send((profile, summary.clone()))
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn engine(tx: mpsc::UnboundedSender<(ProfileId, SessionSummary)>) -> SessionEngine {
    SessionEngine::with_generator(
        QuestionGenerator::seeded(42),
        Collaborators::new(Quiet, Quiet, ChannelStore(tx)),
    )
    .with_clock(fixed_clock())
}

#[tokio::test]
async fn finished_sessions_land_in_profile_history() {
    let services = AppServices::in_memory(fixed_clock());
    let profiles = services.profiles();
    let mia = profiles.create_profile("Mia", 7, 2).await.unwrap();
    let selected = profiles.select_profile(mia.id()).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut engine = engine(tx);
    engine.select_profile(selected.id());

    let overrides = SettingsDraft {
        mode: Some(Mode::AddSubtract),
        ..SettingsDraft::default()
    };
    let settings = settings_for_profile(&selected, overrides).unwrap();
    let mut generation = engine.start(settings).unwrap();

    loop {
        let answer = engine.session().unwrap().current().unwrap().answer();
        engine.submit(generation, Answer::Typed(answer.to_string()));
        match engine.feedback_elapsed(generation) {
            AdvanceOutcome::NextQuestion { generation: next } => generation = next,
            AdvanceOutcome::Finished(_) => break,
            AdvanceOutcome::Ignored => panic!("advance ignored"),
        }
    }
    assert_eq!(
        engine.snapshot().feedback,
        Feedback::Finished { score: 10, total: 10 }
    );

    let (owner, summary) = rx.recv().await.expect("summary handed off");
    assert_eq!(owner, mia.id());
    profiles.record_summary(owner, &summary).await.unwrap();

    let history = profiles.recent_history(mia.id()).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].mode, Mode::AddSubtract);
    assert_eq!((history[0].score, history[0].total), (10, 10));
}

#[tokio::test]
async fn quitting_leaves_history_untouched() {
    let services = AppServices::in_memory(fixed_clock());
    let profiles = services.profiles();
    let leo = profiles.create_profile("Leo", 9, 4).await.unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut engine = engine(tx);
    engine.select_profile(leo.id());
    let settings = settings_for_profile(&leo, SettingsDraft::default()).unwrap();
    let generation = engine.start(settings).unwrap();

    engine.submit(generation, Answer::Skip);
    assert!(engine.quit());
    drop(engine);

    assert!(rx.recv().await.is_none());
    assert!(profiles.recent_history(leo.id()).await.unwrap().is_empty());
}
