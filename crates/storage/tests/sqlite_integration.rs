use chrono::Duration;
use math_core::model::{Difficulty, Mode, Profile, ProfileId, SessionSummary};
use math_core::time::fixed_now;
use storage::repository::{HistoryRepository, ProfileRepository, Storage, StorageError};
use storage::sqlite::SqliteRepository;

fn build_profile(name: &str, grade: u8, minutes: i64) -> Profile {
    Profile::new(
        ProfileId::generate(),
        name,
        6 + grade,
        grade,
        fixed_now() + Duration::minutes(minutes),
    )
    .unwrap()
}

fn summary(minutes: i64, mode: Mode, score: u32) -> SessionSummary {
    SessionSummary::from_persisted(
        fixed_now() + Duration::minutes(minutes),
        mode,
        score,
        10,
        Difficulty::Hard,
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrips_profiles_and_selection() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_profiles?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    // Running twice leaves the schema alone.
    repo.migrate().await.expect("migrate again");

    let mia = build_profile("Mia", 2, 0);
    let leo = build_profile("Leo", 4, 1);
    repo.upsert_profile(&leo).await.unwrap();
    repo.upsert_profile(&mia).await.unwrap();

    let fetched = repo.get_profile(mia.id()).await.expect("fetch");
    assert_eq!(fetched, mia);

    let names: Vec<String> = repo
        .list_profiles()
        .await
        .unwrap()
        .iter()
        .map(|p| p.name().to_string())
        .collect();
    assert_eq!(names, vec!["Mia", "Leo"]);

    let renamed = Profile::new(mia.id(), "Mia R.", 8, 3, mia.created_at()).unwrap();
    repo.upsert_profile(&renamed).await.unwrap();
    assert_eq!(repo.get_profile(mia.id()).await.unwrap().label(), "Mia R. (Grade 3)");

    assert_eq!(repo.current_profile().await.unwrap(), None);
    repo.set_current_profile(Some(leo.id())).await.unwrap();
    assert_eq!(repo.current_profile().await.unwrap(), Some(leo.id()));
    repo.set_current_profile(None).await.unwrap();
    assert_eq!(repo.current_profile().await.unwrap(), None);

    let err = repo
        .set_current_profile(Some(ProfileId::generate()))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_history_is_most_recent_first_and_limited() {
    let storage = Storage::sqlite("sqlite:file:memdb_history?mode=memory&cache=shared")
        .await
        .expect("storage");

    let mia = build_profile("Mia", 2, 0);
    let leo = build_profile("Leo", 3, 0);
    storage.profiles.upsert_profile(&mia).await.unwrap();
    storage.profiles.upsert_profile(&leo).await.unwrap();

    for (minutes, score) in [(0, 3), (10, 6), (20, 9)] {
        storage
            .history
            .append_summary(mia.id(), &summary(minutes, Mode::AddSubtract, score))
            .await
            .unwrap();
    }
    storage
        .history
        .append_summary(leo.id(), &summary(30, Mode::MoreLess, 10))
        .await
        .unwrap();

    let history = storage.history.list_history(mia.id(), 10).await.unwrap();
    let scores: Vec<u32> = history.iter().map(|e| e.summary.score()).collect();
    assert_eq!(scores, vec![9, 6, 3]);
    assert!(history.iter().all(|e| e.profile_id == mia.id()));
    assert_eq!(history[0].summary.mode(), Mode::AddSubtract);
    assert_eq!(history[0].summary.difficulty(), Difficulty::Hard);
    assert_eq!(history[0].summary.completed_at(), fixed_now() + Duration::minutes(20));

    let limited = storage.history.list_history(mia.id(), 2).await.unwrap();
    assert_eq!(limited.len(), 2);

    let leo_history = storage.history.list_history(leo.id(), 10).await.unwrap();
    assert_eq!(leo_history.len(), 1);
    assert_eq!(leo_history[0].summary.mode(), Mode::MoreLess);

    let err = storage
        .history
        .append_summary(ProfileId::generate(), &summary(40, Mode::Tables, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}
