use anyhow::Result;
use test_utils::architecture_fixture;
use tokio::fs;

use super::SessionStore;
use super::INTERRUPTED_ERROR;
use crate::domain::models::Architecture;
use crate::domain::models::StoreError;
use crate::domain::models::TurnOutcome;

fn fixture() -> Architecture {
    return serde_json::from_str(architecture_fixture()).unwrap();
}

#[test]
fn it_creates_short_ids() {
    let id = SessionStore::create_id();
    assert_eq!(id.len(), 13);
    assert_eq!(id.split('-').count(), 2);
}

#[tokio::test]
async fn it_starts_empty_without_a_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = SessionStore::load(dir.path().join("sessions.yaml")).await;

    assert!(store.list_sessions().is_empty());
    assert!(store.active_session().is_none());
    assert!(store.is_persistent());
    assert!(store.take_warnings().is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_creates_and_activates_sessions() -> Result<()> {
    let mut store = SessionStore::in_memory();
    let first = store.create_session("Storefront").await;
    let second = store.create_session("  ").await;

    let sessions = store.list_sessions();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, first);
    assert_eq!(sessions[0].name, "Storefront");
    assert_eq!(sessions[1].name, format!("Untitled session {second}"));
    assert_eq!(store.active_session().unwrap().id, second);

    store.select_active(&first).await?;
    assert_eq!(store.active_session().unwrap().id, first);

    return Ok(());
}

#[tokio::test]
async fn it_reports_unknown_sessions() {
    let mut store = SessionStore::in_memory();

    assert_eq!(
        store.get_session("missing").err(),
        Some(StoreError::NotFound("missing".to_string()))
    );
    assert_eq!(
        store.rename_session("missing", "x").await,
        Err(StoreError::NotFound("missing".to_string()))
    );
    assert_eq!(
        store.delete_session("missing").await,
        Err(StoreError::NotFound("missing".to_string()))
    );
    assert_eq!(
        store.select_active("missing").await,
        Err(StoreError::NotFound("missing".to_string()))
    );
    assert_eq!(
        store.append_turn("missing", "x").await,
        Err(StoreError::NotFound("missing".to_string()))
    );
}

#[tokio::test]
async fn it_renames_and_deletes_sessions() -> Result<()> {
    let mut store = SessionStore::in_memory();
    let first = store.create_session("One").await;
    let second = store.create_session("Two").await;

    store.rename_session(&first, "Renamed").await?;
    assert_eq!(store.get_session(&first)?.name, "Renamed");

    store.delete_session(&second).await?;
    assert!(store.active_session().is_none());
    assert_eq!(store.list_sessions().len(), 1);

    store.create_session("Three").await;
    assert_eq!(store.delete_all_sessions().await, 2);
    assert!(store.list_sessions().is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_resolves_turns_once() -> Result<()> {
    let mut store = SessionStore::in_memory();
    let session_id = store.create_session("Test").await;
    let turn_id = store.append_turn(&session_id, "A web app").await?;

    assert!(store.find_turn(&turn_id).unwrap().is_pending());
    assert!(store.latest_architecture(&session_id).is_none());

    store.complete_turn(&turn_id, fixture(), vec![]).await?;
    assert_eq!(store.latest_architecture(&session_id), Some(&fixture()));

    assert_eq!(
        store.fail_turn(&turn_id, "late", None).await,
        Err(StoreError::TurnAlreadyResolved(turn_id.to_string()))
    );
    assert_eq!(
        store.complete_turn("missing", fixture(), vec![]).await,
        Err(StoreError::TurnNotFound("missing".to_string()))
    );

    return Ok(());
}

#[tokio::test]
async fn it_keeps_latest_completed_architecture_after_failures() -> Result<()> {
    let mut store = SessionStore::in_memory();
    let session_id = store.create_session("Test").await;

    let first = store.append_turn(&session_id, "A web app").await?;
    store.complete_turn(&first, fixture(), vec![]).await?;

    let second = store.append_turn(&session_id, "add a cache").await?;
    store
        .fail_turn(&second, "bad json", Some("oops".to_string()))
        .await?;

    assert_eq!(store.latest_architecture(&session_id), Some(&fixture()));
    assert_eq!(
        store.last_failed_requirement(&session_id),
        Some("add a cache".to_string())
    );

    let session = store.get_session(&session_id)?;
    assert_eq!(session.turns.len(), 2);
    assert_eq!(session.turns[0].requirement, "A web app");
    assert_eq!(session.turns[1].requirement, "add a cache");

    return Ok(());
}

#[tokio::test]
async fn it_reloads_sessions_in_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("nested").join("sessions.yaml");

    let mut store = SessionStore::load(file_path.clone()).await;
    let session_id = store.create_session("Persisted").await;
    let mut turn_ids = vec![];
    for idx in 0..3 {
        let turn_id = store
            .append_turn(&session_id, &format!("requirement {idx}"))
            .await?;
        store
            .complete_turn(&turn_id, fixture(), vec![format!("warning {idx}")])
            .await?;
        turn_ids.push(turn_id);
    }
    store.flush().await?;

    let reloaded = SessionStore::load(file_path).await;
    let session = reloaded.get_session(&session_id)?;
    assert_eq!(reloaded.active_session().unwrap().id, session_id);
    assert_eq!(session.name, "Persisted");
    assert_eq!(
        session.turns.iter().map(|e| return e.id.to_string()).collect::<Vec<String>>(),
        turn_ids
    );
    assert_eq!(session.turns[2].requirement, "requirement 2");
    assert_eq!(
        session.turns[1].outcome,
        TurnOutcome::Completed {
            architecture: fixture(),
            warnings: vec!["warning 1".to_string()],
        }
    );

    return Ok(());
}

#[tokio::test]
async fn it_fails_pending_turns_on_load() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("sessions.yaml");

    let mut store = SessionStore::load(file_path.clone()).await;
    let session_id = store.create_session("Crashed").await;
    let turn_id = store.append_turn(&session_id, "A web app").await?;
    drop(store);

    let reloaded = SessionStore::load(file_path.clone()).await;
    let turn = reloaded.find_turn(&turn_id).unwrap();
    assert_eq!(
        turn.outcome,
        TurnOutcome::Failed {
            error: INTERRUPTED_ERROR.to_string(),
            raw_response: None,
        }
    );

    let payload = fs::read_to_string(&file_path).await?;
    assert!(!payload.contains("status: pending"));

    return Ok(());
}

#[tokio::test]
async fn it_moves_corrupt_files_aside() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("sessions.yaml");
    fs::write(&file_path, "sessions: [ {{ not yaml").await?;

    let mut store = SessionStore::load(file_path.clone()).await;
    assert!(store.list_sessions().is_empty());
    assert!(store.is_persistent());

    let warnings = store.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("sessions.yaml.corrupt"));
    assert!(dir.path().join("sessions.yaml.corrupt").exists());

    store.create_session("Fresh").await;
    let corrupt = fs::read_to_string(dir.path().join("sessions.yaml.corrupt")).await?;
    assert_eq!(corrupt, "sessions: [ {{ not yaml");

    return Ok(());
}

#[tokio::test]
async fn it_saves_atomically() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("sessions.yaml");

    let mut store = SessionStore::load(file_path.clone()).await;
    store.create_session("Atomic").await;

    assert!(file_path.exists());
    assert!(!dir.path().join("sessions.yaml.tmp").exists());

    let payload = fs::read_to_string(&file_path).await?;
    assert!(payload.contains("name: Atomic"));

    return Ok(());
}

#[tokio::test]
async fn it_removes_the_temporary_file_when_saving_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file_path = dir.path().join("sessions.yaml");

    let mut store = SessionStore::load(file_path.clone()).await;
    // A directory in place of the file makes the final rename fail.
    fs::create_dir_all(file_path.join("occupied")).await?;
    store.create_session("Blocked").await;

    assert!(!store.is_persistent());
    assert_eq!(store.take_warnings().len(), 1);
    assert!(!dir.path().join("sessions.yaml.tmp").exists());
    assert!(file_path.is_dir());

    return Ok(());
}

#[tokio::test]
async fn it_degrades_to_memory_when_saving_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").await?;

    let mut store = SessionStore::load(blocker.join("sessions.yaml")).await;
    let session_id = store.create_session("Volatile").await;

    assert!(!store.is_persistent());
    assert_eq!(store.get_session(&session_id)?.name, "Volatile");
    let warnings = store.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("memory only"));

    return Ok(());
}
