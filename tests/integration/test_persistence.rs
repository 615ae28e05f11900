//! Persistence integration tests for Py-SHOT
//!
//! These tests save progress through a file-backed store and read it back
//! with fresh store instances, the way separate runs of the CLI would.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pyshot_engine::{
    curriculum, FileStore, KeyValueStore, LessonRegistry, ProgressStore, SessionController,
    DEFAULT_STORAGE_KEY, STATE_VERSION,
};

/// A fresh, empty state directory unique to `name`.
fn state_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pyshot_it_{name}"));
    std::fs::remove_dir_all(&dir).ok();
    dir
}

fn builtin() -> Arc<LessonRegistry> {
    Arc::new(curriculum::builtin().expect("Built-in curriculum is valid"))
}

/// A controller over a new `FileStore` instance rooted at `dir`.
fn open(dir: &Path, registry: &Arc<LessonRegistry>) -> SessionController {
    let store = ProgressStore::open(Arc::clone(registry), FileStore::new(dir), DEFAULT_STORAGE_KEY);
    SessionController::new(store)
}

/// Tests that progress written by one session is seen by the next.
#[test]
fn test_progress_survives_restart() {
    let dir = state_dir("restart");
    let registry = builtin();

    {
        let mut session = open(&dir, &registry);
        session.select_lesson("intro").expect("intro is unlocked");
        session.submit("");
        session.advance();
        let view = session.submit("edad = 25");
        assert!(view.persistence_error.is_none());
    }

    let session = open(&dir, &registry);
    let view = session.view();
    assert_eq!(view.completed_ids, vec!["intro", "1-1"]);
    assert_eq!(view.unlocked_ids, vec!["intro", "1-1", "1-2"]);

    // Simulated variables belong to the session, not to saved progress
    assert!(view.simulated_variables.is_empty());
    assert!(view.current_lesson_id.is_none());

    std::fs::remove_dir_all(&dir).ok();
}

/// Tests the on-disk record format.
#[test]
fn test_record_format() {
    let dir = state_dir("format");
    let registry = builtin();

    let mut session = open(&dir, &registry);
    session.select_lesson("intro").expect("intro is unlocked");
    session.submit("");

    let store = FileStore::new(&dir);
    let bytes = store
        .read(DEFAULT_STORAGE_KEY)
        .expect("Failed to read store")
        .expect("record written");
    let record: serde_json::Value = serde_json::from_slice(&bytes).expect("valid JSON");

    assert_eq!(record["version"], STATE_VERSION);
    assert_eq!(record["completedIds"], serde_json::json!(["intro"]));
    assert_eq!(record["unlockedIds"], serde_json::json!(["1-1", "intro"]));
    assert!(record["savedAt"].is_string());

    std::fs::remove_dir_all(&dir).ok();
}

/// Tests that a corrupt record falls back to the default state.
#[test]
fn test_corrupt_record_falls_back_to_defaults() {
    let dir = state_dir("corrupt");
    std::fs::create_dir_all(&dir).expect("Failed to create dir");
    std::fs::write(
        FileStore::new(&dir).path_for(DEFAULT_STORAGE_KEY),
        "{ this is not json",
    )
    .expect("Failed to write corrupt record");

    let mut session = open(&dir, &builtin());
    assert_eq!(session.view().unlocked_ids, vec!["intro"]);

    // The next save replaces the corrupt record
    session.select_lesson("intro").expect("intro is unlocked");
    let view = session.submit("");
    assert!(view.persistence_error.is_none());
    assert_eq!(open(&dir, &builtin()).view().completed_ids, vec!["intro"]);

    std::fs::remove_dir_all(&dir).ok();
}

/// Tests that a hand-edited record is repaired against the curriculum.
#[test]
fn test_inconsistent_record_is_repaired() {
    let dir = state_dir("repair");
    let mut store = FileStore::new(&dir);
    store
        .write(
            DEFAULT_STORAGE_KEY,
            br#"{"unlockedIds": ["zz-removed"], "completedIds": ["intro", "1-1", "gone"]}"#,
        )
        .expect("Failed to write record");

    let view = open(&dir, &builtin()).view();
    assert_eq!(view.completed_ids, vec!["intro", "1-1"]);
    assert_eq!(view.unlocked_ids, vec!["intro", "1-1", "1-2"]);

    std::fs::remove_dir_all(&dir).ok();
}

/// Tests that reset is persisted too.
#[test]
fn test_reset_is_persisted() {
    let dir = state_dir("reset");
    let registry = builtin();

    let mut session = open(&dir, &registry);
    session.select_lesson("intro").expect("intro is unlocked");
    session.submit("");
    let view = session.reset();
    assert!(view.persistence_error.is_none());

    let view = open(&dir, &registry).view();
    assert_eq!(view.unlocked_ids, vec!["intro"]);
    assert!(view.completed_ids.is_empty());

    std::fs::remove_dir_all(&dir).ok();
}

/// Tests that an unwritable state directory keeps progress in memory.
#[test]
fn test_unwritable_state_dir_keeps_session_going() {
    let blocker = state_dir("blocker");
    std::fs::write(&blocker, b"a file, not a directory").expect("Failed to write blocker");

    let mut session = open(&blocker, &builtin());
    session.select_lesson("intro").expect("intro is unlocked");
    let view = session.submit("");

    assert!(view.verdict.expect("verdict").passed);
    assert!(view.persistence_error.is_some());
    assert!(session.select_lesson("1-1").is_ok());

    std::fs::remove_file(&blocker).ok();
}
