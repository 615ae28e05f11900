//! End-to-end progression tests for Py-SHOT
//!
//! These tests drive a session controller through lesson selection,
//! attempts and advancement, using the built-in course and the sample
//! curriculum fixture.

use std::path::PathBuf;
use std::sync::Arc;

use pyshot_engine::{
    curriculum, Advance, Config, LessonDefinition, LessonRegistry, ProgressStore, PyshotError,
    Rule, RuleSet, SessionController, SharedSession, SimValue,
};

/// Path to the sample course fixture.
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/sample-course")
}

/// A session over an in-memory store.
fn session_over(registry: LessonRegistry) -> SessionController {
    SessionController::new(ProgressStore::in_memory(Arc::new(registry)))
}

/// The two-lesson registry: a reading intro and a variables exercise.
fn intro_and_variables() -> LessonRegistry {
    LessonRegistry::new(vec![
        LessonDefinition::new("intro", 0, "Intro", RuleSet::acknowledge()),
        LessonDefinition::new(
            "v",
            1,
            "Variables",
            RuleSet::new(vec![Rule::assign_value("edad", "25")]),
        ),
    ])
    .expect("Failed to build registry")
}

/// Tests the intro → variables scenario end to end.
#[test]
fn test_intro_then_variables() {
    let mut session = session_over(intro_and_variables());

    session.select_lesson("intro").expect("intro is unlocked");
    let view = session.submit("");
    assert!(view.verdict.expect("verdict").passed);
    assert_eq!(view.unlocked_ids, vec!["intro", "v"]);

    session.select_lesson("v").expect("v is unlocked");
    let view = session.submit("edad = 25");
    let verdict = view.verdict.expect("verdict");

    assert!(verdict.passed);
    assert_eq!(verdict.captured_state.get("edad"), Some(&SimValue::Int(25)));
    assert_eq!(view.completed_ids, vec!["intro", "v"]);
    assert_eq!(view.simulated_variables.get("edad"), Some(&SimValue::Int(25)));
}

/// Tests that a locked lesson cannot be selected and nothing changes.
#[test]
fn test_locked_selection_has_no_effect() {
    let mut session = session_over(intro_and_variables());
    let before = session.view();

    let err = session.select_lesson("v").expect_err("v starts locked");
    assert!(matches!(err, PyshotError::LessonLocked { ref id } if id == "v"));
    assert!(err.is_user_facing());
    assert_eq!(session.view(), before);
}

/// Tests specific and generic feedback through the session.
#[test]
fn test_wrong_value_gets_specific_feedback() {
    let mut session = session_over(intro_and_variables());
    session.select_lesson("intro").expect("intro is unlocked");
    session.submit("");
    session.select_lesson("v").expect("v is unlocked");

    let wrong = session.submit("edad = 30").verdict.expect("verdict");
    let absent = session.submit("print(1)").verdict.expect("verdict");
    let commented = session.submit("# edad = 25").verdict.expect("verdict");

    assert!(!wrong.passed && !absent.passed && !commented.passed);
    assert_ne!(wrong.feedback, absent.feedback);
    assert_eq!(absent.feedback, commented.feedback);
    assert!(session.submit("edad = 25  # listo").verdict.expect("verdict").passed);
}

/// Tests that the whole built-in course can be completed in order.
#[test]
fn test_builtin_course_completes_in_order() {
    let registry = curriculum::builtin().expect("Built-in curriculum is valid");
    let examples: Vec<(String, String)> = registry
        .all()
        .iter()
        .map(|lesson| (lesson.id.clone(), lesson.example.clone()))
        .collect();
    let mut session = session_over(registry);

    session.select_lesson("intro").expect("intro is unlocked");
    for (index, (id, example)) in examples.iter().enumerate() {
        assert_eq!(session.status().lesson_id(), Some(id.as_str()));

        let view = session.submit(example);
        assert!(view.verdict.expect("verdict").passed, "lesson {id} failed");

        let outcome = session.advance();
        if index + 1 < examples.len() {
            assert!(outcome.moved(), "could not advance past {id}");
        } else {
            assert!(matches!(outcome, Advance::NoFurtherLesson(_)));
        }
    }

    let view = session.view();
    assert_eq!(view.completed_ids.len(), 16);
    assert_eq!(
        view.simulated_variables.get("nombre"),
        Some(&SimValue::Token("input(\"Tu nombre: \")".to_string()))
    );
}

/// Tests that lessons unlock strictly one at a time.
#[test]
fn test_unlocks_follow_order() {
    let registry = curriculum::builtin().expect("Built-in curriculum is valid");
    let mut session = session_over(registry);

    session.select_lesson("intro").expect("intro is unlocked");
    session.submit("");
    assert!(session.select_lesson("1-2").is_err());

    session.select_lesson("1-1").expect("1-1 is unlocked");
    session.submit("x = 1");
    assert!(session.select_lesson("1-2").is_ok());
    assert!(session.select_lesson("1-3").is_err());

    // Completing again unlocks nothing new
    session.select_lesson("1-1").expect("1-1 is unlocked");
    session.submit("x = 2");
    assert_eq!(session.view().unlocked_ids, vec!["intro", "1-1", "1-2"]);
    assert_eq!(session.variables().get("x"), Some(&SimValue::Int(2)));
}

/// Tests the sample curriculum fixture through the configuration file.
#[test]
fn test_sample_course_from_config() {
    let dir = fixture_path();
    let config = Config::load_from_dir(&dir).expect("Failed to load config");
    assert_eq!(config.storage_key, "fixture.progress");

    let curriculum_path = config.curriculum_in(&dir).expect("curriculum set");
    assert_eq!(config.state_dir_in(&dir), dir.join(".pyshot"));
    let registry = curriculum::load(&curriculum_path).expect("Failed to load curriculum");
    assert_eq!(registry.len(), 3);

    let mut session = session_over(registry);
    session.select_lesson("intro").expect("intro is unlocked");
    session.submit("");
    session.advance();
    session.submit("edad = 25");
    assert!(session.advance().moved());

    let lesson = session.current_lesson().expect("lesson loaded");
    assert_eq!(lesson.title, "Imprimir");

    let wrong = session.submit("print(nombre)").verdict.expect("verdict");
    assert!(!wrong.passed);
    assert!(wrong.feedback.contains("argumento"));

    let right = session.submit("saludo = 'hola'\nprint(\"hola\")").verdict.expect("verdict");
    assert!(right.passed);
    assert_eq!(right.feedback, "¡Bien hecho!");
    assert_eq!(right.captured_state.get("saludo"), Some(&SimValue::from("hola")));
}

/// Tests that concurrent submissions through a shared session keep the invariants.
#[test]
fn test_shared_session_from_threads() {
    let shared = SharedSession::new(session_over(intro_and_variables()));
    shared.select_lesson("intro").expect("intro is unlocked");
    shared.submit("");
    shared.advance();

    let handles: Vec<_> = ["edad = 30", "edad = 25", "edad = 1", "edad = 25"]
        .into_iter()
        .map(|code| {
            let shared = shared.clone();
            std::thread::spawn(move || shared.submit(code))
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }

    let view = shared.view();
    assert_eq!(view.completed_ids, vec!["intro", "v"]);
    assert_eq!(view.simulated_variables.get("edad"), Some(&SimValue::Int(25)));
}
