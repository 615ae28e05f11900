//! Py-SHOT tutorial engine
//!
//! Drives a gamified, lesson-by-lesson programming tutorial: an ordered
//! lesson registry, text validators that judge learner submissions, the
//! unlock progression, and the simulated variable panel.
//!
//! ```
//! use std::sync::Arc;
//! use pyshot_engine::{curriculum, ProgressStore, SessionController};
//!
//! let registry = Arc::new(curriculum::builtin()?);
//! let mut session = SessionController::new(ProgressStore::in_memory(registry));
//!
//! session.select_lesson("intro")?;
//! assert!(session.submit("").verdict.is_some_and(|v| v.passed));
//! assert!(session.advance().moved());
//!
//! let view = session.submit("edad = 25");
//! assert_eq!(view.completed_ids, vec!["intro", "1-1"]);
//! # Ok::<(), pyshot_engine::PyshotError>(())
//! ```

pub mod comments;
pub mod config;
pub mod curriculum;
pub mod error;
pub mod lesson;
pub mod progress;
pub mod rules;
pub mod session;
pub mod storage;
pub mod validator;
pub mod value;
pub mod variables;

pub use comments::strip_comments;
pub use config::{Config, CONFIG_FILE_NAME};
pub use curriculum::{CurriculumFile, LessonConfig, MAX_CURRICULUM_SIZE};
pub use error::{PyshotError, Result};
pub use lesson::{LessonDefinition, LessonRegistry};
pub use progress::{
    ProgressRecord, ProgressState, ProgressStore, DEFAULT_STORAGE_KEY, STATE_VERSION,
};
pub use rules::{Captures, Predicate, Rule, RuleError, RuleOutcome, DEFAULT_WINDOW};
pub use session::{Advance, SessionController, SessionStatus, SessionView, SharedSession};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use validator::{RuleSet, Validator, Verdict, DEFAULT_SUCCESS_FEEDBACK};
pub use value::SimValue;
pub use variables::SimulatedVariables;
