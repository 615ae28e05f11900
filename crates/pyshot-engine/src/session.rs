//! The session controller: the only stateful control flow in the engine.
//!
//! ```text
//! Idle --select_lesson(id)--> LessonLoaded(id)
//! LessonLoaded(id) --submit(text)--> [evaluating] --> LessonLoaded(id) + verdict
//! LessonLoaded(id) --advance()--> LessonLoaded(next)   (only when id is completed)
//! any --reset()--> Idle
//! ```
//!
//! Evaluation is synchronous, so the evaluating step is never observable
//! from outside. Every transition returns a [`SessionView`] for rendering.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PyshotError, Result};
use crate::lesson::{LessonDefinition, LessonRegistry};
use crate::progress::{ProgressState, ProgressStore};
use crate::validator::Verdict;
use crate::value::SimValue;
use crate::variables::SimulatedVariables;

/// Message shown when [`SessionController::advance`] has nowhere to go.
pub const NO_FURTHER_LESSON: &str = "No hay más lecciones disponibles.";

// ============================================================================
// SessionStatus
// ============================================================================

/// Where the controller is in its state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "lessonId", rename_all = "snake_case")]
pub enum SessionStatus {
    /// No lesson selected yet.
    #[default]
    Idle,
    /// A lesson is open for attempts.
    LessonLoaded(String),
}

impl SessionStatus {
    /// The loaded lesson id, if any.
    #[must_use]
    pub fn lesson_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::LessonLoaded(id) => Some(id),
        }
    }
}

// ============================================================================
// SessionView
// ============================================================================

/// Read-only snapshot handed to the presentation layer after every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// The open lesson, if any.
    pub current_lesson_id: Option<String>,

    /// Verdict of the latest attempt on the open lesson.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,

    /// Unlocked lessons, in progression order.
    pub unlocked_ids: Vec<String>,

    /// Completed lessons, in progression order.
    pub completed_ids: Vec<String>,

    /// Everything captured so far.
    pub simulated_variables: BTreeMap<String, SimValue>,

    /// Why the latest save failed, if it did. Progress is still kept in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

/// Result of [`SessionController::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// The next lesson is now loaded.
    Moved(SessionView),
    /// Nothing changed: the current lesson is not completed, or it is the last one.
    NoFurtherLesson(SessionView),
}

impl Advance {
    /// Returns `true` if the controller moved to another lesson.
    #[must_use]
    pub const fn moved(&self) -> bool {
        matches!(self, Self::Moved(_))
    }

    /// The view after the call.
    #[must_use]
    pub const fn view(&self) -> &SessionView {
        match self {
            Self::Moved(view) | Self::NoFurtherLesson(view) => view,
        }
    }

    /// Consumes the outcome, returning the view.
    #[must_use]
    pub fn into_view(self) -> SessionView {
        match self {
            Self::Moved(view) | Self::NoFurtherLesson(view) => view,
        }
    }
}

// ============================================================================
// SessionController
// ============================================================================

/// Drives lesson selection, attempts, and progression for one learner.
#[derive(Debug)]
pub struct SessionController {
    registry: Arc<LessonRegistry>,
    progress: ProgressStore,
    variables: SimulatedVariables,
    status: SessionStatus,
    last_verdict: Option<Verdict>,
    persistence_error: Option<String>,
}

impl SessionController {
    /// Creates an idle controller over `progress` and its registry.
    #[must_use]
    pub fn new(progress: ProgressStore) -> Self {
        Self {
            registry: Arc::clone(progress.registry()),
            progress,
            variables: SimulatedVariables::new(),
            status: SessionStatus::Idle,
            last_verdict: None,
            persistence_error: None,
        }
    }

    /// Opens lesson `id` and clears the previous attempt's feedback.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::UnknownLessonId` for an id not in the registry and
    /// `PyshotError::LessonLocked` for a lesson not unlocked yet. Neither
    /// changes any state.
    pub fn select_lesson(&mut self, id: &str) -> Result<SessionView> {
        let lesson = match self.unlocked_lesson(id) {
            Ok(lesson) => lesson,
            Err(e) => {
                debug!(lesson = %id, error = %e, "Rejected lesson selection");
                return Err(e);
            }
        };

        info!(lesson = %lesson.id, title = %lesson.title, "Lesson selected");
        let id = lesson.id.clone();
        self.status = SessionStatus::LessonLoaded(id);
        self.last_verdict = None;
        Ok(self.view())
    }

    /// Lesson `id`, if the learner may open it.
    ///
    /// # Errors
    ///
    /// The same errors as [`Self::select_lesson`].
    pub fn unlocked_lesson(&self, id: &str) -> Result<&LessonDefinition> {
        let lesson = self.registry.by_id(id)?;
        if self.progress.is_unlocked(id) {
            Ok(lesson)
        } else {
            Err(PyshotError::lesson_locked(id))
        }
    }

    /// Checks `text` against the open lesson.
    ///
    /// A pass completes the lesson, unlocks the next one, merges captured
    /// values, and saves progress. With no lesson open this does nothing and
    /// the returned view carries no verdict.
    pub fn submit(&mut self, text: &str) -> SessionView {
        let SessionStatus::LessonLoaded(id) = &self.status else {
            debug!("Submit ignored: no lesson loaded");
            return self.view();
        };
        let id = id.clone();

        let verdict = match self.registry.by_id(&id) {
            Ok(lesson) => lesson.validate(text),
            Err(e) => {
                warn!(lesson = %id, error = %e, "Loaded lesson vanished from registry");
                return self.view();
            }
        };
        debug!(lesson = %id, passed = verdict.passed, "Attempt evaluated");

        if verdict.passed {
            if let Err(e) = self.progress.complete(&id) {
                warn!(lesson = %id, error = %e, "Could not record completion");
            }
            self.variables.merge(verdict.captured_state.clone());
            self.persist();
        }

        self.last_verdict = Some(verdict);
        self.view()
    }

    /// Moves to the lesson after the current one.
    ///
    /// Only moves when the current lesson is completed and the next one
    /// exists and is unlocked; otherwise nothing changes.
    pub fn advance(&mut self) -> Advance {
        let next = self
            .status
            .lesson_id()
            .filter(|id| self.progress.state().is_completed(id))
            .and_then(|id| self.registry.next(id).ok().flatten())
            .filter(|next| self.progress.is_unlocked(&next.id))
            .map(|next| next.id.clone());

        let Some(next) = next else {
            debug!("Advance ignored: {NO_FURTHER_LESSON}");
            return Advance::NoFurtherLesson(self.view());
        };

        info!(lesson = %next, "Advanced to next lesson");
        self.status = SessionStatus::LessonLoaded(next);
        self.last_verdict = None;
        Advance::Moved(self.view())
    }

    /// Forgets all progress and captured variables and returns to idle.
    pub fn reset(&mut self) -> SessionView {
        self.variables.reset();
        self.status = SessionStatus::Idle;
        self.last_verdict = None;
        self.persistence_error = self.progress.reset().err().map(|e| {
            warn!(error = %e, "Failed to save reset progress");
            e.to_string()
        });
        self.view()
    }

    fn persist(&mut self) {
        self.persistence_error = match self.progress.save() {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "Failed to save progress");
                Some(e.to_string())
            }
        };
    }

    /// Snapshot for rendering.
    #[must_use]
    pub fn view(&self) -> SessionView {
        let state = self.progress.state();
        SessionView {
            current_lesson_id: self.status.lesson_id().map(str::to_string),
            verdict: self.last_verdict.clone(),
            unlocked_ids: self.ids_in_order(|id| state.is_unlocked(id)),
            completed_ids: self.ids_in_order(|id| state.is_completed(id)),
            simulated_variables: self.variables.snapshot(),
            persistence_error: self.persistence_error.clone(),
        }
    }

    fn ids_in_order(&self, keep: impl Fn(&str) -> bool) -> Vec<String> {
        self.registry
            .all()
            .iter()
            .filter(|lesson| keep(&lesson.id))
            .map(|lesson| lesson.id.clone())
            .collect()
    }

    /// Current state machine position.
    #[must_use]
    pub const fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// The open lesson, if any.
    #[must_use]
    pub fn current_lesson(&self) -> Option<&LessonDefinition> {
        self.status
            .lesson_id()
            .and_then(|id| self.registry.by_id(id).ok())
    }

    /// The lesson registry.
    #[must_use]
    pub fn registry(&self) -> &LessonRegistry {
        &self.registry
    }

    /// Current progress.
    #[must_use]
    pub const fn progress(&self) -> &ProgressState {
        self.progress.state()
    }

    /// Captured variables.
    #[must_use]
    pub const fn variables(&self) -> &SimulatedVariables {
        &self.variables
    }
}

// ============================================================================
// SharedSession
// ============================================================================

/// A controller shared between threads.
///
/// Every call takes the same lock, so concurrent callers are applied one at a
/// time and the progress invariants hold as in the single-threaded case.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<SessionController>>,
}

impl SharedSession {
    /// Wraps `controller` for shared use.
    #[must_use]
    pub fn new(controller: SessionController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    /// Runs `f` with exclusive access to the controller.
    ///
    /// A panic in an earlier caller does not poison the session; each
    /// controller call leaves its state consistent before returning.
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionController) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// See [`SessionController::select_lesson`].
    pub fn select_lesson(&self, id: &str) -> Result<SessionView> {
        self.with(|session| session.select_lesson(id))
    }

    /// See [`SessionController::submit`].
    pub fn submit(&self, text: &str) -> SessionView {
        self.with(|session| session.submit(text))
    }

    /// See [`SessionController::advance`].
    pub fn advance(&self) -> Advance {
        self.with(SessionController::advance)
    }

    /// See [`SessionController::view`].
    pub fn view(&self) -> SessionView {
        self.with(|session| session.view())
    }
}

// ============================================================================
// Tests
// ============================================================================
