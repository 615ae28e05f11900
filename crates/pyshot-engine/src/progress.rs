//! Lesson progress: which lessons are unlocked and which are completed.
//!
//! [`ProgressState`] is the plain data with the unlock rule. [`ProgressStore`]
//! keeps the authoritative in-memory copy and mirrors it to a
//! [`KeyValueStore`] as a JSON [`ProgressRecord`].

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PyshotError, Result};
use crate::lesson::LessonRegistry;
use crate::storage::{KeyValueStore, MemoryStore};

/// Version of the persisted progress record format.
pub const STATE_VERSION: u32 = 1;

/// Storage key of the progress record.
pub const DEFAULT_STORAGE_KEY: &str = "pyshot.progress";

// ============================================================================
// ProgressState
// ============================================================================

/// Unlocked and completed lesson ids.
///
/// Invariants, given the registry it was built for:
/// - the order-0 lesson is always unlocked
/// - the lesson after every completed lesson is unlocked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    unlocked_ids: BTreeSet<String>,
    completed_ids: BTreeSet<String>,
}

impl ProgressState {
    /// The default state: only the first lesson unlocked, nothing completed.
    #[must_use]
    pub fn initial(registry: &LessonRegistry) -> Self {
        Self {
            unlocked_ids: BTreeSet::from([registry.first().id.clone()]),
            completed_ids: BTreeSet::new(),
        }
    }

    /// Returns `true` if the learner may open `id`.
    #[must_use]
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked_ids.contains(id)
    }

    /// Returns `true` if the learner has passed `id`.
    #[must_use]
    pub fn is_completed(&self, id: &str) -> bool {
        self.completed_ids.contains(id)
    }

    /// Unlocked ids, sorted.
    #[must_use]
    pub const fn unlocked_ids(&self) -> &BTreeSet<String> {
        &self.unlocked_ids
    }

    /// Completed ids, sorted.
    #[must_use]
    pub const fn completed_ids(&self) -> &BTreeSet<String> {
        &self.completed_ids
    }

    /// Marks `id` completed and unlocks the lesson after it.
    ///
    /// Idempotent: completing an already completed lesson changes nothing.
    /// Returns the id of a lesson that became unlocked by this call, if any.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::UnknownLessonId` if `id` is not in `registry`.
    pub fn complete(&mut self, registry: &LessonRegistry, id: &str) -> Result<Option<String>> {
        let next = registry.next(id)?;
        self.completed_ids.insert(id.to_string());

        let Some(next) = next else {
            return Ok(None);
        };
        Ok(self
            .unlocked_ids
            .insert(next.id.clone())
            .then(|| next.id.clone()))
    }

    /// Drops ids the registry does not know and restores both invariants.
    fn repair(&mut self, registry: &LessonRegistry) {
        self.unlocked_ids.retain(|id| registry.contains(id));
        self.completed_ids.retain(|id| registry.contains(id));
        self.unlocked_ids.insert(registry.first().id.clone());

        let completed: Vec<String> = self.completed_ids.iter().cloned().collect();
        for id in completed {
            if let Ok(Some(next)) = registry.next(&id) {
                self.unlocked_ids.insert(next.id.clone());
            }
        }
    }

    /// Builds a state from a persisted record, repairing it against `registry`.
    #[must_use]
    pub fn from_record(record: ProgressRecord, registry: &LessonRegistry) -> Self {
        let mut state = Self {
            unlocked_ids: record.unlocked_ids.into_iter().collect(),
            completed_ids: record.completed_ids.into_iter().collect(),
        };
        state.repair(registry);
        state
    }

    /// The persisted form of this state, stamped with the current time.
    #[must_use]
    pub fn to_record(&self) -> ProgressRecord {
        ProgressRecord {
            version: STATE_VERSION,
            unlocked_ids: self.unlocked_ids.iter().cloned().collect(),
            completed_ids: self.completed_ids.iter().cloned().collect(),
            saved_at: Some(Utc::now()),
        }
    }
}

// ============================================================================
// ProgressRecord
// ============================================================================

const fn default_version() -> u32 {
    STATE_VERSION
}

/// Serialized progress, as stored under the progress key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Record format version.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Unlocked lesson ids.
    #[serde(default)]
    pub unlocked_ids: Vec<String>,

    /// Completed lesson ids.
    #[serde(default)]
    pub completed_ids: Vec<String>,

    /// When the record was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

// ============================================================================
// ProgressStore
// ============================================================================

/// Authoritative progress for one session, mirrored to external storage.
///
/// Storage failures never change the in-memory state: a failed load yields
/// the default state, and a failed save leaves the session's progress intact.
pub struct ProgressStore {
    registry: Arc<LessonRegistry>,
    backend: Box<dyn KeyValueStore>,
    key: String,
    state: ProgressState,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore")
            .field("key", &self.key)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ProgressStore {
    /// Opens the store and loads whatever progress `backend` holds under `key`.
    #[must_use]
    pub fn open(
        registry: Arc<LessonRegistry>,
        backend: impl KeyValueStore + 'static,
        key: impl Into<String>,
    ) -> Self {
        let state = ProgressState::initial(&registry);
        let mut store = Self {
            registry,
            backend: Box::new(backend),
            key: key.into(),
            state,
        };
        store.load();
        store
    }

    /// A store that persists nothing beyond the process.
    #[must_use]
    pub fn in_memory(registry: Arc<LessonRegistry>) -> Self {
        Self::open(registry, MemoryStore::new(), DEFAULT_STORAGE_KEY)
    }

    /// Reloads progress from storage.
    ///
    /// Absent, unreadable, corrupt, or newer-version records all yield the
    /// default state; the reason is logged, never returned.
    pub fn load(&mut self) -> &ProgressState {
        self.state = match self.read_record() {
            Ok(Some(record)) => {
                debug!(key = %self.key, "Loaded progress record");
                ProgressState::from_record(record, &self.registry)
            }
            Ok(None) => {
                debug!(key = %self.key, "No stored progress, starting fresh");
                ProgressState::initial(&self.registry)
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Ignoring unusable progress record");
                ProgressState::initial(&self.registry)
            }
        };
        &self.state
    }

    fn read_record(&self) -> Result<Option<ProgressRecord>> {
        let Some(bytes) = self.backend.read(&self.key)? else {
            return Ok(None);
        };

        let record: ProgressRecord = serde_json::from_slice(&bytes)
            .map_err(|e| PyshotError::persistence(&self.key, format!("corrupt record: {e}")))?;

        if record.version > STATE_VERSION {
            return Err(PyshotError::persistence(
                &self.key,
                format!(
                    "record version {} is newer than supported version {STATE_VERSION}",
                    record.version
                ),
            ));
        }

        Ok(Some(record))
    }

    /// Writes the current state to storage.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::PersistenceError` if storage rejects the write.
    /// The in-memory state is unaffected either way.
    pub fn save(&mut self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.state.to_record())
            .map_err(|e| PyshotError::persistence(&self.key, e.to_string()))?;
        self.backend.write(&self.key, &bytes)?;
        debug!(key = %self.key, "Saved progress");
        Ok(())
    }

    /// Current progress.
    #[must_use]
    pub const fn state(&self) -> &ProgressState {
        &self.state
    }

    /// The registry this progress is tracked against.
    #[must_use]
    pub fn registry(&self) -> &Arc<LessonRegistry> {
        &self.registry
    }

    /// Storage key of this store.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns `true` if the learner may open `id`.
    #[must_use]
    pub fn is_unlocked(&self, id: &str) -> bool {
        self.state.is_unlocked(id)
    }

    /// Marks `id` completed and unlocks the next lesson, in memory only.
    ///
    /// Call [`ProgressStore::save`] afterwards to persist.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::UnknownLessonId` if `id` is not a lesson.
    pub fn complete(&mut self, id: &str) -> Result<&ProgressState> {
        if let Some(unlocked) = self.state.complete(&self.registry, id)? {
            info!(completed = %id, unlocked = %unlocked, "Lesson unlocked");
        }
        Ok(&self.state)
    }

    /// Returns to the default state and saves it.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::PersistenceError` if the reset state cannot be
    /// saved; the in-memory state is reset regardless.
    pub fn reset(&mut self) -> Result<()> {
        self.state = ProgressState::initial(&self.registry);
        info!(key = %self.key, "Progress reset");
        self.save()
    }
}

// ============================================================================
// Tests
// ============================================================================
