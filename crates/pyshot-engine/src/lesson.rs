//! Lesson definitions and the ordered, immutable lesson registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{PyshotError, Result};
use crate::validator::{Validator, Verdict};

/// One unit of the tutorial.
///
/// Display texts are opaque to the engine; only `id`, `order` and the
/// validator take part in progression.
#[derive(Clone)]
pub struct LessonDefinition {
    /// Unique, stable identifier (e.g. `"1-1"`).
    pub id: String,

    /// Position in the progression, starting at 0.
    pub order: usize,

    /// Title shown in the lesson list.
    pub title: String,

    /// One-line description shown under the title.
    pub summary: String,

    /// Explanation of the concept.
    pub theory: String,

    /// What the learner has to write.
    pub task: String,

    /// Worked example shown next to the theory.
    pub example: String,

    /// Initial content of the editor buffer.
    pub starter_text: String,

    validator: Arc<dyn Validator>,
}

impl LessonDefinition {
    /// Creates a lesson with empty display texts.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        order: usize,
        title: impl Into<String>,
        validator: impl Validator + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            order,
            title: title.into(),
            summary: String::new(),
            theory: String::new(),
            task: String::new(),
            example: String::new(),
            starter_text: String::new(),
            validator: Arc::new(validator),
        }
    }

    /// Sets the one-line summary.
    #[must_use]
    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.summary = text.into();
        self
    }

    /// Sets the theory text.
    #[must_use]
    pub fn theory(mut self, text: impl Into<String>) -> Self {
        self.theory = text.into();
        self
    }

    /// Sets the task description.
    #[must_use]
    pub fn task(mut self, text: impl Into<String>) -> Self {
        self.task = text.into();
        self
    }

    /// Sets the worked example.
    #[must_use]
    pub fn example(mut self, text: impl Into<String>) -> Self {
        self.example = text.into();
        self
    }

    /// Sets the initial editor content.
    #[must_use]
    pub fn starter_text(mut self, text: impl Into<String>) -> Self {
        self.starter_text = text.into();
        self
    }

    /// Runs this lesson's validator on `submitted`.
    pub fn validate(&self, submitted: &str) -> Verdict {
        self.validator.check(submitted)
    }
}

impl fmt::Debug for LessonDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LessonDefinition")
            .field("id", &self.id)
            .field("order", &self.order)
            .field("title", &self.title)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// The fixed, ordered set of lessons.
///
/// Built once at startup; there are no mutation operations.
#[derive(Debug, Clone)]
pub struct LessonRegistry {
    lessons: Vec<LessonDefinition>,
    index: HashMap<String, usize>,
}

impl LessonRegistry {
    /// Builds a registry, checking the lesson table.
    ///
    /// Input order does not matter; lessons are sorted by `order`.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::InvalidRegistry` if the table is empty, an id is
    /// empty or repeated, or the orders are not exactly `0..len`.
    pub fn new(mut lessons: Vec<LessonDefinition>) -> Result<Self> {
        if lessons.is_empty() {
            return Err(PyshotError::invalid_registry("no lessons defined"));
        }

        lessons.sort_by_key(|lesson| lesson.order);

        let mut index = HashMap::with_capacity(lessons.len());
        for (position, lesson) in lessons.iter().enumerate() {
            if lesson.id.trim().is_empty() {
                return Err(PyshotError::invalid_registry(format!(
                    "lesson at order {} has an empty id",
                    lesson.order
                )));
            }
            if lesson.order != position {
                return Err(PyshotError::invalid_registry(format!(
                    "expected a lesson with order {position}, found '{}' with order {}",
                    lesson.id, lesson.order
                )));
            }
            if index.insert(lesson.id.clone(), position).is_some() {
                return Err(PyshotError::invalid_registry(format!(
                    "duplicate lesson id '{}'",
                    lesson.id
                )));
            }
        }

        Ok(Self { lessons, index })
    }

    /// Looks up a lesson by id.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::UnknownLessonId` if no lesson has this id.
    pub fn by_id(&self, id: &str) -> Result<&LessonDefinition> {
        self.index
            .get(id)
            .map(|&position| &self.lessons[position])
            .ok_or_else(|| PyshotError::unknown_lesson(id))
    }

    /// Looks up a lesson by its position in the progression.
    #[must_use]
    pub fn by_order(&self, order: usize) -> Option<&LessonDefinition> {
        self.lessons.get(order)
    }

    /// Every lesson, sorted by order.
    #[must_use]
    pub fn all(&self) -> &[LessonDefinition] {
        &self.lessons
    }

    /// The lesson with order 0, unlocked by default.
    #[must_use]
    pub fn first(&self) -> &LessonDefinition {
        &self.lessons[0]
    }

    /// The lesson following `id`, or `None` if `id` is the last one.
    ///
    /// # Errors
    ///
    /// Returns `PyshotError::UnknownLessonId` if no lesson has this id.
    pub fn next(&self, id: &str) -> Result<Option<&LessonDefinition>> {
        let lesson = self.by_id(id)?;
        Ok(self.by_order(lesson.order + 1))
    }

    /// Returns `true` if a lesson has this id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of lessons (never zero).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    /// Always `false`: construction rejects empty tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}
