//! Error types for the Py-SHOT engine.
//!
//! This module defines the error hierarchy for all engine operations,
//! including registry lookups, lesson unlocking, progress persistence,
//! configuration loading, and curriculum parsing.

use std::path::PathBuf;

/// A specialized `Result` type for Py-SHOT engine operations.
pub type Result<T> = std::result::Result<T, PyshotError>;

/// Errors that can occur while running a tutorial session.
///
/// Error variants are organized by subsystem and include actionable suggestions
/// where possible to help users resolve issues.
#[derive(Debug, thiserror::Error)]
pub enum PyshotError {
    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// A lesson id was looked up that the registry does not contain.
    #[error("Unknown lesson id: '{id}'\n\nSuggestion: Run 'pyshot list' to see the available lessons")]
    UnknownLessonId {
        /// The id that was not found.
        id: String,
    },

    /// The lesson table given to the registry violates its invariants.
    #[error("Invalid lesson registry: {message}\n\nSuggestion: Lesson ids must be unique and orders must run 0, 1, 2, ... without gaps")]
    InvalidRegistry {
        /// Description of the violated invariant.
        message: String,
    },

    // ========================================================================
    // Progression Errors
    // ========================================================================
    /// The learner tried to open a lesson that is not unlocked yet.
    #[error("Lesson '{id}' is locked\n\nSuggestion: Complete the previous lesson to unlock it")]
    LessonLocked {
        /// The locked lesson id.
        id: String,
    },

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// The progress store could not be read or written.
    #[error("Failed to persist progress under key '{key}': {message}\n\nSuggestion: Check that the state directory is writable; progress is kept in memory for this session")]
    PersistenceError {
        /// The storage key involved.
        key: String,
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your pyshot.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Curriculum Errors
    // ========================================================================
    /// Curriculum file was not found at the specified path.
    #[error("Curriculum not found: '{path}'\n\nSuggestion: Check the 'curriculum' field in pyshot.json or remove it to use the built-in lessons")]
    CurriculumNotFound {
        /// Path where the curriculum was expected.
        path: PathBuf,
    },

    /// Curriculum file exceeds the size limit.
    #[error("Curriculum exceeds size limit (256KB): '{path}' is {size_kb}KB\n\nSuggestion: Split the lessons into a smaller curriculum")]
    CurriculumTooLarge {
        /// Path to the oversized curriculum.
        path: PathBuf,
        /// Actual size in kilobytes.
        size_kb: u64,
    },

    /// Curriculum file contains non-UTF-8 content.
    #[error("Curriculum has invalid encoding: '{path}'\n\nSuggestion: Convert the file to UTF-8 encoding")]
    CurriculumEncodingError {
        /// Path to the curriculum with encoding issues.
        path: PathBuf,
    },

    /// Curriculum file is not a valid lesson table.
    #[error("Invalid curriculum '{path}': {message}\n\nSuggestion: Each lesson needs an id, a title and a 'check' rule set")]
    CurriculumParseError {
        /// Path to the curriculum file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PyshotError {
    /// Creates a new `UnknownLessonId` error.
    #[must_use]
    pub fn unknown_lesson(id: impl Into<String>) -> Self {
        Self::UnknownLessonId { id: id.into() }
    }

    /// Creates a new `InvalidRegistry` error.
    #[must_use]
    pub fn invalid_registry(message: impl Into<String>) -> Self {
        Self::InvalidRegistry {
            message: message.into(),
        }
    }

    /// Creates a new `LessonLocked` error.
    #[must_use]
    pub fn lesson_locked(id: impl Into<String>) -> Self {
        Self::LessonLocked { id: id.into() }
    }

    /// Creates a new `PersistenceError`.
    #[must_use]
    pub fn persistence(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PersistenceError {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `CurriculumNotFound` error.
    #[must_use]
    pub fn curriculum_not_found(path: impl Into<PathBuf>) -> Self {
        Self::CurriculumNotFound { path: path.into() }
    }

    /// Creates a new `CurriculumTooLarge` error.
    #[must_use]
    pub fn curriculum_too_large(path: impl Into<PathBuf>, size_kb: u64) -> Self {
        Self::CurriculumTooLarge {
            path: path.into(),
            size_kb,
        }
    }

    /// Creates a new `CurriculumEncodingError`.
    #[must_use]
    pub fn curriculum_encoding(path: impl Into<PathBuf>) -> Self {
        Self::CurriculumEncodingError { path: path.into() }
    }

    /// Creates a new `CurriculumParseError`.
    #[must_use]
    pub fn curriculum_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CurriculumParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if the learner caused this error and can recover by choosing differently.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(self, Self::LessonLocked { .. })
    }

    /// Returns `true` if this error prevents a session from starting at all.
    ///
    /// Nothing raised while a session is running is fatal; only bad startup
    /// data (configuration, curriculum, lesson table) is.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegistry { .. }
                | Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
                | Self::CurriculumNotFound { .. }
                | Self::CurriculumTooLarge { .. }
                | Self::CurriculumEncodingError { .. }
                | Self::CurriculumParseError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = PyshotError::unknown_lesson("9-9");
        let msg = err.to_string();
        assert!(msg.contains("Unknown lesson id"));
        assert!(msg.contains("9-9"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_lesson_locked_display() {
        let err = PyshotError::lesson_locked("2-1");
        let msg = err.to_string();
        assert!(msg.contains("'2-1' is locked"));
        assert!(msg.contains("previous lesson"));
    }

    #[test]
    fn test_is_user_facing() {
        assert!(PyshotError::lesson_locked("1-2").is_user_facing());
        assert!(!PyshotError::unknown_lesson("x").is_user_facing());
        assert!(!PyshotError::persistence("k", "disk full").is_user_facing());
    }

    #[test]
    fn test_is_fatal() {
        assert!(PyshotError::invalid_registry("duplicate id").is_fatal());
        assert!(PyshotError::curriculum_not_found("/nope.json").is_fatal());
        assert!(PyshotError::config_validation("bad", "fix it").is_fatal());

        // Runtime errors never stop a session
        assert!(!PyshotError::lesson_locked("1-2").is_fatal());
        assert!(!PyshotError::persistence("k", "disk full").is_fatal());
        assert!(!PyshotError::unknown_lesson("x").is_fatal());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PyshotError = io_err.into();
        assert!(matches!(err, PyshotError::Io(_)));
    }

    #[test]
    fn test_curriculum_too_large_display() {
        let err = PyshotError::curriculum_too_large("/big/lessons.json", 300);
        let msg = err.to_string();
        assert!(msg.contains("300KB"));
        assert!(msg.contains("256KB"));
    }
}
