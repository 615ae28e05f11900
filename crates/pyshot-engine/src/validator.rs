//! The validator contract and the rule-set validator used by every lesson.
//!
//! A [`Validator`] turns submitted text into a [`Verdict`]. Validators are
//! pure: the same text always yields the same verdict, nothing is executed,
//! and no input (empty, huge, binary-looking) makes them fail. Problems in
//! the lesson data itself surface as a failing verdict with generic feedback.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::comments::strip_comments;
use crate::rules::{assignments, Captures, Rule, RuleError, RuleOutcome};

/// Feedback used when a lesson's own rules cannot be evaluated.
pub const INTERNAL_FAILURE_FEEDBACK: &str =
    "No se pudo comprobar este ejercicio. Inténtalo de nuevo o avisa a quien mantiene el curso.";

/// Default feedback of a passing attempt.
pub const DEFAULT_SUCCESS_FEEDBACK: &str = "¡Py-SHOT! Nivel completado.";

/// Outcome of one validation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Whether the attempt satisfies the lesson.
    pub passed: bool,

    /// Explanation for the learner, on pass and on fail.
    pub feedback: String,

    /// Values to merge into the simulated variables. Only meaningful when `passed`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub captured_state: Captures,
}

impl Verdict {
    /// A passing verdict carrying `captured` values.
    #[must_use]
    pub fn pass(feedback: impl Into<String>, captured: Captures) -> Self {
        Self {
            passed: true,
            feedback: feedback.into(),
            captured_state: captured,
        }
    }

    /// A failing verdict. Failing verdicts never capture anything.
    #[must_use]
    pub fn fail(feedback: impl Into<String>) -> Self {
        Self {
            passed: false,
            feedback: feedback.into(),
            captured_state: Captures::new(),
        }
    }
}

/// Judges submitted text for one lesson.
pub trait Validator: fmt::Debug + Send + Sync {
    /// Checks `submitted` and explains the result. Must not panic on any input.
    fn check(&self, submitted: &str) -> Verdict;
}

fn default_true() -> bool {
    true
}

fn default_success() -> String {
    DEFAULT_SUCCESS_FEEDBACK.to_string()
}

/// Ordered rules evaluated with short-circuiting.
///
/// The first rule that does not pass decides the (failing) verdict with its
/// own feedback. When every rule passes, their captures are merged, in rule
/// order, into the passing verdict.
///
/// # Examples
///
/// ```
/// use pyshot_engine::{Rule, RuleSet, Validator};
///
/// let rules = RuleSet::new(vec![Rule::assign_value("edad", "25")]);
///
/// assert!(rules.check("edad = 25  # comment").passed);
/// assert!(!rules.check("# edad = 25").passed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    /// Rules, in evaluation order.
    pub rules: Vec<Rule>,

    /// Remove `#` comments before matching (on by default).
    #[serde(default = "default_true")]
    pub strip_comments: bool,

    /// On pass, also capture every `name = value` statement in the submission.
    #[serde(default)]
    pub capture_assignments: bool,

    /// Feedback of a passing attempt.
    #[serde(default = "default_success")]
    pub success: String,
}

impl RuleSet {
    /// Creates a rule set with comment stripping on and no blanket capture.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            strip_comments: true,
            capture_assignments: false,
            success: default_success(),
        }
    }

    /// A rule set that passes any submission, including an empty one.
    #[must_use]
    pub fn acknowledge() -> Self {
        Self::new(vec![Rule::acknowledge()])
    }

    /// Matches against the raw text, comments included.
    #[must_use]
    pub fn keep_comments(mut self) -> Self {
        self.strip_comments = false;
        self
    }

    /// Captures every assignment in a passing submission.
    #[must_use]
    pub fn capture_assignments(mut self) -> Self {
        self.capture_assignments = true;
        self
    }

    /// Overrides the success feedback.
    #[must_use]
    pub fn success(mut self, feedback: impl Into<String>) -> Self {
        self.success = feedback.into();
        self
    }

    fn evaluate(&self, submitted: &str) -> Result<Verdict, RuleError> {
        let code = if self.strip_comments {
            strip_comments(submitted)
        } else {
            submitted.to_string()
        };

        let mut captured = Captures::new();
        if self.capture_assignments {
            captured.extend(
                assignments(&code)
                    .into_iter()
                    .filter_map(|(name, value)| Some((name, value?))),
            );
        }

        for (index, rule) in self.rules.iter().enumerate() {
            match rule.evaluate(&code)? {
                RuleOutcome::Pass(values) => captured.extend(values),
                RuleOutcome::Mismatch(feedback) => {
                    debug!(rule = index, "Rule found construct with wrong shape");
                    return Ok(Verdict::fail(feedback));
                }
                RuleOutcome::Missing(feedback) => {
                    debug!(rule = index, "Rule did not find construct");
                    return Ok(Verdict::fail(feedback));
                }
            }
        }

        Ok(Verdict::pass(self.success.clone(), captured))
    }
}

impl Validator for RuleSet {
    fn check(&self, submitted: &str) -> Verdict {
        self.evaluate(submitted).unwrap_or_else(|e| {
            warn!(error = %e, "Lesson rules could not be evaluated");
            Verdict::fail(INTERNAL_FAILURE_FEEDBACK)
        })
    }
}
