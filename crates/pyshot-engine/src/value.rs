//! Values recorded for simulated variables.
//!
//! The engine never evaluates learner code. A value is whatever literal
//! sits on the right-hand side of an assignment, or the raw text of that
//! side when it is not a literal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static INT_LITERAL: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^-?\d+$").ok());

static FLOAT_LITERAL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^-?(?:\d+\.\d*|\.\d+)$").ok());

/// A value shown in the simulated variable panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SimValue {
    /// Integer literal, e.g. `25`.
    Int(i64),
    /// Floating point literal, e.g. `2.5`.
    Float(f64),
    /// Quoted string literal, stored without its quotes.
    Str(String),
    /// `True` or `False`.
    Bool(bool),
    /// Anything else, kept as the raw source text.
    Token(String),
}

impl SimValue {
    /// Parses the right-hand side of an assignment.
    ///
    /// Never fails: text that is not a recognised literal becomes a [`SimValue::Token`].
    ///
    /// # Examples
    ///
    /// ```
    /// use pyshot_engine::SimValue;
    ///
    /// assert_eq!(SimValue::parse(" 25 "), SimValue::Int(25));
    /// assert_eq!(SimValue::parse("'Ana'"), SimValue::Str("Ana".to_string()));
    /// assert_eq!(SimValue::parse("True"), SimValue::Bool(true));
    /// assert_eq!(SimValue::parse("a + b"), SimValue::Token("a + b".to_string()));
    /// ```
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let text = source.trim();

        if let Some(inner) = unquote(text) {
            return Self::Str(inner.to_string());
        }

        match text {
            "True" => return Self::Bool(true),
            "False" => return Self::Bool(false),
            _ => {}
        }

        if is_match(&INT_LITERAL, text) {
            if let Ok(n) = text.parse::<i64>() {
                return Self::Int(n);
            }
        }

        if is_match(&FLOAT_LITERAL, text) {
            if let Ok(n) = text.parse::<f64>() {
                return Self::Float(n);
            }
        }

        Self::Token(text.to_string())
    }

    /// Returns `true` for literal values (everything except [`SimValue::Token`]).
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        !matches!(self, Self::Token(_))
    }

    /// Compares two values the way a learner would read them.
    ///
    /// Integers and floats compare numerically, so `25` matches `25.0`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn loosely_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => {
                (*a as f64 - b).abs() < f64::EPSILON
            }
            (Self::Float(a), Self::Float(b)) => (a - b).abs() < f64::EPSILON,
            _ => self == other,
        }
    }
}

impl From<i64> for SimValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for SimValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for SimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for SimValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl std::fmt::Display for SimValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n:?}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Token(t) => write!(f, "{t}"),
        }
    }
}

fn is_match(re: &Lazy<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

/// Strips one matching pair of single or double quotes.
fn unquote(text: &str) -> Option<&str> {
    let first = text.chars().next()?;
    if (first == '"' || first == '\'') && text.len() >= 2 && text.ends_with(first) {
        let inner = &text[1..text.len() - 1];
        if !inner.contains(first) {
            return Some(inner);
        }
    }
    None
}
