//! Text predicates that lesson validators are composed from.
//!
//! Every predicate is a pure function of the (already comment-stripped)
//! submission and reports one of three outcomes:
//!
//! - [`RuleOutcome::Pass`]: the predicate holds, possibly capturing values
//! - [`RuleOutcome::Mismatch`]: the construct is there but wrong (specific feedback)
//! - [`RuleOutcome::Missing`]: the construct is not there at all (generic feedback)
//!
//! Predicates are plain data so curricula can describe them in JSON.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::value::SimValue;

/// Default number of characters searched after the outer match of a [`Predicate::Within`].
pub const DEFAULT_WINDOW: usize = 120;

/// Values captured by a passing predicate, keyed by variable name.
pub type Captures = BTreeMap<String, SimValue>;

/// `name = value` at the start of a line, excluding `==`.
static ANY_ASSIGNMENT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*([A-Za-z_]\w*)[ \t]*=([^=\n][^\n]*)?$").ok());

const fn default_window() -> usize {
    DEFAULT_WINDOW
}

/// Failure to evaluate a predicate at all.
///
/// Never leaves the validator boundary; see [`crate::RuleSet`].
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A pattern in the lesson data is not a valid regular expression.
    #[error("invalid pattern '{pattern}': {source}")]
    BadPattern {
        /// The offending pattern.
        pattern: String,
        /// The regex compiler's complaint.
        #[source]
        source: regex::Error,
    },
}

/// Result of evaluating one rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// The rule holds.
    Pass(Captures),
    /// The construct was found, but not in the expected shape.
    Mismatch(String),
    /// The construct was not found.
    Missing(String),
}

impl RuleOutcome {
    /// Returns `true` for [`RuleOutcome::Pass`].
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Pass(_))
    }
}

/// The shape of code a rule looks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// `<name> = <value>` statement.
    ///
    /// Without a name, any identifier matches. Without a value, any literal
    /// (or, for a named assignment, any right-hand side) matches. The value
    /// is written as source text, e.g. `"25"` or `"\"Ana\""`.
    Assign {
        /// Identifier to look for.
        #[serde(default)]
        name: Option<String>,
        /// Expected literal, as source text.
        #[serde(default)]
        value: Option<String>,
    },

    /// `<function>(<argument>)` call.
    Call {
        /// Called name, matched literally.
        function: String,
        /// Regex the whole argument list must match, whitespace around it tolerated.
        #[serde(default)]
        argument: Option<String>,
    },

    /// Presence of a regular expression anywhere in the code.
    Pattern {
        /// The regular expression.
        regex: String,
    },

    /// `inner` occurring within `window` characters after the first match of `outer`.
    ///
    /// This is textual proximity, not block structure: an `inner` match just
    /// past the end of the real block but inside the window still passes, and
    /// one deep inside a long block but past the window fails.
    Within {
        /// Regex locating the enclosing construct.
        outer: String,
        /// Regex that must follow it.
        inner: String,
        /// Characters searched after the end of the `outer` match.
        #[serde(default = "default_window")]
        window: usize,
    },

    /// Always holds. Used by reading-only lessons.
    Acknowledge,
}

/// A predicate plus optional feedback overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// What to look for.
    #[serde(flatten)]
    pub predicate: Predicate,

    /// Feedback when the construct is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<String>,

    /// Feedback when the construct is present but wrong.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<String>,
}

impl From<Predicate> for Rule {
    fn from(predicate: Predicate) -> Self {
        Self {
            predicate,
            missing: None,
            mismatch: None,
        }
    }
}

impl Rule {
    /// Assignment to `name`, with any value.
    #[must_use]
    pub fn assign(name: impl Into<String>) -> Self {
        Predicate::Assign {
            name: Some(name.into()),
            value: None,
        }
        .into()
    }

    /// Assignment of the literal `value` (source text) to `name`.
    #[must_use]
    pub fn assign_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Assign {
            name: Some(name.into()),
            value: Some(value.into()),
        }
        .into()
    }

    /// Assignment of any literal to any identifier.
    #[must_use]
    pub fn any_assignment() -> Self {
        Predicate::Assign {
            name: None,
            value: None,
        }
        .into()
    }

    /// Call to `function` with any arguments.
    #[must_use]
    pub fn call(function: impl Into<String>) -> Self {
        Predicate::Call {
            function: function.into(),
            argument: None,
        }
        .into()
    }

    /// Call to `function` whose arguments match the `argument` regex.
    #[must_use]
    pub fn call_with(function: impl Into<String>, argument: impl Into<String>) -> Self {
        Predicate::Call {
            function: function.into(),
            argument: Some(argument.into()),
        }
        .into()
    }

    /// Presence of `regex`.
    #[must_use]
    pub fn pattern(regex: impl Into<String>) -> Self {
        Predicate::Pattern {
            regex: regex.into(),
        }
        .into()
    }

    /// `inner` shortly after `outer`, using [`DEFAULT_WINDOW`].
    #[must_use]
    pub fn within(outer: impl Into<String>, inner: impl Into<String>) -> Self {
        Predicate::Within {
            outer: outer.into(),
            inner: inner.into(),
            window: DEFAULT_WINDOW,
        }
        .into()
    }

    /// Always passes.
    #[must_use]
    pub fn acknowledge() -> Self {
        Predicate::Acknowledge.into()
    }

    /// Overrides the feedback given when the construct is absent.
    #[must_use]
    pub fn on_missing(mut self, feedback: impl Into<String>) -> Self {
        self.missing = Some(feedback.into());
        self
    }

    /// Overrides the feedback given when the construct is present but wrong.
    #[must_use]
    pub fn on_mismatch(mut self, feedback: impl Into<String>) -> Self {
        self.mismatch = Some(feedback.into());
        self
    }

    /// Changes the search window of a [`Predicate::Within`] rule. No effect on other rules.
    #[must_use]
    pub fn window(mut self, size: usize) -> Self {
        if let Predicate::Within { window, .. } = &mut self.predicate {
            *window = size;
        }
        self
    }

    /// Evaluates the rule against already comment-stripped code.
    pub fn evaluate(&self, code: &str) -> Result<RuleOutcome, RuleError> {
        let outcome = match &self.predicate {
            Predicate::Assign { name, value } => {
                check_assignment(code, name.as_deref(), value.as_deref())
            }
            Predicate::Call { function, argument } => {
                check_call(code, function, argument.as_deref())?
            }
            Predicate::Pattern { regex } => check_pattern(code, regex)?,
            Predicate::Within {
                outer,
                inner,
                window,
            } => check_within(code, outer, inner, *window)?,
            Predicate::Acknowledge => RuleOutcome::Pass(Captures::new()),
        };

        Ok(match outcome {
            RuleOutcome::Missing(default) => {
                RuleOutcome::Missing(self.missing.clone().unwrap_or(default))
            }
            RuleOutcome::Mismatch(default) => {
                RuleOutcome::Mismatch(self.mismatch.clone().unwrap_or(default))
            }
            pass @ RuleOutcome::Pass(_) => pass,
        })
    }
}

/// Every `name = value` statement in `code`, in source order.
///
/// A statement with nothing after `=` yields `None` for its value. One
/// trailing `;` is not part of the value.
pub fn assignments(code: &str) -> Vec<(String, Option<SimValue>)> {
    let Some(re) = ANY_ASSIGNMENT.as_ref() else {
        return Vec::new();
    };

    re.captures_iter(code)
        .filter_map(|cap| {
            let name = cap.get(1)?.as_str().to_string();
            let value = cap
                .get(2)
                .map(|m| {
                    let rhs = m.as_str().trim();
                    rhs.strip_suffix(';').map_or(rhs, str::trim_end)
                })
                .filter(|rhs| !rhs.is_empty())
                .map(SimValue::parse);
            Some((name, value))
        })
        .collect()
}

fn compile(pattern: &str) -> Result<Regex, RuleError> {
    Regex::new(pattern).map_err(|source| RuleError::BadPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn check_assignment(code: &str, name: Option<&str>, expected: Option<&str>) -> RuleOutcome {
    let expected = expected.map(SimValue::parse);
    let found: Vec<(String, Option<SimValue>)> = assignments(code)
        .into_iter()
        .filter(|(candidate, _)| name.map_or(true, |n| n == candidate))
        .collect();

    if found.is_empty() {
        return RuleOutcome::Missing(match name {
            Some(n) => format!("No se encontró ninguna asignación a `{n}`."),
            None => "No se encontró ninguna variable. Prueba algo como `edad = 20`.".to_string(),
        });
    }

    let accepted: Captures = found
        .iter()
        .filter_map(|(n, v)| {
            let v = v.as_ref()?;
            let ok = match &expected {
                Some(want) => v.loosely_equals(want),
                // An unnamed rule is about literals; a named one accepts any expression.
                None => name.is_some() || v.is_literal(),
            };
            ok.then(|| (n.clone(), v.clone()))
        })
        .collect();

    if !accepted.is_empty() {
        return RuleOutcome::Pass(accepted);
    }

    let shown = found
        .iter()
        .rev()
        .find_map(|(_, v)| v.as_ref())
        .map_or_else(|| "nada".to_string(), ToString::to_string);

    RuleOutcome::Mismatch(match (name, &expected) {
        (Some(n), Some(want)) => format!(
            "Encontraste la asignación a `{n}`, pero su valor es {shown}; se esperaba {want}."
        ),
        (Some(n), None) => format!("Encontraste la asignación a `{n}`, pero le falta el valor."),
        (None, Some(want)) => {
            format!("Hay asignaciones, pero ninguna con el valor {want}.")
        }
        (None, None) => {
            "Hay una asignación, pero su valor no es un número, texto o booleano.".to_string()
        }
    })
}

fn check_call(code: &str, function: &str, argument: Option<&str>) -> Result<RuleOutcome, RuleError> {
    let name = regex::escape(function);
    let bare = compile(&format!(r"\b{name}\s*\("))?;

    let Some(argument) = argument else {
        return Ok(if bare.is_match(code) {
            RuleOutcome::Pass(Captures::new())
        } else {
            RuleOutcome::Missing(format!("No se encontró ninguna llamada a `{function}(...)`."))
        });
    };

    // Validate the lesson's fragment on its own so a bad one is reported as such.
    compile(argument)?;
    let shaped = compile(&format!(r"\b{name}\s*\(\s*(?:{argument})\s*\)"))?;

    Ok(if shaped.is_match(code) {
        RuleOutcome::Pass(Captures::new())
    } else if bare.is_match(code) {
        RuleOutcome::Mismatch(format!(
            "Encontraste la llamada a `{function}(...)`, pero no con el argumento esperado."
        ))
    } else {
        RuleOutcome::Missing(format!("No se encontró ninguna llamada a `{function}(...)`."))
    })
}

fn check_pattern(code: &str, pattern: &str) -> Result<RuleOutcome, RuleError> {
    Ok(if compile(pattern)?.is_match(code) {
        RuleOutcome::Pass(Captures::new())
    } else {
        RuleOutcome::Missing("Código inválido.".to_string())
    })
}

fn check_within(
    code: &str,
    outer: &str,
    inner: &str,
    window: usize,
) -> Result<RuleOutcome, RuleError> {
    let outer_re = compile(outer)?;
    let inner_re = compile(inner)?;

    let Some(anchor) = outer_re.find(code) else {
        return Ok(RuleOutcome::Missing(
            "No se encontró la estructura que pide la tarea.".to_string(),
        ));
    };

    Ok(if inner_re.is_match(trailing_window(code, anchor.end(), window)) {
        RuleOutcome::Pass(Captures::new())
    } else {
        RuleOutcome::Mismatch(
            "La estructura está, pero falta la instrucción dentro de su bloque.".to_string(),
        )
    })
}

/// Up to `window` characters of `text` starting at byte offset `start`.
fn trailing_window(text: &str, start: usize, window: usize) -> &str {
    let rest = &text[start..];
    let end = rest
        .char_indices()
        .nth(window)
        .map_or(rest.len(), |(idx, _)| idx);
    &rest[..end]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn captures(pairs: &[(&str, SimValue)]) -> Captures {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------------

    #[test]
    fn test_assign_exact_value_passes_and_captures() {
        let outcome = Rule::assign_value("edad", "25").evaluate("edad = 25").unwrap();
        assert_eq!(
            outcome,
            RuleOutcome::Pass(captures(&[("edad", SimValue::Int(25))]))
        );
    }

    #[test]
    fn test_assign_tolerates_whitespace() {
        let rule = Rule::assign_value("edad", "25");
        assert!(rule.evaluate("edad=25").unwrap().is_pass());
        assert!(rule.evaluate("   edad   =   25   ").unwrap().is_pass());
        assert!(rule.evaluate("x = 1\n\tedad =25\ny = 2").unwrap().is_pass());
    }

    #[test]
    fn test_assign_allows_trailing_semicolon() {
        let rule = Rule::assign_value("edad", "25");
        assert!(rule.evaluate("edad=25;").unwrap().is_pass());
        assert!(rule.evaluate("edad = 25 ;").unwrap().is_pass());

        let wrong = rule.evaluate("edad = 30;").unwrap();
        assert!(matches!(
            &wrong,
            RuleOutcome::Mismatch(msg) if msg.contains("su valor es 30; se esperaba 25.")
        ));
        assert_eq!(
            assignments("nombre = 'Ana';"),
            vec![("nombre".to_string(), Some(SimValue::from("Ana")))]
        );
    }

    #[test]
    fn test_assign_wrong_value_is_specific() {
        let rule = Rule::assign_value("edad", "25");
        let wrong = rule.evaluate("edad = 30").unwrap();
        let absent = rule.evaluate("nombre = 'Ana'").unwrap();

        assert!(matches!(&wrong, RuleOutcome::Mismatch(msg) if msg.contains("30")));
        assert!(matches!(&absent, RuleOutcome::Missing(_)));
        assert_ne!(wrong, absent);
    }

    #[test]
    fn test_assign_any_matching_occurrence_wins() {
        let rule = Rule::assign_value("edad", "25");
        assert!(rule.evaluate("edad = 30\nedad = 25").unwrap().is_pass());
    }

    #[test]
    fn test_assign_string_value() {
        let rule = Rule::assign_value("nombre", "\"Ana\"");
        assert!(rule.evaluate("nombre = 'Ana'").unwrap().is_pass());
        assert!(matches!(
            rule.evaluate("nombre = \"Luis\"").unwrap(),
            RuleOutcome::Mismatch(_)
        ));
    }

    #[test]
    fn test_assign_ignores_comparisons_and_other_names() {
        let rule = Rule::assign_value("edad", "25");
        assert!(matches!(
            rule.evaluate("edad == 25").unwrap(),
            RuleOutcome::Missing(_)
        ));
        assert!(matches!(
            rule.evaluate("mi_edad = 25\nedad2 = 25").unwrap(),
            RuleOutcome::Missing(_)
        ));
        assert!(matches!(
            rule.evaluate("if edad <= 25:").unwrap(),
            RuleOutcome::Missing(_)
        ));
    }

    #[test]
    fn test_assign_without_value_is_mismatch() {
        let outcome = Rule::assign("edad").evaluate("edad =").unwrap();
        assert!(matches!(outcome, RuleOutcome::Mismatch(_)));
    }

    #[test]
    fn test_named_assign_accepts_expressions() {
        let outcome = Rule::assign("nombre").evaluate("nombre = input()").unwrap();
        assert_eq!(
            outcome,
            RuleOutcome::Pass(captures(&[(
                "nombre",
                SimValue::Token("input()".to_string())
            )]))
        );
    }

    #[test]
    fn test_any_assignment_requires_literal() {
        let rule = Rule::any_assignment();
        assert!(rule.evaluate("x = 5").unwrap().is_pass());
        assert!(rule.evaluate("nombre = \"Ana\"").unwrap().is_pass());
        assert!(matches!(
            rule.evaluate("total = a + b").unwrap(),
            RuleOutcome::Mismatch(_)
        ));
        assert!(matches!(
            rule.evaluate("print(5)").unwrap(),
            RuleOutcome::Missing(_)
        ));
    }

    #[test]
    fn test_assignments_lists_in_order() {
        let found = assignments("a = 1\nb = 'x'\nc =\nd == 2");
        assert_eq!(
            found,
            vec![
                ("a".to_string(), Some(SimValue::Int(1))),
                ("b".to_string(), Some(SimValue::from("x"))),
                ("c".to_string(), None),
            ]
        );
    }

    // ------------------------------------------------------------------------
    // Call shape
    // ------------------------------------------------------------------------

    #[test]
    fn test_call_without_argument() {
        let rule = Rule::call("input");
        assert!(rule.evaluate("n = input ('Nombre: ')").unwrap().is_pass());
        assert!(matches!(
            rule.evaluate("n = inputs").unwrap(),
            RuleOutcome::Missing(_)
        ));
        // Must be the whole name
        assert!(matches!(
            rule.evaluate("raw_input()").unwrap(),
            RuleOutcome::Missing(_)
        ));
    }

    #[test]
    fn test_call_with_argument_pattern() {
        let rule = Rule::call_with("print", r#""Hola""#);
        assert!(rule.evaluate(r#"print("Hola")"#).unwrap().is_pass());
        assert!(rule.evaluate(r#"print(  "Hola"  )"#).unwrap().is_pass());
        assert!(matches!(
            rule.evaluate(r#"print("Adiós")"#).unwrap(),
            RuleOutcome::Mismatch(_)
        ));
        assert!(matches!(
            rule.evaluate("x = 1").unwrap(),
            RuleOutcome::Missing(_)
        ));
    }

    #[test]
    fn test_call_argument_order_matters() {
        let rule = Rule::call_with("range", r"1\s*,\s*5");
        assert!(rule.evaluate("range(1, 5)").unwrap().is_pass());
        assert!(!rule.evaluate("range(5, 1)").unwrap().is_pass());
    }

    #[test]
    fn test_call_bad_argument_pattern_is_error() {
        let err = Rule::call_with("print", "(").evaluate("print(1)").unwrap_err();
        assert!(matches!(err, RuleError::BadPattern { pattern, .. } if pattern == "("));
    }

    // ------------------------------------------------------------------------
    // Pattern
    // ------------------------------------------------------------------------

    #[test]
    fn test_pattern_uses_override_feedback() {
        let rule = Rule::pattern(r"\bfor\b.*\bin\b").on_missing("Falta un for.");
        assert!(rule.evaluate("for i in range(3):").unwrap().is_pass());
        assert_eq!(
            rule.evaluate("while True:").unwrap(),
            RuleOutcome::Missing("Falta un for.".to_string())
        );
    }

    #[test]
    fn test_pattern_dot_does_not_cross_lines() {
        let rule = Rule::pattern(r"\bif\b.*:");
        assert!(!rule.evaluate("if x\n:").unwrap().is_pass());
    }

    #[test]
    fn test_pattern_invalid_regex_is_error() {
        assert!(Rule::pattern("[").evaluate("anything").is_err());
    }

    // ------------------------------------------------------------------------
    // Containment
    // ------------------------------------------------------------------------

    #[test]
    fn test_within_finds_inner_after_outer() {
        let rule = Rule::within(r"\bif\b[^\n]*:", r"\bprint\s*\(");
        assert!(rule
            .evaluate("if 5 > 2:\n    print(\"Sí\")")
            .unwrap()
            .is_pass());
    }

    #[test]
    fn test_within_inner_before_outer_fails() {
        let rule = Rule::within(r"\bif\b[^\n]*:", r"\bprint\s*\(");
        assert!(matches!(
            rule.evaluate("print(1)\nif x:\n    pass").unwrap(),
            RuleOutcome::Mismatch(_)
        ));
    }

    #[test]
    fn test_within_missing_outer() {
        let rule = Rule::within(r"\bif\b[^\n]*:", r"\bprint\s*\(");
        assert!(matches!(
            rule.evaluate("print(1)").unwrap(),
            RuleOutcome::Missing(_)
        ));
    }

    #[test]
    fn test_within_is_textual_not_structural() {
        let rule = Rule::within(r"\bif\b[^\n]*:", r"\bprint\s*\(");
        // Dedented, so outside the block, yet inside the window: still passes.
        assert!(rule
            .evaluate("if x:\n    pass\nprint(1)")
            .unwrap()
            .is_pass());
    }

    #[test]
    fn test_within_respects_window_size() {
        let code = format!("if x:\n{}print(1)", " ".repeat(50));
        let narrow = Rule::within(r"\bif\b[^\n]*:", r"\bprint\s*\(").window(20);
        let wide = Rule::within(r"\bif\b[^\n]*:", r"\bprint\s*\(").window(80);

        assert!(!narrow.evaluate(&code).unwrap().is_pass());
        assert!(wide.evaluate(&code).unwrap().is_pass());
    }

    #[test]
    fn test_within_window_counts_characters() {
        // Multi-byte characters must not split a UTF-8 boundary
        let code = "if x:\nñññññññññ print(1)";
        let rule = Rule::within(r"\bif\b[^\n]*:", r"print").window(5);
        assert!(!rule.evaluate(code).unwrap().is_pass());
    }

    #[test]
    fn test_within_only_uses_first_outer_match() {
        let code = format!("if a:\n    pass\n{}if b:\n    print(1)", "#".repeat(200));
        let rule = Rule::within(r"\bif\b[^\n]*:", r"\bprint\s*\(");
        assert!(!rule.evaluate(&code).unwrap().is_pass());
    }

    // ------------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------------

    #[test]
    fn test_rule_deserialization() {
        let json = r#"{"kind": "assign", "name": "edad", "value": "25", "mismatch": "Casi"}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule, Rule::assign_value("edad", "25").on_mismatch("Casi"));

        let json = r#"{"kind": "within", "outer": "if", "inner": "print"}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule, Rule::within("if", "print"));

        let rule: Rule = serde_json::from_str(r#"{"kind": "acknowledge"}"#).unwrap();
        assert_eq!(rule, Rule::acknowledge());
    }

    #[test]
    fn test_unknown_rule_kind_rejected() {
        let result: Result<Rule, _> = serde_json::from_str(r#"{"kind": "execute"}"#);
        assert!(result.is_err());
    }
}
