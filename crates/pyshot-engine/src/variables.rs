//! The simulated variable panel: what the learner has "defined" so far.

use std::collections::BTreeMap;

use crate::value::SimValue;

/// Cumulative view of values captured by passing attempts.
///
/// Later captures overwrite earlier ones with the same name. Nothing is ever
/// removed except by [`SimulatedVariables::reset`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulatedVariables {
    values: BTreeMap<String, SimValue>,
}

impl SimulatedVariables {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `partial` into the store, last write wins per name.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use pyshot_engine::{SimValue, SimulatedVariables};
    ///
    /// let mut vars = SimulatedVariables::new();
    /// vars.merge(BTreeMap::from([("nombre".to_string(), SimValue::from("Ana"))]));
    /// vars.merge(BTreeMap::from([("nombre".to_string(), SimValue::from("Luis"))]));
    ///
    /// assert_eq!(vars.get("nombre"), Some(&SimValue::from("Luis")));
    /// ```
    pub fn merge(&mut self, partial: BTreeMap<String, SimValue>) {
        self.values.extend(partial);
    }

    /// Read-only copy of every variable, ordered by name.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, SimValue> {
        self.values.clone()
    }

    /// Current value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SimValue> {
        self.values.get(name)
    }

    /// Number of defined variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing has been captured yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Forgets every variable.
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(name: &str, value: impl Into<SimValue>) -> BTreeMap<String, SimValue> {
        BTreeMap::from([(name.to_string(), value.into())])
    }

    #[test]
    fn test_last_write_wins() {
        let mut vars = SimulatedVariables::new();
        vars.merge(one("nombre", "Ana"));
        vars.merge(one("nombre", "Luis"));

        assert_eq!(vars.get("nombre"), Some(&SimValue::from("Luis")));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn test_merge_keeps_other_names() {
        let mut vars = SimulatedVariables::new();
        vars.merge(one("edad", 25_i64));
        vars.merge(one("activo", true));
        vars.merge(BTreeMap::new());

        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("edad"), Some(&SimValue::Int(25)));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut vars = SimulatedVariables::new();
        vars.merge(one("x", 1_i64));
        let snapshot = vars.snapshot();
        vars.merge(one("x", 2_i64));

        assert_eq!(snapshot.get("x"), Some(&SimValue::Int(1)));
        assert_eq!(vars.get("x"), Some(&SimValue::Int(2)));
    }

    #[test]
    fn test_reset() {
        let mut vars = SimulatedVariables::new();
        vars.merge(one("x", 1_i64));
        vars.reset();
        assert!(vars.is_empty());
        assert!(vars.get("x").is_none());
    }
}
