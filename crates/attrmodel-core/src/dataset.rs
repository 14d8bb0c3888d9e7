//! Baseline + pending-changes value store backing one model instance.
//!
//! A dataset starts transient. Writes land in a change overlay unless they
//! restore the baseline value, in which case the pending change is dropped.
//! An external persistence layer calls [`Dataset::mark_persisted`] after a
//! successful write-through and [`Dataset::mark_destroyed`] after a delete.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::value::Value;

/// The `(old, new)` pair for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Diff {
    /// Baseline value, or `Null` when absent.
    pub old: Value,
    /// Pending value, or `Null` when absent.
    pub new: Value,
}

impl Diff {
    pub fn new(old: impl Into<Value>, new: impl Into<Value>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
        }
    }

    /// Consume into a tuple.
    pub fn into_pair(self) -> (Value, Value) {
        (self.old, self.new)
    }
}

/// Field values for one model instance plus lifecycle flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    data: BTreeMap<String, Value>,
    changes: BTreeMap<String, Value>,
    persisted: bool,
    destroyed: bool,
}

impl Dataset {
    /// Create an empty transient dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transient dataset with the given baseline values.
    pub fn with_data<K, V, I>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            data: data
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// True if `name` has a pending change or a baseline value (even `Null`).
    pub fn has(&self, name: &str) -> bool {
        self.changes.contains_key(name) || self.data.contains_key(name)
    }

    /// Current value: the pending change, else the baseline.
    pub fn read(&self, name: &str) -> Option<&Value> {
        self.changes.get(name).or_else(|| self.data.get(name))
    }

    /// Current value, or `default` when the field is absent.
    pub fn read_or(&self, name: &str, default: Value) -> Value {
        self.read(name).cloned().unwrap_or(default)
    }

    /// Record a write.
    ///
    /// Writing the baseline value back clears any pending change for `name`.
    pub fn write(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();

        if self.data.get(&name) == Some(&value) {
            tracing::trace!(name = %name, reverted = true, "Dataset write");
            self.changes.remove(&name);
            return self;
        }

        tracing::trace!(name = %name, reverted = false, "Dataset write");
        self.changes.insert(name, value);
        self
    }

    /// True if `name` has a pending change.
    pub fn is_changed(&self, name: &str) -> bool {
        self.changes.contains_key(name)
    }

    /// True if any field has a pending change.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Names with pending changes, in sorted order.
    pub fn changed_names(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// The `(old, new)` pair to persist for `name`, if any.
    ///
    /// A persisted dataset reports nothing for unchanged fields. A transient
    /// dataset reports unchanged fields as `(Null, baseline)` so that initial
    /// values are still written on the first save.
    pub fn diff(&self, name: &str) -> Option<Diff> {
        let pending = self.changes.get(name);

        if self.persisted && pending.is_none() {
            return None;
        }

        let old = self.data.get(name).cloned().unwrap_or_default();

        match pending {
            Some(new) => Some(Diff::new(old, new.clone())),
            None => Some(Diff::new(Value::Null, old)),
        }
    }

    /// Fold pending changes into the baseline and mark the dataset persisted.
    pub fn mark_persisted(&mut self) -> &mut Self {
        let changes = std::mem::take(&mut self.changes);
        tracing::trace!(changes = changes.len(), "Dataset marked persisted");
        self.data.extend(changes);
        self.persisted = true;
        self.destroyed = false;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Drop all values and mark the dataset destroyed.
    pub fn mark_destroyed(&mut self) -> &mut Self {
        tracing::trace!("Dataset marked destroyed");
        self.data.clear();
        self.changes.clear();
        self.destroyed = true;
        self.persisted = false;
        self
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Merged view of baseline and pending values.
    pub fn values(&self) -> BTreeMap<String, Value> {
        let mut merged = self.data.clone();
        merged.extend(self.changes.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Map(self.values()))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Dataset {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::with_data(iter)
    }
}

impl From<HashMap<String, Value>> for Dataset {
    fn from(data: HashMap<String, Value>) -> Self {
        Self::with_data(data)
    }
}

impl From<BTreeMap<String, Value>> for Dataset {
    fn from(data: BTreeMap<String, Value>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn original() -> Dataset {
        Dataset::with_data([("original", true)])
    }

    #[test]
    fn test_read_falls_back_to_baseline_then_default() {
        let mut ds = original();
        assert_eq!(ds.read("original"), Some(&Value::Bool(true)));
        assert_eq!(ds.read("missing"), None);
        assert_eq!(ds.read_or("missing", Value::Int(3)), Value::Int(3));

        ds.write("original", false);
        assert_eq!(ds.read("original"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_write_back_to_baseline_clears_change() {
        let mut ds = original();
        ds.write("original", false);
        assert!(ds.is_changed("original"));

        ds.write("original", true);
        assert!(!ds.is_changed("original"));
        assert!(!ds.has_changes());
    }

    #[test]
    fn test_repeated_write_stays_changed() {
        let mut ds = Dataset::new();
        ds.write("a", 1);
        ds.write("a", 1);
        assert!(ds.is_changed("a"));
        assert_eq!(ds.changed_names().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_equality_is_strict_across_variants() {
        let mut ds = Dataset::with_data([("n", 1)]);
        ds.write("n", 1.0);
        assert!(ds.is_changed("n"));
    }

    #[test]
    fn test_has_covers_null_baseline() {
        let ds = Dataset::with_data([("nothing", Value::Null)]);
        assert!(ds.has("nothing"));
        assert!(!ds.has("other"));
    }

    #[test]
    fn test_diff_on_fresh_dataset() {
        let mut ds = Dataset::new();
        ds.write("original", true);
        assert_eq!(ds.diff("original"), Some(Diff::new(Value::Null, true)));
    }

    #[test]
    fn test_diff_unchanged_transient_reports_baseline_as_new() {
        let ds = original();
        assert_eq!(ds.diff("original"), Some(Diff::new(Value::Null, true)));
        assert_eq!(ds.diff("absent"), Some(Diff::new(Value::Null, Value::Null)));
    }

    #[test]
    fn test_diff_after_persist() {
        let mut ds = Dataset::new();
        ds.write("original", true);
        ds.mark_persisted();

        ds.write("original", true);
        assert_eq!(ds.diff("original"), None);

        ds.write("original", false);
        assert_eq!(ds.diff("original"), Some(Diff::new(true, false)));
    }

    #[test]
    fn test_diff_explicit_null_change_on_transient() {
        let mut ds = original();
        ds.write("original", Value::Null);
        assert_eq!(ds.diff("original"), Some(Diff::new(true, Value::Null)));
    }

    #[test]
    fn test_repeated_mark_persisted_without_writes() {
        let mut ds = original();
        ds.mark_persisted();
        ds.mark_persisted();
        assert!(ds.is_persisted());
        assert_eq!(ds.diff("original"), None);
        assert_eq!(ds.read("original"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_mark_persisted_merges_changes() {
        let mut ds = Dataset::with_data([("a", 1), ("b", 2)]);
        ds.write("b", 3).write("c", 4);
        ds.mark_persisted();

        assert!(!ds.has_changes());
        assert_eq!(ds.read("a"), Some(&Value::Int(1)));
        assert_eq!(ds.read("b"), Some(&Value::Int(3)));
        assert_eq!(ds.read("c"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_mark_destroyed_clears_everything() {
        let mut ds = original();
        ds.write("x", 1);
        ds.mark_persisted();
        ds.mark_destroyed();

        assert!(ds.is_destroyed());
        assert!(!ds.is_persisted());
        assert!(!ds.has("original"));
        assert!(!ds.has("x"));

        ds.mark_persisted();
        assert!(!ds.is_destroyed());
    }

    #[test]
    fn test_display_is_json_of_merged_values() {
        let mut ds = Dataset::with_data([("a", 1)]);
        ds.write("b", "two");
        assert_eq!(ds.to_string(), r#"{"a":1,"b":"two"}"#);
    }
}
