use attrmodel::{Dataset, Diff, Value};
use proptest::prelude::*;

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        "[a-z]{0,6}".prop_map(Value::Text),
    ]
}

fn baseline() -> impl Strategy<Value = Vec<(String, Value)>> {
    prop::collection::vec(("[a-d]", value()), 0..6)
}

proptest! {
    #[test]
    fn write_then_read_returns_written(data in baseline(), name in "[a-f]", v in value()) {
        let mut ds = Dataset::with_data(data);
        ds.write(name.as_str(), v.clone());
        prop_assert_eq!(ds.read(&name), Some(&v));
    }

    #[test]
    fn writing_baseline_back_clears_change(data in baseline(), name in "[a-d]", v in value()) {
        let mut ds = Dataset::with_data(data);
        if let Some(original) = ds.read(&name).cloned() {
            ds.write(name.as_str(), v);
            ds.write(name.as_str(), original.clone());
            prop_assert!(!ds.is_changed(&name));
            prop_assert_eq!(ds.read(&name), Some(&original));
        }
    }

    #[test]
    fn persisted_without_writes_has_no_diff(data in baseline(), name in "[a-f]") {
        let mut ds = Dataset::with_data(data);
        ds.mark_persisted();
        prop_assert_eq!(ds.diff(&name), None);
        ds.mark_persisted();
        prop_assert_eq!(ds.diff(&name), None);
    }

    #[test]
    fn transient_unchanged_diff_reports_baseline_as_new(data in baseline(), name in "[a-f]") {
        let ds = Dataset::with_data(data);
        let baseline = ds.read(&name).cloned().unwrap_or_default();
        prop_assert_eq!(ds.diff(&name), Some(Diff::new(Value::Null, baseline)));
    }

    #[test]
    fn mark_persisted_folds_changes(data in baseline(), writes in baseline()) {
        let mut ds = Dataset::with_data(data);
        for (name, v) in &writes {
            ds.write(name.as_str(), v.clone());
        }
        let before = ds.values();
        ds.mark_persisted();
        prop_assert!(ds.is_persisted());
        prop_assert!(!ds.has_changes());
        prop_assert_eq!(ds.values(), before);
    }

    #[test]
    fn mark_destroyed_empties(data in baseline(), writes in baseline()) {
        let mut ds = Dataset::with_data(data);
        for (name, v) in writes {
            ds.write(name, v);
        }
        ds.mark_persisted();
        ds.mark_destroyed();
        prop_assert!(ds.is_destroyed());
        prop_assert!(!ds.is_persisted());
        prop_assert!(ds.values().is_empty());
    }
}

#[test]
fn round_trip_example() {
    let mut ds = Dataset::with_data([("original", true)]);
    ds.write("original", false);
    assert_eq!(ds.read("original"), Some(&Value::Bool(false)));
    ds.write("original", true);
    assert!(!ds.is_changed("original"));
}

#[test]
fn diff_truth_table() {
    let mut ds = Dataset::new();
    ds.write("original", true);
    assert_eq!(ds.diff("original"), Some(Diff::new(Value::Null, true)));

    ds.mark_persisted();
    ds.write("original", true);
    assert_eq!(ds.diff("original"), None);

    ds.write("original", false);
    assert_eq!(ds.diff("original"), Some(Diff::new(true, false)));
}
