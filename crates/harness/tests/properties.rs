use std::collections::BTreeMap;

use flowsync_core::{FieldMap, FieldValue, FlowId, FlowRecord, normalize};
use flowsync_engine::reconcile::differences;
use flowsync_engine::{Snapshot, diff::diff};
use flowsync_harness::TestPeer;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

const KEYS: &[&str] = &[
    "flow_id",
    "locked",
    "display_name",
    "note",
    "nmos_label",
    "media_type",
    "user_field1",
    "group_port_a",
    "source_port_a",
];

fn value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        Just(FieldValue::Null),
        "[a-z0-9 .]{0,6}".prop_map(FieldValue::Text),
        any::<i64>().prop_map(FieldValue::Integer),
        (-1.0e6..1.0e6f64).prop_map(FieldValue::Float),
        any::<bool>().prop_map(FieldValue::Boolean),
    ]
}

fn mapping() -> impl Strategy<Value = FieldMap> {
    prop::collection::btree_map(prop::sample::select(KEYS).prop_map(str::to_string), value(), 0..7)
}

fn record(fields: &FieldMap) -> FlowRecord {
    let mut record = FlowRecord::new(FlowId::generate());
    record.fields = fields
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "flow_id" | "locked"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    record
}

/// Write `changes` the way storage does: Null removes the field.
fn write(record: &mut FlowRecord, changes: impl IntoIterator<Item = (String, FieldValue)>) {
    for (key, value) in changes {
        if value.is_null() {
            record.fields.remove(&key);
        } else {
            record.fields.insert(key, value);
        }
    }
}

fn fail(e: impl std::fmt::Display) -> TestCaseError {
    TestCaseError::fail(e.to_string())
}

// ============================================================================
// Edit diff
// ============================================================================

proptest! {
    #[test]
    fn diff_keys_come_from_current(original in mapping(), current in mapping()) {
        let patch = diff(&Snapshot::capture(&record(&original)), &current);
        for key in patch.keys() {
            prop_assert!(current.contains_key(key));
            prop_assert!(key != "flow_id" && key != "locked");
        }
    }

    #[test]
    fn diff_of_unchanged_form_is_empty(original in mapping()) {
        let snapshot = Snapshot::capture(&record(&original));
        let unchanged = snapshot.fields().clone();
        prop_assert!(diff(&snapshot, &unchanged).is_empty());
    }

    #[test]
    fn written_diff_leaves_nothing_to_submit(original in mapping(), current in mapping()) {
        let mut stored = record(&original);
        let patch = diff(&Snapshot::capture(&stored), &current);
        for (key, value) in patch.iter() {
            let now = normalize(key, current.get(key)).into_field_value();
            prop_assert_eq!(value, &now);
        }
        write(&mut stored, patch.iter().map(|(k, v)| (k.to_string(), v.clone())));
        prop_assert!(diff(&Snapshot::capture(&stored), &current).is_empty());
    }
}

// ============================================================================
// Discovery differences
// ============================================================================

proptest! {
    #[test]
    fn differences_are_pure_and_settle(canonical in mapping(), candidate in mapping()) {
        let mut stored = record(&canonical);
        let first = differences(&stored, &candidate);
        prop_assert_eq!(&first, &differences(&stored, &candidate));
        for key in first.keys() {
            prop_assert!(candidate.contains_key(key));
        }

        write(&mut stored, first);
        prop_assert_eq!(differences(&stored, &candidate), BTreeMap::new());
    }

    #[test]
    fn applied_fields_are_not_reported_again(candidate in mapping()) {
        let mut peer = TestPeer::new().map_err(fail)?;
        let id = peer
            .create_flow(&[("display_name", "Cam1".into()), ("note", "base".into())])
            .map_err(fail)?;
        peer.discovery.set_candidate(&id, candidate);

        let first = peer.engine.check(&id).map_err(fail)?.clone();
        let second = peer.engine.check(&id).map_err(fail)?.clone();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(peer.writes().patches, 0);

        if !first.is_empty() {
            let all: Vec<String> = first.keys().map(str::to_string).collect();
            peer.engine.apply(&id, &all).map_err(fail)?;
        }
        prop_assert!(peer.engine.check(&id).map_err(fail)?.is_empty());
    }
}
