use flowsync_core::{
    FieldMap, FieldValue, FlowId, FlowRecord, Patch,
    fields::{self, ADDRESS_FIELDS, DISCOVERY_ID_FIELD, IDENTIFIER_FIELD, IDENTITY_FIELD},
    normalize,
};

use crate::error::EngineError;
use crate::snapshot::Snapshot;

/// Reject names outside the field registry. Reserved keys pass; callers
/// decide what to do with them.
pub fn check_known_fields(current: &FieldMap) -> Result<(), EngineError> {
    for key in current.keys() {
        if !fields::is_reserved(key) && fields::lookup(key).is_none() {
            return Err(EngineError::UnknownField(key.clone()));
        }
    }
    Ok(())
}

/// Minimal patch taking `original` to `current`.
///
/// Only keys present in `current` are considered. A key is included when
/// its normalized value differs from the snapshot's; the patch carries the
/// normalized storage form. Reserved keys never appear.
pub fn diff(original: &Snapshot, current: &FieldMap) -> Patch {
    current
        .iter()
        .filter(|(key, _)| !fields::is_reserved(key))
        .filter_map(|(key, value)| {
            let now = normalize(key, Some(value));
            if now == normalize(key, original.get(key)) {
                None
            } else {
                Some((key.clone(), now.into_field_value()))
            }
        })
        .collect()
}

/// A new record needs a display name or one of the address fields.
pub fn validate_creation(current: &FieldMap) -> Result<(), EngineError> {
    let present = std::iter::once(IDENTITY_FIELD)
        .chain(ADDRESS_FIELDS.iter().copied())
        .any(|key| !normalize(key, current.get(key)).is_null());
    if present {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "one of {IDENTITY_FIELD}, {} is required",
            ADDRESS_FIELDS.join(", ")
        )))
    }
}

fn non_empty_text(current: &FieldMap, key: &str) -> Option<String> {
    match current.get(key) {
        Some(FieldValue::Text(s)) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Build the record to insert from a creation form.
///
/// The identifier is the explicit `flow_id`, else the discovery flow id,
/// else freshly generated. Null-equivalent fields are dropped and numeric
/// fields are stored as numbers.
pub fn prepare_creation(current: &FieldMap) -> Result<FlowRecord, EngineError> {
    check_known_fields(current)?;
    validate_creation(current)?;

    let identifier = match non_empty_text(current, IDENTIFIER_FIELD)
        .or_else(|| non_empty_text(current, DISCOVERY_ID_FIELD))
    {
        Some(id) => FlowId::parse(&id)?,
        None => FlowId::generate(),
    };

    let mut record = FlowRecord::new(identifier);
    for (key, value) in current {
        if fields::is_reserved(key) {
            continue;
        }
        let value = normalize(key, Some(value));
        if !value.is_null() {
            record.fields.insert(key.clone(), value.into_field_value());
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, FieldValue)]) -> FieldMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn snapshot(entries: &[(&str, FieldValue)]) -> Snapshot {
        let mut record = FlowRecord::new(FlowId::parse("cam-1").unwrap());
        record.fields = map(entries);
        Snapshot::capture(&record)
    }

    #[test]
    fn changed_note_only() {
        let original = snapshot(&[("display_name", "Cam1".into()), ("note", "".into())]);
        let current = map(&[("display_name", "Cam1".into()), ("note", "moved".into())]);
        let patch = diff(&original, &current);
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.get("note"), Some(&FieldValue::Text("moved".into())));
    }

    #[test]
    fn null_and_empty_are_no_change() {
        let original = snapshot(&[("note", FieldValue::Null)]);
        let current = map(&[("note", "".into())]);
        assert!(diff(&original, &current).is_empty());
    }

    #[test]
    fn self_diff_is_empty() {
        let entries: [(&str, FieldValue); 3] = [
            ("display_name", "Cam1".into()),
            ("group_port_a", FieldValue::Integer(5004)),
            ("note", FieldValue::Null),
        ];
        assert!(diff(&snapshot(&entries), &map(&entries)).is_empty());
    }

    #[test]
    fn identifier_never_in_patch() {
        let original = snapshot(&[]);
        let current = map(&[("flow_id", "other".into()), ("locked", true.into())]);
        assert!(diff(&original, &current).is_empty());
    }

    #[test]
    fn keys_missing_from_current_are_ignored() {
        let original = snapshot(&[("note", "keep".into())]);
        assert!(diff(&original, &FieldMap::new()).is_empty());
    }

    #[test]
    fn cleared_field_becomes_null() {
        let original = snapshot(&[("alias1", "old".into())]);
        let patch = diff(&original, &map(&[("alias1", "".into())]));
        assert_eq!(patch.get("alias1"), Some(&FieldValue::Null));
    }

    #[test]
    fn numeric_text_matches_stored_number() {
        let original = snapshot(&[("group_port_a", FieldValue::Integer(5004))]);
        assert!(diff(&original, &map(&[("group_port_a", "5004".into())])).is_empty());
        let patch = diff(&original, &map(&[("group_port_a", "5006".into())]));
        assert_eq!(patch.get("group_port_a"), Some(&FieldValue::Integer(5006)));
    }

    #[test]
    fn creation_requires_name_or_address() {
        assert!(matches!(
            validate_creation(&map(&[("note", "x".into()), ("display_name", "".into())])),
            Err(EngineError::Validation(_))
        ));
        assert!(validate_creation(&map(&[("source_addr_a", "10.0.0.5".into())])).is_ok());
    }

    #[test]
    fn creation_identifier_precedence() {
        let explicit = prepare_creation(&map(&[
            ("flow_id", "f-1".into()),
            ("nmos_flow_id", "n-1".into()),
            ("display_name", "Cam".into()),
        ]))
        .unwrap();
        assert_eq!(explicit.identifier.as_str(), "f-1");
        assert!(explicit.get("flow_id").is_none());

        let from_discovery = prepare_creation(&map(&[
            ("flow_id", "".into()),
            ("nmos_flow_id", "n-1".into()),
            ("display_name", "Cam".into()),
        ]))
        .unwrap();
        assert_eq!(from_discovery.identifier.as_str(), "n-1");

        let generated = prepare_creation(&map(&[("display_name", "Cam".into())])).unwrap();
        assert!(!generated.identifier.as_str().is_empty());
    }

    #[test]
    fn creation_drops_nulls_and_rejects_unknown() {
        let record = prepare_creation(&map(&[
            ("display_name", "Cam".into()),
            ("note", "".into()),
            ("group_port_a", "5004".into()),
        ]))
        .unwrap();
        assert!(record.get("note").is_none());
        assert_eq!(record.get("group_port_a"), Some(&FieldValue::Integer(5004)));
        assert!(!record.locked);

        assert!(matches!(
            prepare_creation(&map(&[("display_name", "Cam".into()), ("colour", "red".into())])),
            Err(EngineError::UnknownField(f)) if f == "colour"
        ));
    }
}
