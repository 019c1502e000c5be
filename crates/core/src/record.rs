use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::field_value::FieldValue;
use crate::fields;
use crate::ids::FlowId;

/// Schema-less field mapping as handed over by collaborators.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Canonical flow record as held by storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub identifier: FlowId,
    pub locked: bool,
    pub fields: FieldMap,
}

impl FlowRecord {
    pub fn new(identifier: FlowId) -> Self {
        Self {
            identifier,
            locked: false,
            fields: FieldMap::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

/// Minimal set of field changes for a partial update.
///
/// Never carries the identifier or the lock flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch(BTreeMap<String, FieldValue>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_insert(&mut self, key: &str, value: FieldValue) -> Result<(), CoreError> {
        if fields::is_reserved(key) {
            return Err(CoreError::ReservedField(key.to_string()));
        }
        self.0.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Collecting into a patch drops reserved keys.
impl FromIterator<(String, FieldValue)> for Patch {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .filter(|(key, _)| !fields::is_reserved(key))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_skips_reserved_keys() {
        let patch: Patch = [
            ("flow_id".to_string(), FieldValue::Text("x".into())),
            ("note".to_string(), FieldValue::Null),
        ]
        .into_iter()
        .collect();
        assert_eq!(patch.len(), 1);
        assert!(patch.contains_key("note"));
    }

    #[test]
    fn patch_rejects_reserved_keys() {
        let mut patch = Patch::new();
        assert!(matches!(
            patch.try_insert("flow_id", FieldValue::Text("x".into())),
            Err(CoreError::ReservedField(_))
        ));
        assert!(patch.try_insert("locked", FieldValue::Boolean(true)).is_err());
        assert!(patch.is_empty());

        patch.try_insert("note", FieldValue::Text("moved".into())).unwrap();
        assert_eq!(patch.keys().collect::<Vec<_>>(), vec!["note"]);
    }
}
