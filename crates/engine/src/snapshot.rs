use flowsync_core::{FieldMap, FieldValue, FlowId, FlowRecord};

/// Field mapping captured when an edit session begins. Never changes after
/// capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    identifier: FlowId,
    fields: FieldMap,
}

impl Snapshot {
    /// Deep copy of the record's fields. The lock flag is not part of it.
    pub fn capture(record: &FlowRecord) -> Self {
        Self {
            identifier: record.identifier.clone(),
            fields: record.fields.clone(),
        }
    }

    pub fn identifier(&self) -> &FlowId {
        &self.identifier
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EditTarget {
    Create,
    Update { snapshot: Snapshot, locked: bool },
}

/// One operator edit: either creating a new record or updating an existing
/// one against the snapshot taken at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    target: EditTarget,
    open: bool,
}

impl EditSession {
    pub fn begin(record: &FlowRecord) -> Self {
        Self {
            target: EditTarget::Update {
                snapshot: Snapshot::capture(record),
                locked: record.locked,
            },
            open: true,
        }
    }

    pub fn create() -> Self {
        Self {
            target: EditTarget::Create,
            open: true,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match &self.target {
            EditTarget::Update { snapshot, .. } if self.open => Some(snapshot),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&FlowId> {
        match &self.target {
            EditTarget::Update { snapshot, .. } => Some(snapshot.identifier()),
            EditTarget::Create => None,
        }
    }

    /// Lock flag as last seen by this session.
    pub fn locked(&self) -> bool {
        matches!(self.target, EditTarget::Update { locked: true, .. })
    }

    pub(crate) fn observe_lock(&mut self, now_locked: bool) {
        if let EditTarget::Update { locked, .. } = &mut self.target {
            *locked = now_locked;
        }
    }

    /// Re-baseline after the record was unlocked, so the next diff is taken
    /// against what storage holds now.
    pub fn refresh_after_unlock(&mut self, record: &FlowRecord) {
        if !self.open || record.locked {
            return;
        }
        if let EditTarget::Update { snapshot, locked } = &mut self.target {
            if snapshot.identifier() == &record.identifier {
                *snapshot = Snapshot::capture(record);
                *locked = false;
            }
        }
    }

    /// Release the snapshot. Called on cancel, successful submit, or when the
    /// operator navigates away. Storage is not touched.
    pub fn discard(&mut self) {
        if let EditTarget::Update { snapshot, .. } = &mut self.target {
            *snapshot = Snapshot {
                identifier: snapshot.identifier.clone(),
                fields: FieldMap::new(),
            };
        }
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FlowRecord {
        FlowRecord::new(FlowId::parse("cam-1").unwrap()).with_field("note", "a")
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut rec = record();
        let session = EditSession::begin(&rec);
        rec.fields.insert("note".into(), "b".into());
        assert_eq!(
            session.snapshot().unwrap().get("note"),
            Some(&FieldValue::Text("a".into()))
        );
    }

    #[test]
    fn discard_releases_snapshot() {
        let mut session = EditSession::begin(&record());
        session.discard();
        assert!(!session.is_open());
        assert!(session.snapshot().is_none());
        assert_eq!(session.identifier().map(FlowId::as_str), Some("cam-1"));
    }

    #[test]
    fn unlock_rebaselines() {
        let mut rec = record();
        rec.locked = true;
        let mut session = EditSession::begin(&rec);
        assert!(session.locked());

        rec.locked = false;
        rec.fields.insert("note".into(), "changed elsewhere".into());
        session.refresh_after_unlock(&rec);

        assert!(!session.locked());
        assert_eq!(
            session.snapshot().unwrap().get("note"),
            Some(&FieldValue::Text("changed elsewhere".into()))
        );
    }
}
