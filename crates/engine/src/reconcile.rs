//! Reconciliation of canonical records against discovery candidates.
//!
//! A session keeps at most one difference set, tagged with the identifier
//! it was computed for. A new check replaces it; a successful apply clears
//! it, so every apply acts on exactly one fresh comparison.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use flowsync_core::{CoreError, FieldMap, FieldValue, FlowId, FlowRecord, Patch, fields, normalize};
use tracing::{debug, warn};

use crate::error::EngineError;

/// Content hash of a difference set.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:02x}{:02x}...)", self.0[0], self.0[1])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Fields where the candidate disagrees with canonical, mapped to the
/// candidate's value.
#[derive(Debug, Clone)]
pub struct DifferenceSet {
    identifier: FlowId,
    generation: u64,
    entries: BTreeMap<String, FieldValue>,
    fingerprint: Fingerprint,
}

/// Value equality: same identifier and same entries. Generation is ignored.
impl PartialEq for DifferenceSet {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier && self.entries == other.entries
    }
}

impl Eq for DifferenceSet {}

impl DifferenceSet {
    pub fn identifier(&self) -> &FlowId {
        &self.identifier
    }

    /// Position of this result in the session's check sequence.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn fingerprint(
    identifier: &FlowId,
    entries: &BTreeMap<String, FieldValue>,
) -> Result<Fingerprint, CoreError> {
    let bytes = rmp_serde::to_vec(&(identifier, entries))
        .map_err(|e| CoreError::Serialization(e.to_string()))?;
    Ok(Fingerprint(*blake3::hash(&bytes).as_bytes()))
}

/// Pure field-level comparison of a candidate against canonical.
///
/// Only candidate keys are considered; a key the candidate doesn't carry is
/// never a difference. Reserved keys and names outside the registry are
/// skipped.
pub fn differences(canonical: &FlowRecord, candidate: &FieldMap) -> BTreeMap<String, FieldValue> {
    let mut out = BTreeMap::new();
    for (key, value) in candidate {
        if fields::is_reserved(key) {
            continue;
        }
        if fields::lookup(key).is_none() {
            debug!(flow_id = %canonical.identifier, field = %key, "ignoring unregistered candidate field");
            continue;
        }
        let proposed = normalize(key, Some(value));
        if proposed != normalize(key, canonical.get(key)) {
            out.insert(key.clone(), proposed.into_field_value());
        }
    }
    out
}

/// Single-slot reconciliation state for one operator session.
#[derive(Debug, Default)]
pub struct ReconciliationSession {
    current: Option<DifferenceSet>,
    generation: u64,
}

impl ReconciliationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent difference set, whatever identifier it belongs to.
    pub fn current(&self) -> Option<&DifferenceSet> {
        self.current.as_ref()
    }

    /// Most recent difference set if it was computed for `identifier`.
    pub fn current_for(&self, identifier: &FlowId) -> Option<&DifferenceSet> {
        self.current
            .as_ref()
            .filter(|set| set.identifier() == identifier)
    }

    /// Note that a check for `identifier` is starting. Any result for a
    /// different identifier stops being relevant.
    pub fn begin_check(&mut self, identifier: &FlowId) {
        if let Some(previous) = self.current.as_ref() {
            if previous.identifier() != identifier {
                debug!(
                    previous = %previous.identifier(),
                    next = %identifier,
                    "discarding reconciliation result for previous flow"
                );
                self.current = None;
            }
        }
    }

    /// Compare and store the result, replacing whatever was held before.
    pub fn check(
        &mut self,
        canonical: &FlowRecord,
        candidate: &FieldMap,
    ) -> Result<&DifferenceSet, EngineError> {
        let entries = differences(canonical, candidate);
        let fingerprint = fingerprint(&canonical.identifier, &entries)?;
        self.generation += 1;
        let set = DifferenceSet {
            identifier: canonical.identifier.clone(),
            generation: self.generation,
            entries,
            fingerprint,
        };
        Ok(self.current.insert(set))
    }

    /// Validate a selection against the current result and build the patch
    /// that would write it. Does not change session state.
    ///
    /// Checked in order: non-empty, fresh for `identifier`, subset of the
    /// difference set's keys.
    pub fn plan_apply(
        &self,
        identifier: &FlowId,
        selection: &BTreeSet<String>,
    ) -> Result<Patch, EngineError> {
        if selection.is_empty() {
            return Err(EngineError::EmptySelection);
        }
        let Some(set) = self.current_for(identifier) else {
            return Err(EngineError::StaleReconciliation(identifier.to_string()));
        };
        let outside: Vec<String> = selection
            .iter()
            .filter(|key| !set.contains(key))
            .cloned()
            .collect();
        if !outside.is_empty() {
            warn!(flow_id = %identifier, fields = ?outside, "selection outside difference set");
            return Err(EngineError::InvalidSelection { fields: outside });
        }
        Ok(selection
            .iter()
            .filter_map(|key| set.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    /// Drop the result for `identifier` after it has been acted on.
    pub fn invalidate(&mut self, identifier: &FlowId) {
        if self.current_for(identifier).is_some() {
            self.current = None;
        }
    }
}
