pub mod config;
pub mod diff;
pub mod error;
pub mod lock;
pub mod reconcile;
pub mod snapshot;
pub mod traits;

pub use config::{DiscoveryDefaults, EngineConfig};
pub use error::EngineError;
pub use lock::LockState;
pub use reconcile::{DifferenceSet, Fingerprint, ReconciliationSession};
pub use snapshot::{EditSession, Snapshot};
pub use traits::{Authorizer, DiscoveryError, DiscoveryParams, DiscoverySource};

use std::collections::BTreeSet;

use flowsync_core::{FieldMap, FlowId, FlowRecord};
use flowsync_storage::{FlowStore, StorageError};
use tracing::{debug, info, warn};

/// Result of submitting an edit session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(FlowRecord),
    Updated {
        record: FlowRecord,
        fields: Vec<String>,
    },
}

/// Result of a selective apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub record: FlowRecord,
    pub updated_fields: Vec<String>,
}

pub struct Engine<S, D, A> {
    storage: S,
    discovery: D,
    authorizer: A,
    reconciliation: ReconciliationSession,
    config: EngineConfig,
}

impl<S, D, A> Engine<S, D, A>
where
    S: FlowStore,
    D: DiscoverySource,
    A: Authorizer,
{
    pub fn new(storage: S, discovery: D, authorizer: A) -> Self {
        Self::with_config(storage, discovery, authorizer, EngineConfig::default())
    }

    pub fn with_config(storage: S, discovery: D, authorizer: A, config: EngineConfig) -> Self {
        Self {
            storage,
            discovery,
            authorizer,
            reconciliation: ReconciliationSession::new(),
            config,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn reconciliation(&self) -> &ReconciliationSession {
        &self.reconciliation
    }

    fn require_record(&self, identifier: &FlowId) -> Result<FlowRecord, EngineError> {
        self.storage
            .read(identifier)?
            .ok_or_else(|| EngineError::NotFound(identifier.to_string()))
    }

    pub fn get_flow(&self, identifier: &FlowId) -> Result<Option<FlowRecord>, EngineError> {
        Ok(self.storage.read(identifier)?)
    }

    // ========================================================================
    // Manual edits
    // ========================================================================

    /// Start editing an existing record.
    pub fn begin_edit(&self, identifier: &FlowId) -> Result<EditSession, EngineError> {
        let record = self.require_record(identifier)?;
        debug!(flow_id = %identifier, locked = record.locked, "edit session started");
        Ok(EditSession::begin(&record))
    }

    /// Start a session that creates a new record on submit.
    pub fn begin_create(&self) -> EditSession {
        EditSession::create()
    }

    /// Submit the operator's form. On success the session is discarded.
    ///
    /// Updates fail with `LockedRecord` when storage says the record is
    /// locked, and with `NoOpDiff` when nothing changed; neither issues a
    /// write and the session stays open.
    pub fn submit_edit(
        &mut self,
        session: &mut EditSession,
        current: &FieldMap,
    ) -> Result<SubmitOutcome, EngineError> {
        if !session.is_open() {
            return Err(EngineError::SessionClosed);
        }
        let outcome = match session.identifier().cloned() {
            None => SubmitOutcome::Created(self.create_flow(current)?),
            Some(identifier) => {
                let canonical = self.require_record(&identifier)?;
                session.observe_lock(canonical.locked);
                lock::enforce(&canonical)?;
                diff::check_known_fields(current)?;

                let snapshot = session.snapshot().ok_or(EngineError::SessionClosed)?;
                let patch = diff::diff(snapshot, current);
                if patch.is_empty() {
                    info!(flow_id = %identifier, "no changes to submit");
                    return Err(EngineError::NoOpDiff);
                }
                let fields: Vec<String> = patch.keys().map(str::to_string).collect();
                let record = self.storage.write_patch(&identifier, &patch)?;
                info!(flow_id = %identifier, fields = ?fields, "flow updated");
                SubmitOutcome::Updated { record, fields }
            }
        };
        session.discard();
        Ok(outcome)
    }

    /// Create a record from a form mapping.
    pub fn create_flow(&mut self, current: &FieldMap) -> Result<FlowRecord, EngineError> {
        let record = diff::prepare_creation(current)?;
        let stored = self.storage.insert(&record)?;
        info!(flow_id = %stored.identifier, fields = stored.fields.len(), "flow created");
        Ok(stored)
    }

    // ========================================================================
    // Reconciliation against discovery
    // ========================================================================

    /// Fetch the discovery candidate for `identifier` and compare it with the
    /// canonical record. The result replaces any earlier one in this session.
    pub fn check(&mut self, identifier: &FlowId) -> Result<&DifferenceSet, EngineError> {
        self.reconciliation.begin_check(identifier);
        let canonical = self.require_record(identifier)?;
        let params = DiscoveryParams::for_record(&canonical, &self.config.discovery);
        let candidate = self
            .discovery
            .fetch_candidate(identifier, &params)
            .inspect_err(|e| warn!(flow_id = %identifier, error = %e, "discovery fetch failed"))?;
        let set = self.reconciliation.check(&canonical, &candidate)?;
        info!(
            flow_id = %identifier,
            differences = set.len(),
            fingerprint = %set.fingerprint(),
            "discovery check completed"
        );
        Ok(set)
    }

    /// Write the selected fields of the current difference set for
    /// `identifier` into storage, then clear that difference set.
    pub fn apply<I, K>(&mut self, identifier: &FlowId, selection: I) -> Result<Applied, EngineError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.apply_inner(identifier, None, selection)
    }

    /// Like [`Engine::apply`], but also requires the current difference set
    /// to be the one the caller looked at.
    pub fn apply_verified<I, K>(
        &mut self,
        identifier: &FlowId,
        expected: Fingerprint,
        selection: I,
    ) -> Result<Applied, EngineError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.apply_inner(identifier, Some(expected), selection)
    }

    fn apply_inner<I, K>(
        &mut self,
        identifier: &FlowId,
        expected: Option<Fingerprint>,
        selection: I,
    ) -> Result<Applied, EngineError>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let selection: BTreeSet<String> = selection
            .into_iter()
            .map(|key| key.as_ref().to_string())
            .collect();

        let canonical = self.require_record(identifier)?;
        lock::enforce(&canonical)?;

        let patch = self.reconciliation.plan_apply(identifier, &selection)?;
        if let Some(expected) = expected {
            let current = self.reconciliation.current_for(identifier).map(|s| s.fingerprint());
            if current != Some(expected) {
                warn!(flow_id = %identifier, "difference set replaced since it was shown");
                return Err(EngineError::StaleReconciliation(identifier.to_string()));
            }
        }

        let record = self.storage.write_patch(identifier, &patch)?;
        self.reconciliation.invalidate(identifier);
        let updated_fields: Vec<String> = patch.keys().map(str::to_string).collect();
        info!(flow_id = %identifier, fields = ?updated_fields, "discovery values applied");
        Ok(Applied {
            record,
            updated_fields,
        })
    }

    // ========================================================================
    // Lock
    // ========================================================================

    pub fn lock_toggle_allowed(&self, identifier: &FlowId) -> bool {
        self.authorizer.can_toggle_lock(identifier)
    }

    /// Lock or unlock a record. Exempt from the lock guard; gated only by the
    /// authorizer. Requesting the current state is a successful no-op.
    pub fn set_lock(&mut self, identifier: &FlowId, desired: bool) -> Result<FlowRecord, EngineError> {
        if !self.authorizer.can_toggle_lock(identifier) {
            warn!(flow_id = %identifier, desired, "lock toggle refused");
            return Err(EngineError::PermissionDenied(identifier.to_string()));
        }
        let record = self.require_record(identifier)?;
        let Some(next) = LockState::of(&record).transition(desired) else {
            return Ok(record);
        };
        let record = match self.storage.write_lock(identifier, next.is_locked()) {
            Ok(record) => record,
            Err(StorageError::Forbidden(reason)) => {
                warn!(flow_id = %identifier, %reason, "storage refused lock toggle");
                return Err(EngineError::PermissionDenied(identifier.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        info!(flow_id = %identifier, locked = record.locked, "lock state changed");
        Ok(record)
    }
}
