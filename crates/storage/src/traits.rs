use flowsync_core::{FlowId, FlowRecord, Patch};

use crate::error::StorageError;

/// Canonical record storage.
///
/// Implementations own persistence and are shared across sessions; callers
/// only read records and propose writes.
pub trait FlowStore {
    /// Read a record, or `None` if the identifier is unknown.
    fn read(&self, identifier: &FlowId) -> Result<Option<FlowRecord>, StorageError>;

    /// Insert a new record. Fails with `Conflict` if the identifier is taken.
    fn insert(&mut self, record: &FlowRecord) -> Result<FlowRecord, StorageError>;

    /// Apply a partial update. A `Null` value removes the field.
    ///
    /// Fails with `NotFound` for unknown identifiers and `Conflict` when the
    /// record is locked.
    fn write_patch(&mut self, identifier: &FlowId, patch: &Patch)
        -> Result<FlowRecord, StorageError>;

    /// Set the lock flag. May fail with `Forbidden`.
    fn write_lock(&mut self, identifier: &FlowId, desired: bool)
        -> Result<FlowRecord, StorageError>;
}
