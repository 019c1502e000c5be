use std::cell::RefCell;
use std::rc::Rc;

use flowsync_core::{FlowId, FlowRecord, Patch};
use flowsync_storage::{FlowStore, SqliteStorage, StorageError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub inserts: usize,
    pub patches: usize,
    pub locks: usize,
}

impl WriteCounts {
    pub fn total(&self) -> usize {
        self.inserts + self.patches + self.locks
    }
}

/// Store wrapper that counts every write request, successful or not.
pub struct RecordingStore<S = SqliteStorage> {
    inner: S,
    counts: WriteCounts,
}

impl<S: FlowStore> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            counts: WriteCounts::default(),
        }
    }

    pub fn counts(&self) -> WriteCounts {
        self.counts
    }
}

impl<S: FlowStore> FlowStore for RecordingStore<S> {
    fn read(&self, identifier: &FlowId) -> Result<Option<FlowRecord>, StorageError> {
        self.inner.read(identifier)
    }

    fn insert(&mut self, record: &FlowRecord) -> Result<FlowRecord, StorageError> {
        self.counts.inserts += 1;
        self.inner.insert(record)
    }

    fn write_patch(
        &mut self,
        identifier: &FlowId,
        patch: &Patch,
    ) -> Result<FlowRecord, StorageError> {
        self.counts.patches += 1;
        self.inner.write_patch(identifier, patch)
    }

    fn write_lock(
        &mut self,
        identifier: &FlowId,
        desired: bool,
    ) -> Result<FlowRecord, StorageError> {
        self.counts.locks += 1;
        self.inner.write_lock(identifier, desired)
    }
}

/// One SQLite store shared by several client engines.
#[derive(Clone)]
pub struct SharedStore(Rc<RefCell<SqliteStorage>>);

impl SharedStore {
    pub fn new(storage: SqliteStorage) -> Self {
        Self(Rc::new(RefCell::new(storage)))
    }
}

impl FlowStore for SharedStore {
    fn read(&self, identifier: &FlowId) -> Result<Option<FlowRecord>, StorageError> {
        self.0.borrow().read(identifier)
    }

    fn insert(&mut self, record: &FlowRecord) -> Result<FlowRecord, StorageError> {
        self.0.borrow_mut().insert(record)
    }

    fn write_patch(
        &mut self,
        identifier: &FlowId,
        patch: &Patch,
    ) -> Result<FlowRecord, StorageError> {
        self.0.borrow_mut().write_patch(identifier, patch)
    }

    fn write_lock(
        &mut self,
        identifier: &FlowId,
        desired: bool,
    ) -> Result<FlowRecord, StorageError> {
        self.0.borrow_mut().write_lock(identifier, desired)
    }
}
