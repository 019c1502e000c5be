use flowsync_core::{FieldMap, FieldValue, FlowId, FlowRecord};
use flowsync_engine::Engine;
use flowsync_storage::{SqliteStorage, StorageError};

use crate::collab::{ScriptedDiscovery, StaticAuthorizer};
use crate::store::{RecordingStore, WriteCounts};

pub type TestEngine = Engine<RecordingStore<SqliteStorage>, ScriptedDiscovery, StaticAuthorizer>;

/// Build a field mapping from literal pairs.
pub fn fields(entries: &[(&str, FieldValue)]) -> FieldMap {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// One operator client over an in-memory store, with handles on its
/// collaborators.
pub struct TestPeer {
    pub engine: TestEngine,
    pub discovery: ScriptedDiscovery,
    pub authorizer: StaticAuthorizer,
}

impl TestPeer {
    pub fn new() -> Result<Self, StorageError> {
        let discovery = ScriptedDiscovery::new();
        let authorizer = StaticAuthorizer::new(true);
        let storage = RecordingStore::new(SqliteStorage::open_in_memory()?);
        Ok(Self {
            engine: Engine::new(storage, discovery.clone(), authorizer.clone()),
            discovery,
            authorizer,
        })
    }

    /// Create a record through the engine and return its identifier.
    pub fn create_flow(
        &mut self,
        entries: &[(&str, FieldValue)],
    ) -> Result<FlowId, Box<dyn std::error::Error>> {
        let record = self.engine.create_flow(&fields(entries))?;
        Ok(record.identifier)
    }

    /// Create a record and lock it.
    pub fn create_locked_flow(
        &mut self,
        entries: &[(&str, FieldValue)],
    ) -> Result<FlowId, Box<dyn std::error::Error>> {
        let identifier = self.create_flow(entries)?;
        self.engine.set_lock(&identifier, true)?;
        Ok(identifier)
    }

    pub fn set_candidate(&self, identifier: &FlowId, entries: &[(&str, FieldValue)]) {
        self.discovery.set_candidate(identifier, fields(entries));
    }

    pub fn record(&self, identifier: &FlowId) -> Result<FlowRecord, Box<dyn std::error::Error>> {
        self.engine
            .get_flow(identifier)?
            .ok_or_else(|| format!("flow {identifier} missing").into())
    }

    pub fn writes(&self) -> WriteCounts {
        self.engine.storage().counts()
    }
}
