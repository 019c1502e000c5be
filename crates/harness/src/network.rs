use flowsync_engine::Engine;
use flowsync_storage::{SqliteStorage, StorageError};

use crate::collab::{ScriptedDiscovery, StaticAuthorizer};
use crate::store::SharedStore;

pub type ClientEngine = Engine<SharedStore, ScriptedDiscovery, StaticAuthorizer>;

/// Several independent client sessions over one shared store and one
/// discovery system.
pub struct TestNetwork {
    store: SharedStore,
    pub discovery: ScriptedDiscovery,
    clients: Vec<ClientEngine>,
}

impl TestNetwork {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self {
            store: SharedStore::new(SqliteStorage::open_in_memory()?),
            discovery: ScriptedDiscovery::new(),
            clients: Vec::new(),
        })
    }

    pub fn add_client(&mut self) -> usize {
        let engine = Engine::new(
            self.store.clone(),
            self.discovery.clone(),
            StaticAuthorizer::new(true),
        );
        let index = self.clients.len();
        self.clients.push(engine);
        index
    }

    pub fn client(&self, index: usize) -> &ClientEngine {
        &self.clients[index]
    }

    pub fn client_mut(&mut self, index: usize) -> &mut ClientEngine {
        &mut self.clients[index]
    }
}
