use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use flowsync_core::{FieldMap, FlowId};
use flowsync_engine::{Authorizer, DiscoveryError, DiscoveryParams, DiscoverySource};

#[derive(Default)]
struct Script {
    candidates: HashMap<FlowId, Result<FieldMap, String>>,
    calls: Vec<(FlowId, DiscoveryParams)>,
}

/// Discovery source answering from a table the test fills in. Clones share
/// the same table, so a test can keep a handle after moving one into an
/// engine.
#[derive(Clone, Default)]
pub struct ScriptedDiscovery {
    script: Rc<RefCell<Script>>,
}

impl ScriptedDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_candidate(&self, identifier: &FlowId, candidate: FieldMap) {
        self.script
            .borrow_mut()
            .candidates
            .insert(identifier.clone(), Ok(candidate));
    }

    pub fn fail(&self, identifier: &FlowId, message: &str) {
        self.script
            .borrow_mut()
            .candidates
            .insert(identifier.clone(), Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.script.borrow().calls.len()
    }

    pub fn last_params(&self) -> Option<DiscoveryParams> {
        self.script.borrow().calls.last().map(|(_, params)| params.clone())
    }
}

impl DiscoverySource for ScriptedDiscovery {
    fn fetch_candidate(
        &self,
        identifier: &FlowId,
        params: &DiscoveryParams,
    ) -> Result<FieldMap, DiscoveryError> {
        let mut script = self.script.borrow_mut();
        script.calls.push((identifier.clone(), params.clone()));
        match script.candidates.get(identifier) {
            Some(Ok(candidate)) => Ok(candidate.clone()),
            Some(Err(message)) => Err(DiscoveryError(message.clone())),
            None => Err(DiscoveryError(format!("no discovery entry for {identifier}"))),
        }
    }
}

/// Authorizer with a single switch shared between clones.
#[derive(Clone)]
pub struct StaticAuthorizer {
    allowed: Rc<Cell<bool>>,
}

impl StaticAuthorizer {
    pub fn new(allowed: bool) -> Self {
        Self {
            allowed: Rc::new(Cell::new(allowed)),
        }
    }

    pub fn set_allowed(&self, allowed: bool) {
        self.allowed.set(allowed);
    }
}

impl Authorizer for StaticAuthorizer {
    fn can_toggle_lock(&self, _identifier: &FlowId) -> bool {
        self.allowed.get()
    }
}
