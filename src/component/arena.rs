use hashbrown::HashMap;

use super::flow::{Flow, FlowId};


/// Owner of every live flow; everything else refers to flows by `FlowId`.
#[derive(Clone, Debug, Default)]
pub struct FlowArena {
    flows: HashMap<FlowId, Flow>,
    next: FlowId,
}


impl FlowArena {
    pub fn new() -> Self {
        FlowArena { ..Default::default() }
    }
    /// Ids are never reused within a run
    pub fn insert(&mut self, flow: Flow) -> FlowId {
        let id = self.next;
        self.next += 1;
        self.flows.insert(id, flow);
        id
    }
    pub fn get(&self, id: FlowId) -> Option<&Flow> {
        self.flows.get(&id)
    }
    pub fn get_mut(&mut self, id: FlowId) -> Option<&mut Flow> {
        self.flows.get_mut(&id)
    }
    pub fn flow(&self, id: FlowId) -> &Flow {
        self.flows.get(&id)
            .expect("Failed to obtain flow from an invalid id")
    }
    pub fn flow_mut(&mut self, id: FlowId) -> &mut Flow {
        self.flows.get_mut(&id)
            .expect("Failed to obtain flow from an invalid id")
    }
    pub fn remove(&mut self, id: FlowId) -> Option<Flow> {
        self.flows.remove(&id)
    }
    pub fn contains(&self, id: FlowId) -> bool {
        self.flows.contains_key(&id)
    }
    pub fn len(&self) -> usize {
        self.flows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
    /// Live ids in ascending order
    pub fn ids(&self) -> Vec<FlowId> {
        let mut ids: Vec<FlowId> = self.flows.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}
