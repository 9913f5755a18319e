use serde::Serialize;

use crate::{Capacity, SimTime};


/// State of the graph at one instant, in a form that can be dumped as YAML
/// and fed to graph visualisation tools.
#[derive(Clone, Debug, Serialize)]
pub struct TopologySnapshot {
    pub round: u32,
    pub time: SimTime,
    pub central_server: usize,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NodeSnapshot {
    pub id: usize,
    pub asid: u32,
    pub access: bool,
    pub customers: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct EdgeSnapshot {
    pub source: usize,
    pub target: usize,
    pub length: f64,
    /// `None` for unlimited links
    pub max_capacity: Option<Capacity>,
    pub spare_capacity: Option<Capacity>,
    pub peak_capacity: Capacity,
    pub active_flows: usize,
    pub total_load: Capacity,
}

impl TopologySnapshot {
    pub fn file_name(&self) -> String {
        format!("out_{}_{}.yaml", self.round, self.time)
    }
    pub fn active_flows(&self) -> usize {
        self.edges.iter().map(|e| e.active_flows).sum()
    }
}
