use std::collections::BTreeSet;

use crate::component::FlowId;
use crate::{Capacity, UNLIMITED};

#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct NodeIndex(usize);

impl NodeIndex {
    fn new(ix: usize) -> Self {
        NodeIndex(ix)
    }
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeIndex {
    fn from(ix: usize) -> Self {
        NodeIndex::new(ix)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct EdgeIndex(usize);

impl EdgeIndex {
    fn new(ix: usize) -> Self {
        EdgeIndex(ix)
    }
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for EdgeIndex {
    fn from(ix: usize) -> Self {
        EdgeIndex::new(ix)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Device {
    /// Metro/core router, hosts the AS cache
    Core,
    /// Shared access tree (PON) hanging off a single core node
    Access,
}

/// Edges are not tagged on creation, the class follows from their endpoints
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EdgeClass {
    Core,
    Upstream,
    Downstream,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub(super) edges: Vec<EdgeIndex>,
    pub(super) device: Device,
    pub(super) asid: u32,
    pub(super) customers: u32,
}

#[derive(Clone, Debug)]
pub struct Edge {
    pub(super) ends: (NodeIndex, NodeIndex),
    pub(super) length: f64,
    pub(super) max_capacity: Capacity,
    pub(super) spare_capacity: Capacity,
    pub(super) peak_capacity: Capacity,
    pub(super) active_flows: BTreeSet<FlowId>,
}

impl Node {
    pub fn new(device: Device, asid: u32, customers: u32) -> Self {
        Self { device, asid, customers, edges: vec![] }
    }
    pub fn device(&self) -> Device {
        self.device
    }
    pub fn asid(&self) -> u32 {
        self.asid
    }
    pub fn customers(&self) -> u32 {
        self.customers
    }
}

impl Edge {
    /// A negative capacity stands for an unlimited link
    pub fn new(ends: (NodeIndex, NodeIndex), capacity: Capacity, length: f64) -> Self {
        let max_capacity = if capacity < 0.0 { UNLIMITED } else { capacity };
        Edge {
            ends,
            length,
            max_capacity,
            spare_capacity: max_capacity,
            peak_capacity: 0.0,
            active_flows: BTreeSet::new(),
        }
    }
    pub fn ends(&self) -> (NodeIndex, NodeIndex) {
        self.ends
    }
    pub fn length(&self) -> f64 {
        self.length
    }
    pub fn max_capacity(&self) -> Capacity {
        self.max_capacity
    }
    pub fn spare_capacity(&self) -> Capacity {
        self.spare_capacity
    }
    pub fn peak_capacity(&self) -> Capacity {
        self.peak_capacity
    }
    pub fn active_flows(&self) -> &BTreeSet<FlowId> {
        &self.active_flows
    }
    pub fn is_unlimited(&self) -> bool {
        !self.max_capacity.is_finite()
    }
    /// Bandwidth each active flow would get if the edge were shared evenly
    pub fn fair_share(&self, flows: usize) -> Capacity {
        match flows {
            0 => self.max_capacity,
            n => self.max_capacity / n as f64,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Network {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    cores: Vec<NodeIndex>,
    accesses: Vec<NodeIndex>,
}

impl Network {
    pub fn new() -> Self {
        Self { ..Default::default() }
    }
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
    pub fn node(&self, node: NodeIndex) -> &Node {
        debug_assert!(node.index() < self.nodes.len());
        &self.nodes[node.index()]
    }
    pub fn edge(&self, edge: EdgeIndex) -> &Edge {
        debug_assert!(edge.index() < self.edges.len());
        &self.edges[edge.index()]
    }
    pub(super) fn edge_mut(&mut self, edge: EdgeIndex) -> &mut Edge {
        debug_assert!(edge.index() < self.edges.len());
        &mut self.edges[edge.index()]
    }
    pub fn edges(&self) -> impl Iterator<Item=(EdgeIndex, &Edge)> + '_ {
        self.edges.iter().enumerate()
            .map(|(ix, edge)| (EdgeIndex::new(ix), edge))
    }
    pub(super) fn edges_mut(&mut self) -> impl Iterator<Item=&mut Edge> + '_ {
        self.edges.iter_mut()
    }
    pub fn endpoints(&self, edge: EdgeIndex) -> &(NodeIndex, NodeIndex) {
        &self.edge(edge).ends
    }
    pub fn outgoings(&self, node: NodeIndex)
        -> impl Iterator<Item=EdgeIndex> + '_ {
        self.node(node).edges.iter().cloned()
    }
    pub fn edge_between(&self, src: NodeIndex, dst: NodeIndex) -> Option<EdgeIndex> {
        self.outgoings(src)
            .find(|&e| self.endpoints(e).1 == dst)
    }
    /// Core nodes in creation order; the n-th one is the n-th routing root
    pub fn cores(&self) -> &[NodeIndex] {
        &self.cores
    }
    pub fn accesses(&self) -> &[NodeIndex] {
        &self.accesses
    }
    pub fn is_access(&self, node: NodeIndex) -> bool {
        self.node(node).device == Device::Access
    }
    /// The single edge leading from an access tree up to its core node
    pub fn uplink(&self, node: NodeIndex) -> Option<EdgeIndex> {
        match self.is_access(node) {
            true => self.outgoings(node).next(),
            false => None,
        }
    }
    pub fn edge_class(&self, edge: EdgeIndex) -> EdgeClass {
        let (src, dst) = *self.endpoints(edge);
        if self.is_access(src) {
            EdgeClass::Upstream
        } else if self.is_access(dst) {
            EdgeClass::Downstream
        } else {
            EdgeClass::Core
        }
    }
    pub fn add_core(&mut self, asid: u32) -> NodeIndex {
        let ix = NodeIndex::new(self.nodes.len());
        self.nodes.push(Node::new(Device::Core, asid, 0));
        self.cores.push(ix);
        ix
    }
    /// Adds an access tree below `core` with its downstream and upstream links
    pub fn add_access(&mut self, core: NodeIndex, customers: u32,
                      down: Capacity, up: Capacity) -> NodeIndex {
        debug_assert!(!self.is_access(core));
        let asid = self.node(core).asid;
        let ix = NodeIndex::new(self.nodes.len());
        self.nodes.push(Node::new(Device::Access, asid, customers));
        self.accesses.push(ix);
        self.add_edge(core, ix, down, 1.0);
        self.add_edge(ix, core, up, 1.0);
        ix
    }
    pub fn add_edge(&mut self, src: NodeIndex, dst: NodeIndex,
                    capacity: Capacity, length: f64) -> EdgeIndex {
        debug_assert!(src != dst);
        debug_assert!(dst.index() < self.nodes.len());
        let ix = EdgeIndex::new(self.edges.len());
        self.nodes[src.index()].edges.push(ix);
        self.edges.push(Edge::new((src, dst), capacity, length));
        ix
    }
    /// Adds a core link in both directions, possibly asymmetric
    pub fn add_link(&mut self, ends: (NodeIndex, NodeIndex),
                    capacity: Capacity, reverse: Capacity, length: f64) {
        self.add_edge(ends.0, ends.1, capacity, length);
        self.add_edge(ends.1, ends.0, reverse, length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Network, NodeIndex) {
        let mut network = Network::new();
        let v0 = network.add_core(0);
        let v1 = network.add_core(1);
        network.add_link((v0, v1), 100.0, -1.0, 2.0);
        let pon = network.add_access(v0, 32, 2500.0, 1250.0);
        (network, pon)
    }

    #[test]
    fn it_lookups_edge_ends() {
        let (network, pon) = setup();
        assert_eq!(network.endpoints(0.into()), &(0.into(), 1.into()));
        assert_eq!(network.endpoints(1.into()), &(1.into(), 0.into()));
        assert_eq!(network.endpoints(2.into()), &(0.into(), pon));
        assert_eq!(network.endpoints(3.into()), &(pon, 0.into()));
    }

    #[test]
    fn it_classifies_edges() {
        let (network, _) = setup();
        assert_eq!(network.edge_class(0.into()), EdgeClass::Core);
        assert_eq!(network.edge_class(2.into()), EdgeClass::Downstream);
        assert_eq!(network.edge_class(3.into()), EdgeClass::Upstream);
    }

    #[test]
    fn it_finds_single_uplink() {
        let (network, pon) = setup();
        assert_eq!(network.uplink(pon), Some(3.into()));
        assert_eq!(network.uplink(0.into()), None);
        assert_eq!(network.node(pon).asid(), 0);
        assert_eq!(network.node(pon).customers(), 32);
    }

    #[test]
    fn it_treats_negative_capacity_as_unlimited() {
        let (network, _) = setup();
        assert!(!network.edge(0.into()).is_unlimited());
        assert!(network.edge(1.into()).is_unlimited());
        assert_eq!(network.edge(1.into()).spare_capacity(), UNLIMITED);
        assert_eq!(network.edge_between(1.into(), 0.into()), Some(1.into()));
        assert_eq!(network.edge_between(1.into(), 2.into()), None);
    }
}
