use crate::network::NodeIndex;
use crate::{Capacity, SimTime, INF_TIME};

/// Handle of a flow inside the `FlowArena`
pub type FlowId = usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
    Request,
    Transfer,
    Watch,
    Snapshot,
    Terminate,
}

/// A customer slot hanging off an access node (or a cache/server on a core node).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct User {
    pub node: NodeIndex,
    pub slot: u32,
}

impl User {
    pub fn new(node: NodeIndex, slot: u32) -> Self {
        User { node, slot }
    }
}

impl From<NodeIndex> for User {
    fn from(node: NodeIndex) -> Self {
        User::new(node, 0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Content {
    pub id: u32,
    /// Total size in Mb
    pub size: Capacity,
    /// Size of every chunk except possibly the last one
    pub chunk_size: Capacity,
    pub release_round: u32,
}

impl Content {
    pub fn new(id: u32, size: Capacity) -> Self {
        Content { id, size, chunk_size: size, release_round: 0 }
    }
    pub fn with_chunks(id: u32, size: Capacity, chunk_size: Capacity) -> Self {
        debug_assert!(chunk_size > 0.0);
        Content { id, size, chunk_size, release_round: 0 }
    }
    pub fn chunk_count(&self) -> u32 {
        (self.size / self.chunk_size).ceil().max(1.0) as u32
    }
    /// Size of the chunk at `index`; the last chunk holds the remainder
    pub fn chunk(&self, index: u32) -> Capacity {
        let offset = self.chunk_size * index as f64;
        (self.size - offset).max(0.0).min(self.chunk_size)
    }
}

/// One data transfer, or a control event of the scheduler.
///
/// Bandwidth and eta are only written by the topology and the scheduler, so
/// their setters are crate-private.
#[derive(Clone, Debug)]
pub struct Flow {
    source: Option<User>,
    destination: Option<User>,
    start: SimTime,
    eta: SimTime,
    content: Option<Content>,
    chunk_index: u32,
    bandwidth: Capacity,
    last_update: SimTime,
    size_downloaded: Capacity,
    size_requested: Capacity,
    peer_flow: bool,
    kind: FlowKind,
}

impl Flow {
    pub fn new(content: Option<Content>, destination: User, eta: SimTime,
               chunk_index: u32, kind: FlowKind) -> Self {
        let size_requested = content
            .map(|c| c.chunk(chunk_index))
            .unwrap_or(0.0);
        Flow {
            source: None,
            destination: Some(destination),
            start: INF_TIME,
            eta,
            content,
            chunk_index,
            bandwidth: 0.0,
            last_update: INF_TIME,
            size_downloaded: 0.0,
            size_requested,
            peer_flow: false,
            kind,
        }
    }
    /// A REQUEST for the whole first unit of `content`
    pub fn request(content: Content, destination: User, eta: SimTime) -> Self {
        Flow::new(Some(content), destination, eta, 0, FlowKind::Request)
    }
    /// A TERMINATE or SNAPSHOT marker, without content nor endpoints
    pub fn control(kind: FlowKind, eta: SimTime) -> Self {
        debug_assert!(matches!(kind, FlowKind::Terminate | FlowKind::Snapshot));
        Flow {
            destination: None,
            size_requested: 0.0,
            content: None,
            ..Flow::new(None, User::default(), eta, 0, kind)
        }
    }
    pub fn with_source(mut self, source: User) -> Self {
        self.source = Some(source);
        self
    }

    pub fn source(&self) -> Option<User> {
        self.source
    }
    pub fn destination(&self) -> Option<User> {
        self.destination
    }
    /// Vertices the flow is routed between; panics on unresolved flows
    pub fn route_ends(&self) -> (NodeIndex, NodeIndex) {
        match (self.source, self.destination) {
            (Some(src), Some(dst)) => (src.node, dst.node),
            _ => panic!("Failed to route a flow with unresolved endpoints: {:?}", self),
        }
    }
    /// Content already held by the requester, nothing needs to move
    pub fn is_virtual(&self) -> bool {
        self.source.is_some() && self.source == self.destination
    }
    pub fn start(&self) -> SimTime {
        self.start
    }
    pub fn eta(&self) -> SimTime {
        self.eta
    }
    pub fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }
    pub fn chunk_index(&self) -> u32 {
        self.chunk_index
    }
    pub fn bandwidth(&self) -> Capacity {
        self.bandwidth
    }
    pub fn last_update(&self) -> SimTime {
        self.last_update
    }
    pub fn size_downloaded(&self) -> Capacity {
        self.size_downloaded
    }
    pub fn size_requested(&self) -> Capacity {
        self.size_requested
    }
    pub fn is_peer_flow(&self) -> bool {
        self.peer_flow
    }
    pub fn kind(&self) -> FlowKind {
        self.kind
    }
    /// Size of the unit being moved: the chunk, or nothing for control events
    pub fn unit_size(&self) -> Capacity {
        self.content
            .map(|c| c.chunk(self.chunk_index))
            .unwrap_or(0.0)
    }
    /// Queue ordering key: eta first, TERMINATE after everything else due at
    /// the same instant
    pub fn order_key(&self) -> (SimTime, bool) {
        (self.eta, self.kind == FlowKind::Terminate)
    }

    pub fn set_source(&mut self, source: User) {
        self.source = Some(source);
    }
    pub fn set_kind(&mut self, kind: FlowKind) {
        self.kind = kind;
    }
    pub fn set_peer_flow(&mut self, peer_flow: bool) {
        self.peer_flow = peer_flow;
    }
    /// Part of the unit the requester intends to consume before abandoning
    pub fn set_size_requested(&mut self, size: Capacity) {
        self.size_requested = num::clamp(size, 0.0, self.unit_size());
    }
    pub fn set_size_downloaded(&mut self, size: Capacity) {
        self.size_downloaded = size.min(self.size_requested).max(0.0);
    }
    pub fn clear_content(&mut self) {
        self.content = None;
    }
    pub(crate) fn set_start(&mut self, start: SimTime) {
        self.start = start;
    }
    pub(crate) fn set_eta(&mut self, eta: SimTime) {
        self.eta = eta;
    }
    pub(crate) fn set_bandwidth(&mut self, bandwidth: Capacity) {
        self.bandwidth = bandwidth;
    }
    pub(crate) fn set_last_update(&mut self, now: SimTime) {
        self.last_update = now;
    }

    /// Accounts for what was moved at the current bandwidth since the last
    /// reconciliation. Discrete time may overshoot by one bandwidth-second,
    /// hence the clamp to the unit size.
    pub fn update_size_downloaded(&mut self, now: SimTime) {
        if now > self.last_update {
            self.size_downloaded += (now - self.last_update) as f64 * self.bandwidth;
        }
        let unit = self.unit_size();
        if self.size_downloaded > unit {
            self.size_downloaded = unit;
        }
        self.last_update = now;
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn user(node: usize) -> User {
        User::new(node.into(), 0)
    }

    #[test]
    fn it_starts_unresolved() {
        let flow = Flow::request(Content::new(7, 100.0), user(3), 42);
        assert_eq!(flow.source(), None);
        assert_eq!(flow.start(), INF_TIME);
        assert_eq!(flow.bandwidth(), 0.0);
        assert_eq!(flow.size_downloaded(), 0.0);
        assert_eq!(flow.size_requested(), 100.0);
        assert_eq!(flow.kind(), FlowKind::Request);
        assert!(!flow.is_virtual());
    }

    #[test]
    fn it_clamps_downloaded_size_to_unit() {
        let mut flow = Flow::request(Content::new(0, 100.0), user(1), 0)
            .with_source(user(0));
        flow.set_last_update(0);
        flow.set_bandwidth(30.0);
        flow.update_size_downloaded(3);
        assert_eq!(flow.size_downloaded(), 90.0);
        flow.update_size_downloaded(4);
        assert_eq!(flow.size_downloaded(), 100.0);
        assert_eq!(flow.last_update(), 4);
        // the clock never runs backwards for a flow
        flow.update_size_downloaded(2);
        assert_eq!(flow.size_downloaded(), 100.0);
    }

    #[test]
    fn it_sizes_the_last_chunk_by_remainder() {
        let content = Content::with_chunks(1, 250.0, 100.0);
        assert_eq!(content.chunk_count(), 3);
        assert_eq!(content.chunk(0), 100.0);
        assert_eq!(content.chunk(2), 50.0);
        assert_eq!(content.chunk(3), 0.0);
        let flow = Flow::new(Some(content), user(2), 0, 2, FlowKind::Transfer);
        assert_eq!(flow.unit_size(), 50.0);
    }

    #[test]
    fn it_clamps_requested_size() {
        let mut flow = Flow::request(Content::new(0, 100.0), user(1), 0);
        flow.set_size_requested(250.0);
        assert_eq!(flow.size_requested(), 100.0);
        flow.set_size_requested(40.0);
        flow.set_size_downloaded(41.0);
        assert_eq!(flow.size_downloaded(), 40.0);
    }

    #[test]
    fn it_orders_terminate_after_ties() {
        let transfer = Flow::request(Content::new(0, 1.0), user(1), 10);
        let terminate = Flow::control(FlowKind::Terminate, 10);
        let snapshot = Flow::control(FlowKind::Snapshot, 11);
        assert!(transfer.order_key() < terminate.order_key());
        assert!(terminate.order_key() < snapshot.order_key());
        assert_eq!(terminate.destination(), None);
        assert_eq!(terminate.unit_size(), 0.0);
    }

    #[test]
    #[should_panic]
    fn it_refuses_to_route_unresolved_flows() {
        let flow = Flow::request(Content::new(0, 1.0), user(1), 0);
        flow.route_ends();
    }
}
