use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, info, trace, warn};

use super::network::{EdgeIndex, Network, NodeIndex};
use super::snapshot::{EdgeSnapshot, NodeSnapshot, TopologySnapshot};
use super::stats::{NetworkStats, RoundStats};
use super::Path;
use crate::algorithm::Dijkstra;
use crate::component::{Flow, FlowId};
use crate::scheduler::Scheduler;
use crate::utils::config::Config;
use crate::{Capacity, SimTime, INF_TIME, UNLIMITED};

/// Negative spare capacity above this is floating-point noise
const SPARE_TOLERANCE: Capacity = 1e-6;


/// The network graph together with its routing tables and the bandwidth
/// sharing algorithm.
///
/// Bandwidth is never reserved statically: every admission and release runs a
/// localized max-min fair share around the bottleneck edge of the flow's
/// route, capped by `max_flow_speed`. All bandwidth and eta changes go through
/// `update_capacity` and `update_eta`, which keep the scheduler in order.
pub struct Topology {
    network: Network,
    routing: Dijkstra,
    central_server: NodeIndex,
    as_caches: BTreeMap<u32, NodeIndex>,
    as_customers: BTreeMap<u32, u32>,
    num_customers: u32,
    load_map: Vec<Capacity>,
    stats: NetworkStats,
    bitrate: Capacity,
    max_flow_speed: Capacity,
    min_flow_increase: Capacity,
}


impl Topology {
    pub fn new(network: Network, central_server: NodeIndex, config: &Config) -> Self {
        assert!(!network.is_access(central_server),
                "The central server must sit on a core vertex");
        let mut routing = Dijkstra::default();
        routing.compute(&network);
        let mut as_caches = BTreeMap::new();
        for &core in network.cores() {
            as_caches.entry(network.node(core).asid()).or_insert(core);
        }
        let mut as_customers = BTreeMap::new();
        for &pon in network.accesses() {
            let node = network.node(pon);
            *as_customers.entry(node.asid()).or_insert(0) += node.customers();
        }
        let num_customers = as_customers.values().sum();
        let load_map = vec![0.0; network.edge_count()];
        info!("Topology with {} vertices, {} edges, {} ASes and {} customers",
              network.node_count(), network.edge_count(), as_caches.len(), num_customers);
        Topology {
            network,
            routing,
            central_server,
            as_caches,
            as_customers,
            num_customers,
            load_map,
            stats: NetworkStats::new(),
            bitrate: config.bitrate,
            max_flow_speed: config.max_flow_speed,
            min_flow_increase: config.min_flow_increase.max(0.0),
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }
    pub fn bitrate(&self) -> Capacity {
        self.bitrate
    }
    pub fn max_flow_speed(&self) -> Capacity {
        self.max_flow_speed
    }
    pub fn min_flow_increase(&self) -> Capacity {
        self.min_flow_increase
    }
    pub fn central_server(&self) -> NodeIndex {
        self.central_server
    }
    pub fn asid(&self, node: NodeIndex) -> u32 {
        self.network.node(node).asid()
    }
    pub fn is_local(&self, source: NodeIndex, dest: NodeIndex) -> bool {
        self.asid(source) == self.asid(dest)
    }
    /// Vertex hosting the cache of the AS `node` belongs to
    pub fn local_cache(&self, node: NodeIndex) -> NodeIndex {
        let asid = self.asid(node);
        match self.as_caches.get(&asid) {
            Some(&cache) => cache,
            None => panic!("Failed to find a cache vertex for AS {}", asid),
        }
    }
    /// Cache vertices of every AS, by ascending AS id
    pub fn local_cache_nodes(&self) -> Vec<NodeIndex> {
        self.as_caches.values().cloned().collect()
    }
    pub fn num_ases(&self) -> usize {
        self.as_caches.len()
    }
    pub fn as_customers(&self, asid: u32) -> u32 {
        self.as_customers.get(&asid).cloned().unwrap_or(0)
    }
    pub fn num_customers(&self) -> u32 {
        self.num_customers
    }
    pub fn access_nodes(&self) -> &[NodeIndex] {
        self.network.accesses()
    }
    pub fn load(&self, edge: EdgeIndex) -> Capacity {
        self.load_map[edge.index()]
    }
    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    /// Access vertices route from the core vertex above them
    fn routing_root(&self, source: NodeIndex) -> NodeIndex {
        match self.network.uplink(source) {
            Some(uplink) => self.network.endpoints(uplink).1,
            None => source,
        }
    }

    /// Edges from `source` to `dest`, in forwarding order.
    pub fn route(&self, source: NodeIndex, dest: NodeIndex) -> Path {
        let root = self.routing_root(source);
        let mut visited = vec![];
        let mut current = dest;
        while current != root {
            visited.push(current);
            current = match self.routing.predecessor(root, current) {
                Some(pred) => pred,
                None => panic!("Failed to route from vertex {} to vertex {}",
                               source.index(), dest.index()),
            };
        }
        visited.push(root);
        if root != source {
            visited.push(source);
        }
        visited.iter().rev()
            .tuple_windows()
            .map(|(&u, &v)| match self.network.edge_between(u, v) {
                Some(edge) => edge,
                None => panic!("Failed to retrieve edge from vertex {} to vertex {}",
                               u.index(), v.index()),
            })
            .collect()
    }
    /// Hop count of `route`, or `None` when `dest` is unreachable
    pub fn distance(&self, source: NodeIndex, dest: NodeIndex) -> Option<usize> {
        let root = self.routing_root(source);
        let hops = self.routing.hops(root, dest)?;
        match root != source {
            true  => Some(hops + 1),
            false => Some(hops),
        }
    }

    /// Whether admitting one more flow at the reference bitrate would starve
    /// some edge of the route.
    pub fn is_congested(&self, source: NodeIndex, dest: NodeIndex) -> bool {
        self.is_congested_for(source, dest, self.bitrate)
    }
    pub fn is_congested_for(&self, source: NodeIndex, dest: NodeIndex,
                            bitrate: Capacity) -> bool {
        self.route(source, dest).into_iter()
            .map(|e| self.network.edge(e))
            .filter(|edge| !edge.is_unlimited())
            .any(|edge| edge.spare_capacity() < bitrate
                 && edge.fair_share(edge.active_flows().len() + 1) < bitrate)
    }

    /// Admits (`add`) or releases a flow on its route, reshaping the flows
    /// sharing its bottleneck edge.
    pub fn update_capacity(&mut self, id: FlowId, scheduler: &mut Scheduler, add: bool) {
        let (source, dest) = scheduler.flow(id).route_ends();
        let route = self.route(source, dest);
        if add {
            self.admit(id, &route, scheduler);
        } else {
            self.release(id, &route, scheduler);
        }
    }

    fn admit(&mut self, id: FlowId, route: &[EdgeIndex], scheduler: &mut Scheduler) {
        let now = scheduler.sim_time();
        let flow = scheduler.flow_mut(id);
        if flow.start() == INF_TIME {
            // admitted without going through a request
            flow.set_start(now);
            flow.set_last_update(now);
        }
        let mut min_spare = UNLIMITED;
        let mut min_cut = UNLIMITED;
        let mut bottleneck = None;
        for &e in route {
            let edge = self.network.edge_mut(e);
            edge.active_flows.insert(id);
            min_spare = min_spare.min(edge.spare_capacity);
            if !edge.is_unlimited() {
                let share = edge.fair_share(edge.active_flows.len());
                if share < min_cut {
                    min_cut = share;
                    bottleneck = Some(e);
                }
            }
        }
        if min_spare >= self.max_flow_speed {
            scheduler.flow_mut(id).set_bandwidth(self.max_flow_speed);
            self.update_route_capacity(route, -self.max_flow_speed);
            self.update_eta(id, scheduler);
            return;
        }
        let bottleneck = bottleneck
            .expect("Failed to find a finite edge on a capacity-bound route");
        if min_cut.floor() > 0.0 {
            min_cut = min_cut.floor();
        }
        assert!(min_cut > 0.0, "Flow #{} would be admitted with no bandwidth", id);
        scheduler.flow_mut(id).set_bandwidth(min_cut);
        self.update_route_capacity(route, -min_cut);
        self.update_eta(id, scheduler);

        let sharing: Vec<FlowId> = self.network.edge(bottleneck).active_flows.iter()
            .cloned()
            .filter(|&f| f != id)
            .collect();
        for f in sharing {
            let bandwidth = scheduler.flow(f).bandwidth();
            if bandwidth <= min_cut { continue; }
            let (source, dest) = scheduler.flow(f).route_ends();
            let f_route = self.route(source, dest);
            self.update_route_capacity(&f_route, bandwidth - min_cut);
            let flow = scheduler.flow_mut(f);
            flow.update_size_downloaded(now);
            flow.set_bandwidth(min_cut);
            self.update_eta(f, scheduler);
            debug!("Flow #{} shrinks from {} to {} for flow #{}", f, bandwidth, min_cut, id);
        }
        self.clamp_spare(bottleneck);
    }

    fn release(&mut self, id: FlowId, route: &[EdgeIndex], scheduler: &mut Scheduler) {
        let now = scheduler.sim_time();
        let bandwidth = scheduler.flow(id).bandwidth();
        let mut min_cut = UNLIMITED;
        let mut max_bneck_bw = UNLIMITED;
        let mut bottleneck = None;
        for &e in route {
            let edge = self.network.edge_mut(e);
            edge.active_flows.remove(&id);
            if edge.is_unlimited() { continue; }
            edge.spare_capacity += bandwidth;
            let active = edge.active_flows.len();
            if active > 0 {
                let in_use = edge.max_capacity - edge.spare_capacity;
                min_cut = min_cut.min(in_use / active as f64);
                let share = edge.fair_share(active);
                if share < max_bneck_bw {
                    max_bneck_bw = share;
                    bottleneck = Some(e);
                }
            }
        }
        if min_cut >= self.max_flow_speed {
            return;
        }
        let bottleneck = match bottleneck {
            Some(e) => e,
            None => return,
        };
        if max_bneck_bw.floor() > 0.0 {
            max_bneck_bw = max_bneck_bw.floor();
        }
        let target = max_bneck_bw.min(self.max_flow_speed);

        let sharing: Vec<FlowId> = self.network.edge(bottleneck).active_flows.iter()
            .cloned()
            .collect();
        for f in sharing {
            let increase = target - scheduler.flow(f).bandwidth();
            if increase <= self.min_flow_increase { continue; }
            let (source, dest) = scheduler.flow(f).route_ends();
            let f_route = self.route(source, dest);
            let safe_to_grow = f_route.iter()
                .all(|&e| self.network.edge(e).spare_capacity >= increase);
            if !safe_to_grow {
                trace!("Flow #{} cannot grow by {} after flow #{} left", f, increase, id);
                continue;
            }
            self.update_route_capacity(&f_route, -increase);
            let flow = scheduler.flow_mut(f);
            flow.update_size_downloaded(now);
            flow.set_bandwidth(target);
            self.update_eta(f, scheduler);
            debug!("Flow #{} grows to {} after flow #{} left", f, target, id);
        }
        self.clamp_spare(bottleneck);
    }

    /// Adds `to_add` to the spare capacity of every finite edge of `route`,
    /// recording peaks when capacity is consumed
    pub fn update_route_capacity(&mut self, route: &[EdgeIndex], to_add: Capacity) {
        for &e in route {
            let edge = self.network.edge_mut(e);
            if edge.is_unlimited() { continue; }
            edge.spare_capacity += to_add;
            if to_add < 0.0 {
                let used = (edge.max_capacity - edge.spare_capacity).min(edge.max_capacity);
                if used > edge.peak_capacity {
                    edge.peak_capacity = used;
                }
            }
        }
    }

    fn clamp_spare(&mut self, e: EdgeIndex) {
        let edge = self.network.edge_mut(e);
        if edge.spare_capacity < 0.0 {
            if edge.spare_capacity < -SPARE_TOLERANCE {
                warn!("Clamping negative spare capacity {} on edge {}-{}",
                      edge.spare_capacity, edge.ends.0.index(), edge.ends.1.index());
            }
            edge.spare_capacity = 0.0;
        }
    }

    /// Sets the flow to end when its unit is downloaded or when the viewer
    /// stops watching, whichever comes first.
    pub fn update_eta(&self, id: FlowId, scheduler: &mut Scheduler) {
        let now = scheduler.sim_time();
        let flow = scheduler.flow_mut(id);
        let old_eta = flow.eta();
        let view = (flow.size_requested() / self.bitrate).round() as SimTime;
        let view_eta = flow.start().saturating_add(view);
        let remaining = flow.unit_size() - flow.size_downloaded();
        let download = (remaining / flow.bandwidth()).ceil() as SimTime;
        let download_eta = now.saturating_add(download);
        let mut eta = view_eta.min(download_eta);
        if eta <= flow.start() {
            // at least one second of every flow is simulated
            eta = flow.start() + 1;
        }
        if eta < now {
            panic!("Flow #{} would complete at {} before the current time {}", id, eta, now);
        }
        flow.set_eta(eta);
        scheduler.update_schedule(id, old_eta);
    }

    /// Accounts the data moved by a completed flow on every edge of its route
    pub fn update_load_map(&mut self, flow: &Flow) {
        let (source, dest) = flow.route_ends();
        let size = flow.size_downloaded();
        for e in self.route(source, dest) {
            self.load_map[e.index()] += size;
        }
    }
    /// Zeroes the load accumulators and restarts peak tracking from the
    /// bandwidth currently in use
    pub fn reset_load_map(&mut self) {
        for load in self.load_map.iter_mut() {
            *load = 0.0;
        }
        for edge in self.network.edges_mut() {
            edge.peak_capacity = match edge.is_unlimited() {
                true  => 0.0,
                false => (edge.max_capacity - edge.spare_capacity).max(0.0),
            };
        }
    }
    /// Frees every edge, forgetting all active flows
    pub fn reset_flows(&mut self) {
        for edge in self.network.edges_mut() {
            edge.spare_capacity = edge.max_capacity;
            edge.active_flows.clear();
        }
    }

    /// Aggregates the load of the round, stores it in the history and logs it
    pub fn print_network_stats(&mut self, round: u32, round_duration: SimTime) -> &RoundStats {
        let stats = RoundStats::compute(&self.network, &self.load_map, round, round_duration);
        for line in stats.to_string().lines() {
            info!("{}", line);
        }
        self.stats.record(stats);
        self.stats.get(round)
            .expect("Failed to retrieve the statistics just recorded")
    }

    pub fn snapshot(&self, time: SimTime, round: u32) -> TopologySnapshot {
        let finite = |c: Capacity| if c.is_finite() { Some(c) } else { None };
        let nodes = (0..self.network.node_count())
            .map(NodeIndex::from)
            .map(|ix| {
                let node = self.network.node(ix);
                NodeSnapshot {
                    id: ix.index(),
                    asid: node.asid(),
                    access: self.network.is_access(ix),
                    customers: node.customers(),
                }
            })
            .collect();
        let edges = self.network.edges()
            .map(|(ix, edge)| EdgeSnapshot {
                source: edge.ends.0.index(),
                target: edge.ends.1.index(),
                length: edge.length,
                max_capacity: finite(edge.max_capacity),
                spare_capacity: finite(edge.spare_capacity),
                peak_capacity: edge.peak_capacity,
                active_flows: edge.active_flows.len(),
                total_load: self.load_map[ix.index()],
            })
            .collect();
        TopologySnapshot {
            round,
            time,
            central_server: self.central_server.index(),
            nodes,
            edges,
        }
    }
}
