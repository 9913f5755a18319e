use itertools::Itertools;
use log::debug;

use super::{complete_transfer, destination_of, dump_snapshot, is_outdated, is_viable, serve_from};
use super::{FlowStats, Oracle};
use crate::component::{Flow, FlowId};
use crate::network::{NodeIndex, Topology};
use crate::scheduler::Scheduler;
use crate::utils::config::Config;
use crate::SimTime;


/// Serves every request from the closest AS cache with room on its route,
/// assuming each of them holds a replica of the whole catalog. The central
/// server is the last resort.
pub struct NearestOracle {
    stats: FlowStats,
    snapshot_dir: Option<String>,
    content_lifetime: Option<u32>,
}

impl NearestOracle {
    pub fn new(config: &Config) -> Self {
        NearestOracle {
            stats: FlowStats::new(),
            snapshot_dir: config.snapshot_dir.clone(),
            content_lifetime: config.content_lifetime,
        }
    }
    pub fn flow_stats(&self) -> &FlowStats {
        &self.stats
    }
    /// Sources worth trying for `dest`, in order of preference
    fn candidates(&self, topology: &Topology, dest: NodeIndex) -> Vec<NodeIndex> {
        let local = topology.local_cache(dest);
        let server = topology.central_server();
        let remote = topology.local_cache_nodes().into_iter()
            .filter(|&cache| cache != local && cache != server)
            .filter_map(|cache| topology.distance(cache, dest).map(|d| (d, cache)))
            .sorted_by_key(|&(distance, _)| distance)
            .map(|(_, cache)| cache);
        let mut candidates = vec![local];
        candidates.extend(remote);
        if local != server {
            candidates.push(server);
        }
        candidates
    }
}

impl Oracle for NearestOracle {
    fn serve_request(&mut self, id: FlowId, scheduler: &mut Scheduler,
                     topology: &mut Topology) -> bool {
        let round = scheduler.current_round();
        let dest = destination_of(scheduler, id);
        let source = self.candidates(topology, dest).into_iter()
            .find(|&cache| is_viable(topology, cache, dest));
        match source {
            Some(source) => {
                serve_from(&mut self.stats, id, source, dest, scheduler, topology);
                true
            },
            None => {
                debug!("{}: no cache can serve request #{} to vertex {}",
                       scheduler.sim_time(), id, dest.index());
                self.stats.record_blocked(round);
                false
            },
        }
    }
    fn notify_completed_flow(&mut self, id: FlowId, scheduler: &mut Scheduler,
                             topology: &mut Topology) {
        complete_transfer(&mut self.stats, id, scheduler, topology);
    }
    fn take_snapshot(&mut self, time: SimTime, round: u32, topology: &Topology) {
        dump_snapshot(self.snapshot_dir.as_deref(), time, round, topology);
    }
    fn is_expired(&self, flow: &Flow, round: u32) -> bool {
        is_outdated(flow, round, self.content_lifetime)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Content, Flow, User};
    use crate::network::Network;

    /// v0 (AS 0, server) - v3 (AS 2) - v2 (AS 1) - v1 (AS 1), with the
    /// customers below v2 and a thin link from their local cache v1
    fn setup() -> (Topology, NodeIndex) {
        let mut network = Network::new();
        let v0 = network.add_core(0);
        let v1 = network.add_core(1);
        let v2 = network.add_core(1);
        let v3 = network.add_core(2);
        network.add_link((v1, v2), 8.0, 8.0, 1.0);
        network.add_link((v3, v2), 100.0, 100.0, 1.0);
        network.add_link((v0, v3), 100.0, 100.0, 1.0);
        let pon = network.add_access(v2, 10, -1.0, -1.0);
        (Topology::new(network, v0, &Config::default()), pon)
    }

    fn request(pon: NodeIndex, at: SimTime) -> Flow {
        Flow::request(Content::new(0, 400.0), User::new(pon, 0), at)
    }

    #[test]
    fn it_orders_caches_by_distance() {
        let (topology, pon) = setup();
        let oracle = NearestOracle::new(&Config::default());
        let order: Vec<usize> = oracle.candidates(&topology, pon).into_iter()
            .map(|node| node.index())
            .collect();
        assert_eq!(order, vec![1, 3, 0]);
    }

    #[test]
    fn it_falls_back_to_remote_caches() {
        let (mut topology, pon) = setup();
        let mut scheduler = Scheduler::new(100, 0);
        let mut oracle = NearestOracle::new(&Config::default());
        let local = scheduler.schedule(request(pon, 10));
        let remote = scheduler.schedule(request(pon, 20));
        assert!(scheduler.advance_clock(&mut oracle, &mut topology));
        assert_eq!(scheduler.flow(local).source(), Some(User::new(1.into(), 0)));
        assert!(scheduler.advance_clock(&mut oracle, &mut topology));
        assert_eq!(scheduler.flow(remote).source(), Some(User::new(3.into(), 0)));
        assert_eq!(scheduler.flow(remote).bandwidth(), 100.0);

        while scheduler.advance_clock(&mut oracle, &mut topology) {}
        let stats = oracle.flow_stats().get(0).expect("missing round");
        assert_eq!((stats.served, stats.local, stats.completed), (2, 1, 2));
        assert_eq!((stats.from_as_cache, stats.from_central_server), (2, 0));
        assert_eq!(stats.avg_duration, 27.0);
    }

    #[test]
    fn it_serves_caches_without_a_transfer() {
        let (mut topology, _) = setup();
        let mut scheduler = Scheduler::new(100, 0);
        let mut oracle = NearestOracle::new(&Config::default());
        // v1 is the cache of its own AS
        let id = scheduler.schedule(request(1.into(), 10));
        while scheduler.advance_clock(&mut oracle, &mut topology) {}
        assert!(!scheduler.flows().contains(id));
        let stats = oracle.flow_stats().get(0).expect("missing round");
        assert_eq!((stats.served, stats.completed, stats.local), (1, 1, 1));
        assert_eq!(stats.cache_flows(), 0);
        for (_, edge) in topology.network().edges() {
            assert!(edge.active_flows().is_empty());
            assert_eq!(edge.peak_capacity(), 0.0);
        }
    }
}
