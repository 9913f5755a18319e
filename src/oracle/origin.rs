use log::debug;

use super::{complete_transfer, destination_of, dump_snapshot, is_outdated, is_viable, serve_from};
use super::{FlowStats, Oracle};
use crate::component::{Flow, FlowId};
use crate::network::Topology;
use crate::scheduler::Scheduler;
use crate::utils::config::Config;
use crate::SimTime;


/// Serves every request from the central server
pub struct OriginOracle {
    stats: FlowStats,
    snapshot_dir: Option<String>,
    content_lifetime: Option<u32>,
}

impl OriginOracle {
    pub fn new(config: &Config) -> Self {
        OriginOracle {
            stats: FlowStats::new(),
            snapshot_dir: config.snapshot_dir.clone(),
            content_lifetime: config.content_lifetime,
        }
    }
    pub fn flow_stats(&self) -> &FlowStats {
        &self.stats
    }
}

impl Oracle for OriginOracle {
    fn serve_request(&mut self, id: FlowId, scheduler: &mut Scheduler,
                     topology: &mut Topology) -> bool {
        let round = scheduler.current_round();
        let dest = destination_of(scheduler, id);
        let server = topology.central_server();
        if !is_viable(topology, server, dest) {
            debug!("{}: request #{} to vertex {} blocked by congestion",
                   scheduler.sim_time(), id, dest.index());
            self.stats.record_blocked(round);
            return false;
        }
        serve_from(&mut self.stats, id, server, dest, scheduler, topology);
        true
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
    use crate::component::{Content, Flow, FlowKind, User};
    use crate::network::{Network, NodeIndex};

    fn setup(capacity: f64) -> (Topology, NodeIndex) {
        let mut network = Network::new();
        let v0 = network.add_core(0);
        let v1 = network.add_core(1);
        network.add_link((v0, v1), capacity, capacity, 1.0);
        let pon = network.add_access(v1, 10, -1.0, -1.0);
        (Topology::new(network, v0, &Config::default()), pon)
    }

    fn request(pon: NodeIndex, at: SimTime) -> Flow {
        Flow::request(Content::new(0, 400.0), User::new(pon, 3), at)
    }

    #[test]
    fn it_serves_from_the_central_server() {
        let (mut topology, pon) = setup(8.0);
        let mut scheduler = Scheduler::new(100, 0);
        let mut oracle = OriginOracle::new(&Config::default());
        let id = scheduler.schedule(request(pon, 10));
        assert!(scheduler.advance_clock(&mut oracle, &mut topology));
        let flow = scheduler.flow(id);
        assert_eq!(flow.kind(), FlowKind::Transfer);
        assert_eq!(flow.source(), Some(User::new(0.into(), 0)));
        assert_eq!(flow.bandwidth(), 8.0);
        // 400 Mb at 8 Mbps, well before the viewer is done at 5 Mbps
        assert_eq!(flow.eta(), 60);

        while scheduler.advance_clock(&mut oracle, &mut topology) {}
        let stats = oracle.flow_stats().get(0).expect("missing round");
        assert_eq!((stats.served, stats.completed, stats.local), (1, 1, 0));
        assert_eq!(stats.from_central_server, 1);
        assert_eq!(stats.avg_duration, 50.0);
        let core = topology.network().edge_between(0.into(), 1.into())
            .expect("missing core link");
        assert_eq!(topology.load(core), 400.0);
        assert_eq!(topology.network().edge(core).spare_capacity(), 8.0);
    }

    #[test]
    fn it_blocks_requests_on_congested_routes() {
        let (mut topology, pon) = setup(8.0);
        let mut scheduler = Scheduler::new(100, 0);
        let mut oracle = OriginOracle::new(&Config::default());
        scheduler.schedule(request(pon, 10));
        let blocked = scheduler.schedule(request(pon, 20));
        assert!(scheduler.advance_clock(&mut oracle, &mut topology));
        assert!(scheduler.advance_clock(&mut oracle, &mut topology));
        assert!(!scheduler.flows().contains(blocked));
        let stats = oracle.flow_stats().get(0).expect("missing round");
        assert_eq!((stats.served, stats.congestion_blocked), (1, 1));
    }

    #[test]
    fn it_expires_content_after_its_lifetime() {
        let config = Config { content_lifetime: Some(2), ..Config::default() };
        let oracle = OriginOracle::new(&config);
        let mut content = Content::new(0, 400.0);
        content.release_round = 1;
        let flow = Flow::request(content, User::new(2.into(), 0), 10);
        assert!(!oracle.is_expired(&flow, 0));
        assert!(!oracle.is_expired(&flow, 1));
        assert!(oracle.is_expired(&flow, 2));
        let forever = OriginOracle::new(&Config::default());
        assert!(!forever.is_expired(&flow, 100));
    }

    #[test]
    fn it_releases_expired_transfers_at_rollover() {
        let (mut topology, pon) = setup(1.0);
        let mut scheduler = Scheduler::new(100, 0);
        let config = Config { content_lifetime: Some(1), ..Config::default() };
        let mut oracle = OriginOracle::new(&config);
        scheduler.schedule(request(pon, 50));
        while scheduler.advance_clock(&mut oracle, &mut topology) {}
        let core = topology.network().edge_between(0.into(), 1.into())
            .expect("missing core link");
        assert_eq!(topology.network().edge(core).active_flows().len(), 1);

        scheduler.start_new_round(&oracle, &mut topology);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(topology.network().edge(core).spare_capacity(), 1.0);
        assert!(topology.network().edge(core).active_flows().is_empty());
        let stats = oracle.flow_stats().get(0).expect("missing round");
        assert_eq!((stats.served, stats.completed), (1, 0));
    }
}
