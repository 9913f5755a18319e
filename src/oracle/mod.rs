mod nearest;
mod origin;
mod stats;

use enum_dispatch::enum_dispatch;
use log::{debug, error, info, trace};

use crate::component::{Flow, FlowId, FlowKind, User};
use crate::network::{NodeIndex, Topology};
use crate::scheduler::Scheduler;
use crate::utils::config::Config;
use crate::utils::yaml;
use crate::utils::Error;
use crate::SimTime;

pub use nearest::NearestOracle;
pub use origin::OriginOracle;
pub use stats::{FlowStats, RoundFlowStats};


#[enum_dispatch]
pub enum OracleEnum {
    OriginOracle,
    NearestOracle,
}

/// Source selection and bookkeeping, called back by the scheduler.
#[enum_dispatch(OracleEnum)]
pub trait Oracle {
    /// Picks a source for the REQUEST `id` and admits the resulting transfer.
    /// Returns false if the request is blocked.
    fn serve_request(&mut self, id: FlowId, scheduler: &mut Scheduler,
                     topology: &mut Topology) -> bool;
    fn notify_completed_flow(&mut self, id: FlowId, scheduler: &mut Scheduler,
                             topology: &mut Topology);
    fn take_snapshot(&mut self, time: SimTime, round: u32, topology: &Topology);
    /// Whether the content of a flow carried past the end of `round` is gone
    fn is_expired(&self, _flow: &Flow, _round: u32) -> bool {
        false
    }
}


impl OracleEnum {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        match config.oracle.as_str() {
            "origin"  => Ok(OriginOracle::new(config).into()),
            "nearest" => Ok(NearestOracle::new(config).into()),
            other     => Err(Error::UnknownOracle(other.to_string())),
        }
    }
    pub fn flow_stats(&self) -> &FlowStats {
        match self {
            OracleEnum::OriginOracle(oracle) => oracle.flow_stats(),
            OracleEnum::NearestOracle(oracle) => oracle.flow_stats(),
        }
    }
    /// Logs the flow figures of `round`
    pub fn print_flow_stats(&self, round: u32) {
        match self.flow_stats().get(round) {
            Some(stats) => {
                for line in stats.to_string().lines() {
                    info!("{}", line);
                }
            },
            None => info!("No request was handled in round {}", round),
        }
    }
}


fn destination_of(scheduler: &Scheduler, id: FlowId) -> NodeIndex {
    match scheduler.flow(id).destination() {
        Some(user) => user.node,
        None => panic!("Failed to serve request #{} without a destination", id),
    }
}

/// Whether a flow from `source` would fit on the route to `dest`
fn is_viable(topology: &Topology, source: NodeIndex, dest: NodeIndex) -> bool {
    if topology.distance(source, dest).is_none() {
        debug!("Vertex {} cannot reach vertex {}", source.index(), dest.index());
        return false;
    }
    !topology.is_congested(source, dest)
}

/// Content released in `release_round` is gone once `lifetime` rounds passed
fn is_outdated(flow: &Flow, round: u32, lifetime: Option<u32>) -> bool {
    match (flow.content(), lifetime) {
        (Some(content), Some(lifetime)) =>
            round.saturating_add(1) >= content.release_round.saturating_add(lifetime),
        _ => false,
    }
}

/// Settles the request `id` from `source`: a transfer unless the content is
/// already at the destination
fn serve_from(stats: &mut FlowStats, id: FlowId, source: NodeIndex, dest: NodeIndex,
              scheduler: &mut Scheduler, topology: &mut Topology) {
    let round = scheduler.current_round();
    if source == dest {
        let now = scheduler.sim_time();
        let flow = scheduler.flow_mut(id);
        if let Some(user) = flow.destination() {
            flow.set_source(user);
        }
        flow.set_eta(now);
        trace!("{}: request #{} is served by its own vertex {}", now, id, dest.index());
        stats.record_virtual(round);
        return;
    }
    stats.record_served(round, topology.is_local(source, dest));
    start_transfer(id, source, scheduler, topology);
}

/// Turns the request `id` into a transfer from the cache at `source` and
/// admits it on the network
fn start_transfer(id: FlowId, source: NodeIndex, scheduler: &mut Scheduler,
                  topology: &mut Topology) {
    let flow = scheduler.flow_mut(id);
    flow.set_source(User::from(source));
    flow.set_kind(FlowKind::Transfer);
    flow.set_peer_flow(false);
    trace!("{}: serving request #{} from vertex {}",
           scheduler.sim_time(), id, source.index());
    scheduler.enqueue(id);
    topology.update_capacity(id, scheduler, true);
}

/// Settles the downloaded amount of a finished transfer, accounts it and
/// releases its bandwidth
fn complete_transfer(stats: &mut FlowStats, id: FlowId, scheduler: &mut Scheduler,
                     topology: &mut Topology) {
    let now = scheduler.sim_time();
    let round = scheduler.current_round();
    let flow = scheduler.flow_mut(id);
    flow.update_size_downloaded(now);
    let shortfall = flow.size_requested() - flow.size_downloaded();
    if shortfall > 0.0 {
        if shortfall <= flow.bandwidth() {
            // rounding of the eta to whole seconds
            let requested = flow.size_requested();
            flow.set_size_downloaded(requested);
        } else {
            trace!("Flow #{} ends {:.2} Mb short, the viewer left first", id, shortfall);
        }
    }

    let flow = scheduler.flow(id);
    let source = flow.source()
        .map(|user| user.node)
        .unwrap_or_else(|| panic!("Failed to complete flow #{} without a source", id));
    stats.record_completed(round, now - flow.start(), flow.is_peer_flow(),
                           source == topology.central_server());
    topology.update_load_map(flow);
    topology.update_capacity(id, scheduler, false);
}

fn dump_snapshot(dir: Option<&str>, time: SimTime, round: u32, topology: &Topology) {
    let snapshot = topology.snapshot(time, round);
    match dir {
        Some(dir) => match yaml::write_snapshot(dir, &snapshot) {
            Ok(path) => debug!("Saved snapshot to {}", path.display()),
            Err(e) => error!("Failed to save snapshot of round {} at {}: {}", round, time, e),
        },
        None => info!("Snapshot of round {} at {}: {} active flows on {} edges",
                      round, time, snapshot.active_flows(), snapshot.edges.len()),
    }
}
