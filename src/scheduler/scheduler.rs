use log::{debug, info, trace, warn};

use super::base::EventQueue;
use crate::component::{Flow, FlowArena, FlowId, FlowKind};
use crate::network::Topology;
use crate::oracle::Oracle;
use crate::utils::config::Config;
use crate::{SimTime, INF_TIME};


/// Owner of the simulated clock, the live flows and the round lifecycle.
pub struct Scheduler {
    flows: FlowArena,
    queue: EventQueue,
    sim_time: SimTime,
    current_round: u32,
    round_duration: SimTime,
    snapshot_period: SimTime,
}


impl Scheduler {
    /// A scheduler at time 0 of round 0, with its TERMINATE (and SNAPSHOT)
    /// events already queued
    pub fn new(round_duration: SimTime, snapshot_period: SimTime) -> Self {
        debug_assert!(round_duration > 0);
        let mut scheduler = Scheduler {
            flows: FlowArena::new(),
            queue: EventQueue::new(),
            sim_time: 0,
            current_round: 0,
            round_duration,
            snapshot_period: snapshot_period.max(0),
        };
        scheduler.schedule_controls();
        scheduler
    }
    pub fn from_config(config: &Config) -> Self {
        Scheduler::new(config.round_duration, config.snapshot_period)
    }
    pub fn sim_time(&self) -> SimTime {
        self.sim_time
    }
    pub fn current_round(&self) -> u32 {
        self.current_round
    }
    pub fn round_duration(&self) -> SimTime {
        self.round_duration
    }
    pub fn snapshot_period(&self) -> SimTime {
        self.snapshot_period
    }
    pub fn flows(&self) -> &FlowArena {
        &self.flows
    }
    pub fn flow(&self, id: FlowId) -> &Flow {
        self.flows.flow(id)
    }
    pub fn flow_mut(&mut self, id: FlowId) -> &mut Flow {
        self.flows.flow_mut(id)
    }
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
    pub fn is_scheduled(&self, id: FlowId) -> bool {
        self.queue.contains(id)
    }

    /// Hands a new flow over to the scheduler and queues it
    pub fn schedule(&mut self, flow: Flow) -> FlowId {
        let id = self.flows.insert(flow);
        self.enqueue(id);
        id
    }
    /// Queues a flow the scheduler already owns, e.g. a request turned into
    /// a transfer by the oracle
    pub fn enqueue(&mut self, id: FlowId) {
        let (eta, terminate) = self.flows.flow(id).order_key();
        if !self.queue.push(id, eta, terminate) {
            panic!("Failed to record the event handle of flow #{}, it is already scheduled", id);
        }
    }
    /// Drops a flow from both the queue and the arena
    pub fn remove(&mut self, id: FlowId) -> Option<Flow> {
        self.queue.remove(id);
        self.flows.remove(id)
    }

    /// Processes the next event. Returns false once the round is over.
    pub fn advance_clock<O: Oracle>(&mut self, oracle: &mut O, topology: &mut Topology) -> bool {
        let (id, eta) = match self.queue.peek() {
            Some(next) => next,
            None => {
                warn!("Empty event queue before reaching the termination event");
                return false;
            },
        };
        if eta < self.sim_time {
            panic!("Event scheduled in the past: flow #{} is due at {} but the time is {}",
                   id, eta, self.sim_time);
        } else if eta > self.sim_time {
            trace!("Current simulation time: {}/{}", eta, self.round_duration);
            self.sim_time = eta;
        }
        self.queue.pop();

        let kind = self.flows.flow(id).kind();
        match kind {
            FlowKind::Terminate => {
                self.flows.remove(id);
                info!("Round {} intercepted termination event", self.current_round);
                false
            },
            FlowKind::Snapshot => {
                self.flows.remove(id);
                oracle.take_snapshot(self.sim_time, self.current_round, topology);
                let next = self.sim_time + self.snapshot_period;
                if next <= self.round_duration {
                    self.schedule(Flow::control(FlowKind::Snapshot, next));
                }
                true
            },
            FlowKind::Request => {
                let now = self.sim_time;
                let flow = self.flows.flow_mut(id);
                flow.set_start(now);
                flow.set_eta(INF_TIME);
                flow.set_last_update(now);
                let success = oracle.serve_request(id, self, topology);
                let flow = self.flows.flow(id);
                if flow.is_virtual() {
                    trace!("Request #{} is virtual, content is already at the destination", id);
                    self.remove(id);
                } else if !success {
                    self.remove(id);
                }
                true
            },
            FlowKind::Transfer | FlowKind::Watch => {
                oracle.notify_completed_flow(id, self, topology);
                self.flows.remove(id);
                true
            },
        }
    }

    /// Moves a queued flow after its eta was changed in place
    pub fn update_schedule(&mut self, id: FlowId, old_eta: SimTime) {
        let (eta, terminate) = self.flows.flow(id).order_key();
        if !self.queue.contains(id) {
            panic!("Failed to find the event handle of flow #{}", id);
        }
        if eta != old_eta {
            self.queue.reorder(id, eta, terminate);
        }
    }

    /// Carries every pending flow over to the next round.
    ///
    /// WATCH flows and stale control events are dropped. The others are
    /// reconciled up to the round boundary and shifted back by one round.
    /// Transfers whose content expired (as told by the oracle) release their
    /// bandwidth without completing; other expired flows are dropped.
    pub fn start_new_round<O: Oracle>(&mut self, oracle: &O, topology: &mut Topology) {
        let rd = self.round_duration;
        let mut survivors = vec![];
        let mut expired = vec![];
        for id in self.queue.drain() {
            match self.flows.flow(id).kind() {
                FlowKind::Watch => {
                    trace!("Dropping watch flow #{} at the end of round {}", id, self.current_round);
                    self.flows.remove(id);
                    continue;
                },
                FlowKind::Terminate | FlowKind::Snapshot => {
                    self.flows.remove(id);
                    continue;
                },
                FlowKind::Request | FlowKind::Transfer => (),
            }
            let flow = self.flows.flow_mut(id);
            flow.update_size_downloaded(rd);
            flow.set_last_update(0);
            if flow.start() != INF_TIME {
                flow.set_start(flow.start() - rd);
            }
            if flow.eta() < rd {
                panic!("Unresolved flow #{} has eta {} before the end of round {}",
                       id, flow.eta(), self.current_round);
            }
            if flow.eta() != INF_TIME {
                flow.set_eta(flow.eta() - rd);
            }
            if !oracle.is_expired(flow, self.current_round) {
                survivors.push(id);
            } else if flow.kind() == FlowKind::Transfer {
                expired.push(id);
            } else {
                debug!("Dropping request #{} for expired content", id);
                self.flows.remove(id);
            }
        }
        self.sim_time = 0;
        self.current_round += 1;
        for &id in survivors.iter().chain(expired.iter()) {
            self.enqueue(id);
        }
        for id in expired {
            info!("Carried over flow #{} with expired content will not be completed", id);
            topology.update_capacity(id, self, false);
            self.flows.flow_mut(id).clear_content();
            self.remove(id);
        }
        self.schedule_controls();
        info!("Round {} starts with {} carried over flows", self.current_round, survivors.len());
    }

    fn schedule_controls(&mut self) {
        self.schedule(Flow::control(FlowKind::Terminate, self.round_duration + 1));
        let period = self.snapshot_period;
        if period > 0 && period <= self.round_duration {
            self.schedule(Flow::control(FlowKind::Snapshot, period));
        }
    }
}
