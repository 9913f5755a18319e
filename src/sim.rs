use std::time::Instant;

use log::{info, warn};

use crate::oracle::OracleEnum;
use crate::network::Topology;
use crate::scheduler::Scheduler;
use crate::utils::config::Config;
use crate::utils::workload::{Request, Workload};
use crate::utils::Error;


pub struct Simulation {
    pub oracle: OracleEnum,
    pub scheduler: Scheduler,
    pub topology: Topology,
    pub workload: Workload,
    pub config: Config,
}


impl Simulation {
    pub fn new(topology: Topology, config: Config) -> Result<Self, Error> {
        config.validate()?;
        let oracle = OracleEnum::from_config(&config)?;
        let scheduler = Scheduler::from_config(&config);
        let workload = Workload::default();
        Ok(Simulation { oracle, scheduler, topology, workload, config })
    }
    pub fn set_workload(&mut self, workload: Workload) {
        self.workload = workload;
    }
    pub fn add_requests(&mut self, round: u32, requests: Vec<Request>) {
        self.workload.extend(round, requests);
    }

    /// Simulates the current round and rolls over to the next one.
    /// Returns the computing time in microseconds.
    pub fn run_round(&mut self) -> u128 {
        let start = Instant::now();
        let round = self.scheduler.current_round();
        let round_duration = self.scheduler.round_duration();

        let mut scheduled = 0;
        for request in self.workload.for_round(round) {
            if request.at < 0 || request.at > round_duration {
                warn!("Skipping request for content {} at {}, outside of round {}",
                      request.content.id, request.at, round);
                continue;
            }
            self.scheduler.schedule(request.to_flow());
            scheduled += 1;
        }
        info!("Round {} begins with {} new requests", round, scheduled);

        while self.scheduler.advance_clock(&mut self.oracle, &mut self.topology) {}

        self.topology.print_network_stats(round, round_duration);
        self.oracle.print_flow_stats(round);
        self.scheduler.start_new_round(&self.oracle, &mut self.topology);
        self.topology.reset_load_map();

        start.elapsed().as_micros()
    }
    pub fn run(&mut self) -> u128 {
        let mut elapsed = 0;
        for _ in 0..self.config.rounds {
            elapsed += self.run_round();
        }
        elapsed
    }
}
