use std::fmt;

use serde::Serialize;

use crate::SimTime;


/// Outcome of the requests handled during one round
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RoundFlowStats {
    pub round: u32,
    pub served: u32,
    pub completed: u32,
    pub local: u32,
    pub from_as_cache: u32,
    pub from_central_server: u32,
    pub congestion_blocked: u32,
    /// seconds, over every completed flow
    pub avg_duration: f64,
    /// seconds, over flows served by a cache or the central server
    pub avg_cache_duration: f64,
}

#[derive(Clone, Debug, Default)]
pub struct FlowStats {
    rounds: Vec<RoundFlowStats>,
}


fn running_average(avg: f64, sample: f64, count: u32) -> f64 {
    avg + (sample - avg) / count as f64
}

impl RoundFlowStats {
    fn new(round: u32) -> Self {
        RoundFlowStats { round, ..Default::default() }
    }
    pub fn cache_flows(&self) -> u32 {
        self.from_as_cache + self.from_central_server
    }
}

impl fmt::Display for RoundFlowStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Served requests: {} ({} local), completed: {}, blocked by congestion: {}",
                 self.served, self.local, self.completed, self.congestion_blocked)?;
        writeln!(f, "Completed from AS caches: {}, from the central server: {}",
                 self.from_as_cache, self.from_central_server)?;
        writeln!(f, "Average flow duration: {:.2} s (cache flows: {:.2} s)",
                 self.avg_duration, self.avg_cache_duration)
    }
}

impl FlowStats {
    pub fn new() -> Self {
        FlowStats { rounds: vec![] }
    }
    fn round_mut(&mut self, round: u32) -> &mut RoundFlowStats {
        while self.rounds.len() <= round as usize {
            let next = self.rounds.len() as u32;
            self.rounds.push(RoundFlowStats::new(next));
        }
        &mut self.rounds[round as usize]
    }
    pub fn record_served(&mut self, round: u32, local: bool) {
        let stats = self.round_mut(round);
        stats.served += 1;
        if local {
            stats.local += 1;
        }
    }
    /// Accounts a request whose destination already held the content
    pub fn record_virtual(&mut self, round: u32) {
        let stats = self.round_mut(round);
        stats.served += 1;
        stats.completed += 1;
        stats.local += 1;
    }
    pub fn record_blocked(&mut self, round: u32) {
        self.round_mut(round).congestion_blocked += 1;
    }
    /// Accounts a completed flow of `duration` seconds. Peer flows count
    /// towards the overall duration only.
    pub fn record_completed(&mut self, round: u32, duration: SimTime,
                            peer_flow: bool, from_central_server: bool) {
        let stats = self.round_mut(round);
        let duration = duration as f64;
        stats.completed += 1;
        stats.avg_duration = running_average(stats.avg_duration, duration, stats.completed);
        if peer_flow {
            return;
        }
        if from_central_server {
            stats.from_central_server += 1;
        } else {
            stats.from_as_cache += 1;
        }
        stats.avg_cache_duration = running_average(
            stats.avg_cache_duration, duration, stats.cache_flows());
    }
    pub fn get(&self, round: u32) -> Option<&RoundFlowStats> {
        self.rounds.get(round as usize)
    }
    pub fn iter(&self) -> impl Iterator<Item=&RoundFlowStats> {
        self.rounds.iter()
    }
    pub fn len(&self) -> usize {
        self.rounds.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}
