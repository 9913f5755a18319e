use std::fmt;

use serde::Serialize;

use super::network::{EdgeClass, Network};
use crate::{Capacity, SimTime};


/// Load and peak figures for one class of edges
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ClassStats {
    pub edges: usize,
    pub avg_load: Capacity,
    pub avg_peak: Capacity,
    pub max_peak: Capacity,
    pub max_peak_edge: Option<(usize, usize)>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RoundStats {
    pub round: u32,
    pub avg_load: Capacity,
    pub max_load: Capacity,
    pub max_load_edge: Option<(usize, usize)>,
    pub core: ClassStats,
    pub upstream: ClassStats,
    pub downstream: ClassStats,
}

/// Per-round history of `RoundStats`
#[derive(Clone, Debug, Default)]
pub struct NetworkStats {
    rounds: Vec<RoundStats>,
}


impl ClassStats {
    fn add(&mut self, load: Capacity, peak: Capacity, ends: (usize, usize)) {
        self.avg_load += load;
        self.avg_peak += peak;
        if peak > self.max_peak {
            self.max_peak = peak;
            self.max_peak_edge = Some(ends);
        }
    }
    fn average(&mut self) {
        if self.edges > 0 {
            self.avg_load /= self.edges as f64;
            self.avg_peak /= self.edges as f64;
        } else {
            self.avg_load = 0.0;
            self.avg_peak = 0.0;
        }
    }
}

impl RoundStats {
    /// Aggregates the data carried by every edge over a round of
    /// `round_duration` seconds, together with the peak bandwidth in use.
    pub fn compute(network: &Network, loads: &[Capacity], round: u32,
                   round_duration: SimTime) -> Self {
        debug_assert_eq!(loads.len(), network.edge_count());
        let mut stats = RoundStats { round, ..Default::default() };
        let duration = round_duration.max(1) as f64;
        for (ix, edge) in network.edges() {
            let load = loads[ix.index()] / duration;
            let peak = edge.peak_capacity();
            let (src, dst) = edge.ends();
            let ends = (src.index(), dst.index());
            let class = match network.edge_class(ix) {
                EdgeClass::Core => &mut stats.core,
                EdgeClass::Upstream => &mut stats.upstream,
                EdgeClass::Downstream => &mut stats.downstream,
            };
            class.edges += 1;
            class.add(load, peak, ends);
            stats.avg_load += load;
            if load > stats.max_load {
                stats.max_load = load;
                stats.max_load_edge = Some(ends);
            }
        }
        let total = network.edge_count();
        stats.avg_load = match total {
            0 => 0.0,
            n => stats.avg_load / n as f64,
        };
        stats.core.average();
        stats.upstream.average();
        stats.downstream.average();
        stats
    }
}

impl fmt::Display for RoundStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edge = |ends: Option<(usize, usize)>| match ends {
            Some((src, dst)) => format!("{}-{}", src, dst),
            None => String::from("none"),
        };
        writeln!(f, "Average load: {:.2} (core: {:.2}; access_up: {:.2}; access_down: {:.2}); \
                     maximum average load on edge {} ({:.2})",
                 self.avg_load, self.core.avg_load, self.upstream.avg_load,
                 self.downstream.avg_load, edge(self.max_load_edge), self.max_load)?;
        for (name, class) in [("core", &self.core), ("upstream access", &self.upstream),
                              ("downstream access", &self.downstream)].iter() {
            writeln!(f, "Average peak {} load: {:.2}, maximum peak {} load on edge {} ({:.2})",
                     name, class.avg_peak, name, edge(class.max_peak_edge), class.max_peak)?;
        }
        Ok(())
    }
}

impl NetworkStats {
    pub fn new() -> Self {
        NetworkStats { rounds: vec![] }
    }
    /// Stores the figures of a round, replacing earlier ones for that round
    pub fn record(&mut self, stats: RoundStats) {
        match self.rounds.iter_mut().find(|s| s.round == stats.round) {
            Some(old) => *old = stats,
            None => self.rounds.push(stats),
        }
    }
    pub fn get(&self, round: u32) -> Option<&RoundStats> {
        self.rounds.iter().find(|s| s.round == round)
    }
    pub fn last(&self) -> Option<&RoundStats> {
        self.rounds.last()
    }
    pub fn iter(&self) -> impl Iterator<Item=&RoundStats> {
        self.rounds.iter()
    }
    pub fn len(&self) -> usize {
        self.rounds.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Network {
        let mut network = Network::new();
        let v0 = network.add_core(0);
        let v1 = network.add_core(1);
        network.add_link((v0, v1), 100.0, 100.0, 1.0);
        network.add_access(v0, 10, 1000.0, 500.0);
        network.add_access(v1, 10, 1000.0, 500.0);
        network
    }

    #[test]
    fn it_averages_per_class() {
        let network = setup();
        // edges: 0-1, 1-0, 0-2, 2-0, 1-3, 3-1
        let loads = vec![1000.0, 0.0, 2000.0, 0.0, 0.0, 400.0];
        let stats = RoundStats::compute(&network, &loads, 3, 10);
        assert_eq!(stats.round, 3);
        assert_eq!(stats.core.edges, 2);
        assert_eq!(stats.upstream.edges, 2);
        assert_eq!(stats.downstream.edges, 2);
        assert_eq!(stats.core.avg_load, 50.0);
        assert_eq!(stats.downstream.avg_load, 100.0);
        assert_eq!(stats.upstream.avg_load, 20.0);
        assert_eq!(stats.avg_load, 340.0 / 6.0);
        assert_eq!(stats.max_load, 200.0);
        assert_eq!(stats.max_load_edge, Some((0, 2)));
    }

    #[test]
    fn it_keeps_one_entry_per_round() {
        let network = setup();
        let loads = vec![0.0; 6];
        let mut history = NetworkStats::new();
        history.record(RoundStats::compute(&network, &loads, 0, 10));
        history.record(RoundStats::compute(&network, &loads, 1, 10));
        history.record(RoundStats::compute(&network, &loads, 1, 10));
        assert_eq!(history.len(), 2);
        assert_eq!(history.last().map(|s| s.round), Some(1));
        assert_eq!(history.get(0).map(|s| s.avg_load), Some(0.0));
        assert!(history.get(2).is_none());
    }
}
