use std::fs;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use rand::SeedableRng;
use rand_chacha::ChaChaRng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use super::config::Config;
use super::error::Error;
use super::workload::{Request, Workload};
use crate::component::{Content, User};
use crate::network::{Network, NodeIndex, Topology, TopologySnapshot};
use crate::{Capacity, SimTime};

#[derive(Deserialize)]
pub struct TopologyYaml {
    pub cores: Vec<CoreYaml>,
    #[serde(default)]
    pub edges: Vec<CoreEdgeYaml>,
}

/// A metro/core vertex and the access trees hanging off it
#[derive(Deserialize)]
pub struct CoreYaml {
    pub asid: u32,
    #[serde(default)]
    pub pons: usize,
    #[serde(default)]
    pub avg_customers: f64,
    #[serde(default)]
    pub dev_customers: f64,
    /// Capacity of each downstream access link, absent or negative if unlimited
    pub down_capacity: Option<Capacity>,
    pub up_capacity: Option<Capacity>,
    #[serde(default)]
    pub central_server: bool,
}

#[derive(Deserialize)]
pub struct CoreEdgeYaml {
    pub ends: [usize; 2],
    pub capacity: Option<Capacity>,
    /// Capacity of the opposite direction, same as `capacity` if absent
    pub reverse_capacity: Option<Capacity>,
    #[serde(default = "default_length")]
    pub length: f64,
}

#[derive(Deserialize)]
struct RequestsYaml {
    contents: Vec<ContentYaml>,
    requests: Vec<RequestYaml>,
}

#[derive(Deserialize)]
struct ContentYaml {
    id: u32,
    size: Capacity,
    chunk_size: Option<Capacity>,
    #[serde(default)]
    release_round: u32,
}

#[derive(Deserialize)]
struct RequestYaml {
    content: u32,
    node: usize,
    #[serde(default)]
    slot: u32,
    at: SimTime,
    #[serde(default)]
    round: u32,
    #[serde(default = "default_fraction")]
    fraction: f64,
}

fn default_length() -> f64 {
    1.0
}

fn default_fraction() -> f64 {
    1.0
}

fn unlimited_if_absent(capacity: Option<Capacity>) -> Capacity {
    capacity.unwrap_or(-1.0)
}

fn read(path: &str) -> Result<String, Error> {
    fs::read_to_string(path)
        .map_err(|e| Error::Io(path.to_string(), e))
}

pub fn load_config(path: &str) -> Result<Config, Error> {
    let text = read(path)?;
    parse_config(&text, path)
}

pub fn parse_config(text: &str, name: &str) -> Result<Config, Error> {
    let config: Config = serde_yaml::from_str(text)
        .map_err(|e| Error::Yaml(name.to_string(), e))?;
    config.validate()?;
    Ok(config)
}

pub fn load_topology(path: &str, config: &Config) -> Result<Topology, Error> {
    let text = read(path)?;
    let yaml: TopologyYaml = serde_yaml::from_str(&text)
        .map_err(|e| Error::Yaml(path.to_string(), e))?;
    build_topology(&yaml, config)
}

/// Builds the graph described by `yaml`: core vertices first, in order, then
/// the access trees of each core vertex, then the core links in both
/// directions. Customer counts are drawn from a seeded normal distribution
/// unless `pon_cardinality` overrides them.
pub fn build_topology(yaml: &TopologyYaml, config: &Config) -> Result<Topology, Error> {
    let mut rng = ChaChaRng::seed_from_u64(config.seed);
    let mut network = Network::new();
    let cores: Vec<NodeIndex> = yaml.cores.iter()
        .map(|core| network.add_core(core.asid))
        .collect();
    let servers: Vec<NodeIndex> = yaml.cores.iter().zip(cores.iter())
        .filter(|(core, _)| core.central_server)
        .map(|(_, &ix)| ix)
        .collect();
    if servers.len() != 1 {
        return Err(Error::CentralServer(servers.len()));
    }

    for (core, &ix) in yaml.cores.iter().zip(cores.iter()) {
        let dist = Normal::new(core.avg_customers, core.dev_customers)
            .map_err(|e| Error::Distribution(ix.index(), e))?;
        for _ in 0..core.pons {
            let customers = match config.pon_cardinality {
                0 => (dist.sample(&mut rng) + 0.5).floor().max(0.0) as u32,
                n => n,
            };
            network.add_access(ix, customers,
                               unlimited_if_absent(core.down_capacity),
                               unlimited_if_absent(core.up_capacity));
        }
    }

    for edge in yaml.edges.iter() {
        let [src, dst] = edge.ends;
        for &end in [src, dst].iter() {
            if end >= cores.len() {
                return Err(Error::UnknownNode(end));
            }
        }
        let capacity = unlimited_if_absent(edge.capacity);
        let reverse = edge.reverse_capacity.unwrap_or(capacity);
        network.add_link((cores[src], cores[dst]), capacity, reverse, edge.length);
    }

    Ok(Topology::new(network, servers[0], config))
}

pub fn load_requests(path: &str, topology: &Topology) -> Result<Workload, Error> {
    let text = read(path)?;
    let yaml: RequestsYaml = serde_yaml::from_str(&text)
        .map_err(|e| Error::Yaml(path.to_string(), e))?;
    build_workload(yaml, topology)
}

pub fn parse_requests(text: &str, topology: &Topology) -> Result<Workload, Error> {
    let yaml: RequestsYaml = serde_yaml::from_str(text)
        .map_err(|e| Error::Yaml(String::from("request trace"), e))?;
    build_workload(yaml, topology)
}

fn build_workload(yaml: RequestsYaml, topology: &Topology) -> Result<Workload, Error> {
    let contents: HashMap<u32, Content> = yaml.contents.into_iter()
        .map(|c| {
            let content = Content {
                id: c.id,
                size: c.size,
                chunk_size: c.chunk_size.unwrap_or(c.size),
                release_round: c.release_round,
            };
            (c.id, content)
        })
        .collect();
    let nodes = topology.network().node_count();
    let mut requests = Vec::with_capacity(yaml.requests.len());
    for r in yaml.requests {
        let content = *contents.get(&r.content)
            .ok_or(Error::UnknownContent(r.content))?;
        if r.node >= nodes {
            return Err(Error::InvalidDestination(r.node));
        }
        requests.push(Request {
            content,
            destination: User::new(NodeIndex::from(r.node), r.slot),
            at: r.at,
            round: r.round,
            fraction: r.fraction,
        });
    }
    Ok(Workload::new(requests))
}

/// Dumps a snapshot as `<dir>/out_<round>_<time>.yaml`
pub fn write_snapshot(dir: &str, snapshot: &TopologySnapshot) -> Result<PathBuf, Error> {
    fs::create_dir_all(dir)
        .map_err(|e| Error::Io(dir.to_string(), e))?;
    let path = Path::new(dir).join(snapshot.file_name());
    let name = path.display().to_string();
    let text = serde_yaml::to_string(snapshot)
        .map_err(|e| Error::Yaml(name.clone(), e))?;
    fs::write(&path, text)
        .map_err(|e| Error::Io(name, e))?;
    Ok(path)
}


#[cfg(test)]
mod tests {
    use super::*;

    const TOPOLOGY: &str = "
cores:
  - { asid: 0, pons: 2, avg_customers: 30, dev_customers: 5,
      down_capacity: 2500, up_capacity: 1250, central_server: true }
  - { asid: 1, pons: 1, avg_customers: 30, dev_customers: 5,
      down_capacity: 2500 }
edges:
  - { ends: [0, 1], capacity: 10000, reverse_capacity: 5000, length: 3 }
";

    fn parse(text: &str) -> TopologyYaml {
        serde_yaml::from_str(text).expect("Failed to parse topology")
    }

    #[test]
    fn it_validates_loaded_configs() {
        let config = |round_duration: &str, bitrate: &str, extra: &str| {
            let text = format!("name: t\nseed: 1\nrounds: 1\noracle: origin\n\
                                round_duration: {}\nbitrate: {}\n{}",
                               round_duration, bitrate, extra);
            parse_config(&text, "config")
        };
        let rejected = |result: Result<Config, Error>| match result {
            Err(Error::InvalidConfig(field, _)) => field,
            other => panic!("Expected an invalid configuration, got {:?}", other),
        };
        assert!(config("100", "5", "").is_ok());
        assert_eq!(rejected(config("-5", "5", "")), "round_duration");
        assert_eq!(rejected(config("100", "0", "")), "bitrate");
        assert_eq!(rejected(config("100", "5", "max_flow_speed: 0\n")), "max_flow_speed");
        assert_eq!(rejected(config("100", "5", "snapshot_period: -60\n")), "snapshot_period");
        assert_eq!(rejected(config("100", "5", "min_flow_increase: -1\n")),
                   "min_flow_increase");
    }

    #[test]
    fn it_builds_the_described_graph() {
        let topology = build_topology(&parse(TOPOLOGY), &Config::default())
            .expect("Failed to build topology");
        let network = topology.network();
        assert_eq!(network.node_count(), 5);
        // two links per access tree, two per core link
        assert_eq!(network.edge_count(), 8);
        assert_eq!(topology.central_server(), 0.into());
        assert_eq!(topology.access_nodes().len(), 3);
        assert_eq!(topology.num_ases(), 2);
        let core = network.edge_between(0.into(), 1.into()).expect("missing core link");
        let back = network.edge_between(1.into(), 0.into()).expect("missing core link");
        assert_eq!(network.edge(core).max_capacity(), 10000.0);
        assert_eq!(network.edge(back).max_capacity(), 5000.0);
        assert_eq!(network.edge(back).length(), 3.0);
        let pon = topology.access_nodes()[2];
        assert!(network.edge(network.uplink(pon).expect("missing uplink")).is_unlimited());
    }

    #[test]
    fn it_is_reproducible_per_seed() {
        let customers = |seed: u64| {
            let config = Config { seed, ..Config::default() };
            let topology = build_topology(&parse(TOPOLOGY), &config)
                .expect("Failed to build topology");
            topology.access_nodes().iter()
                .map(|&pon| topology.network().node(pon).customers())
                .collect::<Vec<_>>()
        };
        assert_eq!(customers(3), customers(3));
    }

    #[test]
    fn it_overrides_customer_counts() {
        let config = Config { pon_cardinality: 32, ..Config::default() };
        let topology = build_topology(&parse(TOPOLOGY), &config)
            .expect("Failed to build topology");
        assert_eq!(topology.num_customers(), 96);
        assert_eq!(topology.as_customers(0), 64);
        assert_eq!(topology.as_customers(1), 32);
    }

    #[test]
    fn it_rejects_malformed_graphs() {
        let no_server = "cores:\n  - { asid: 0 }\n";
        assert!(matches!(build_topology(&parse(no_server), &Config::default()),
                         Err(Error::CentralServer(0))));
        let dangling = "cores:\n  - { asid: 0, central_server: true }\n\
                        edges:\n  - { ends: [0, 4], capacity: 10 }\n";
        assert!(matches!(build_topology(&parse(dangling), &Config::default()),
                         Err(Error::UnknownNode(4))));
    }

    #[test]
    fn it_parses_request_traces() {
        let topology = build_topology(&parse(TOPOLOGY), &Config::default())
            .expect("Failed to build topology");
        let trace = "
contents:
  - { id: 7, size: 3000 }
requests:
  - { content: 7, node: 2, slot: 1, at: 60, fraction: 0.5 }
  - { content: 7, node: 3, at: 30, round: 1 }
";
        let workload = parse_requests(trace, &topology).expect("Failed to parse trace");
        assert_eq!(workload.len(), 2);
        let first = workload.for_round(0).next().expect("missing request");
        assert_eq!(first.destination, User::new(2.into(), 1));
        assert_eq!(first.content.chunk_size, 3000.0);
        let unknown = "contents: []\nrequests:\n  - { content: 1, node: 2, at: 0 }\n";
        assert!(matches!(parse_requests(unknown, &topology),
                         Err(Error::UnknownContent(1))));
    }
}
