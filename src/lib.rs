pub mod algorithm;
pub mod component;
pub mod network;
pub mod oracle;
pub mod scheduler;
pub mod sim;
pub mod utils;

/// Simulated time in seconds since the start of the current round
pub type SimTime = i64;
/// Bandwidth in Mbps, or an amount of data in Mb
pub type Capacity = f64;

/// Sentinel for "not yet known" times (unstarted flows, unresolved requests)
pub const INF_TIME: SimTime = SimTime::MAX;
/// Capacity of an edge that is never a bottleneck
pub const UNLIMITED: Capacity = Capacity::INFINITY;
/// Default upper bound on the bandwidth of a single flow (1 Gbps)
pub const MAX_FLOW_SPEED: Capacity = 1000.0;

pub use component::{Content, Flow, FlowId, FlowKind, User};
pub use network::{Network, Topology};
pub use scheduler::Scheduler;
pub use sim::Simulation;
