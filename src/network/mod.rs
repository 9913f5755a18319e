mod network;
mod snapshot;
mod stats;
mod topology;

pub use network::{Device, Edge, EdgeClass, EdgeIndex, Network, Node, NodeIndex};
pub use snapshot::{EdgeSnapshot, NodeSnapshot, TopologySnapshot};
pub use stats::{ClassStats, NetworkStats, RoundStats};
pub use topology::Topology;

/// Edges in forwarding order
pub type Path = Vec<EdgeIndex>;
