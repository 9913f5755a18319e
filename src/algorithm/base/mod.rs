mod dijkstra;
mod heap;

pub use dijkstra::{Dijkstra, NodePath};
pub use heap::{MyMinHeap, Priority};
