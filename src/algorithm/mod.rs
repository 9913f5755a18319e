mod base;

pub use base::{Dijkstra, MyMinHeap, NodePath, Priority};
