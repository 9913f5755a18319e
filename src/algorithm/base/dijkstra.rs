use std::f64::INFINITY as INF;

use hashbrown::HashMap;

use super::heap::MyMinHeap;
use crate::network::{Network, NodeIndex};

pub type NodePath = Vec<NodeIndex>;


/// Distances and predecessors from one root to every vertex of the graph
#[derive(Clone, Debug)]
struct Tree {
    dist: Vec<f64>,
    pred: Vec<Option<NodeIndex>>,
    hops: Vec<usize>,
}

/// Single-source shortest paths, weighted by edge length, kept per root.
#[derive(Clone, Debug, Default)]
pub struct Dijkstra {
    trees: HashMap<NodeIndex, Tree>,
}


impl Dijkstra {
    /// Computes a tree rooted at every core vertex; access vertices borrow
    /// the tree of the core vertex above them.
    pub fn compute(&mut self, graph: &Network) {
        for &root in graph.cores() {
            self.compute_once(graph, root);
        }
    }
    pub fn compute_once(&mut self, graph: &Network, r: NodeIndex) {
        if self.trees.contains_key(&r) { return }
        let n = graph.node_count();
        let mut tree = Tree {
            dist: vec![INF; n],
            pred: vec![None; n],
            hops: vec![0; n],
        };
        let mut done = vec![false; n];
        let mut heap = MyMinHeap::new();

        tree.dist[r.index()] = 0.0;
        heap.push(r, 0.0.into());

        while let Some((v, rv_dist)) = heap.pop() {
            if done[v.index()] { continue; }
            done[v.index()] = true;
            let rv_dist: f64 = rv_dist.into();
            for e in graph.outgoings(v) {
                let u = graph.endpoints(e).1;
                let ru_dist = rv_dist + graph.edge(e).length();
                if done[u.index()] || ru_dist >= tree.dist[u.index()] { continue; }

                tree.dist[u.index()] = ru_dist;
                tree.pred[u.index()] = Some(v);
                tree.hops[u.index()] = tree.hops[v.index()] + 1;
                match heap.get(&u) {
                    Some(_) => { heap.change_priority(&u, ru_dist.into()); },
                    None    => { heap.push(u, ru_dist.into()); },
                }
            }
        }
        self.trees.insert(r, tree);
    }
    pub fn is_root(&self, r: NodeIndex) -> bool {
        self.trees.contains_key(&r)
    }
    pub fn distance(&self, src: NodeIndex, dst: NodeIndex) -> Option<f64> {
        let tree = self.trees.get(&src)?;
        let dist = tree.dist[dst.index()];
        match dist.is_finite() {
            true  => Some(dist),
            false => None,
        }
    }
    /// Number of edges on the shortest path
    pub fn hops(&self, src: NodeIndex, dst: NodeIndex) -> Option<usize> {
        self.distance(src, dst)?;
        self.trees.get(&src).map(|tree| tree.hops[dst.index()])
    }
    pub fn predecessor(&self, src: NodeIndex, dst: NodeIndex) -> Option<NodeIndex> {
        self.trees.get(&src)
            .and_then(|tree| tree.pred[dst.index()])
    }
    pub fn shortest_path(&self, src: NodeIndex, dst: NodeIndex) -> Option<NodePath> {
        self.distance(src, dst)?;
        let mut path = vec![dst];
        let mut current = dst;
        while current != src {
            current = self.predecessor(src, current)?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}
