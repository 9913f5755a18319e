use std::cmp::Reverse;

use priority_queue::PriorityQueue;

use crate::component::FlowId;
use crate::SimTime;


/// Smallest eta first; TERMINATE after other events due at the same time;
/// older flows first among the rest.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub struct EventKey (Reverse<(SimTime, bool, FlowId)>);

impl EventKey {
    pub fn new(eta: SimTime, terminate: bool, id: FlowId) -> Self {
        EventKey (Reverse((eta, terminate, id)))
    }
    pub fn eta(&self) -> SimTime {
        ((self.0).0).0
    }
}

/// Indexed binary heap over flow handles, so that a flow can be moved in
/// O(log n) when its eta changes in place.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    heap: PriorityQueue<FlowId, EventKey>,
}


impl EventQueue {
    pub fn new() -> Self {
        EventQueue { heap: PriorityQueue::new() }
    }
    /// Returns false when the flow is already queued; the queue is left as is
    pub fn push(&mut self, id: FlowId, eta: SimTime, terminate: bool) -> bool {
        if self.heap.get(&id).is_some() {
            return false;
        }
        self.heap.push(id, EventKey::new(eta, terminate, id));
        true
    }
    pub fn peek(&self) -> Option<(FlowId, SimTime)> {
        self.heap.peek().map(|(&id, key)| (id, key.eta()))
    }
    pub fn pop(&mut self) -> Option<FlowId> {
        self.heap.pop().map(|(id, _)| id)
    }
    /// Moves a queued flow to its new eta, returning the old one
    pub fn reorder(&mut self, id: FlowId, eta: SimTime, terminate: bool) -> Option<SimTime> {
        self.heap.change_priority(&id, EventKey::new(eta, terminate, id))
            .map(|old| old.eta())
    }
    pub fn remove(&mut self, id: FlowId) -> bool {
        self.heap.remove(&id).is_some()
    }
    pub fn contains(&self, id: FlowId) -> bool {
        self.heap.get(&id).is_some()
    }
    pub fn len(&self) -> usize {
        self.heap.len()
    }
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
    /// Empties the queue in processing order
    pub fn drain(&mut self) -> Vec<FlowId> {
        std::iter::from_fn(|| self.pop()).collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_pops_by_eta_then_terminate_last() {
        let mut queue = EventQueue::new();
        assert!(queue.push(0, 10, true));
        assert!(queue.push(1, 10, false));
        assert!(queue.push(2, 5, false));
        assert!(queue.push(3, 10, false));
        assert_eq!(queue.peek(), Some((2, 5)));
        assert_eq!(queue.drain(), vec![2, 1, 3, 0]);
        assert!(queue.is_empty());
    }

    #[test]
    fn it_refuses_duplicates() {
        let mut queue = EventQueue::new();
        assert!(queue.push(4, 10, false));
        assert!(!queue.push(4, 3, false));
        assert_eq!(queue.peek(), Some((4, 10)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn it_reorders_in_both_directions() {
        let mut queue = EventQueue::new();
        queue.push(0, 10, false);
        queue.push(1, 20, false);
        queue.push(2, 30, false);
        assert_eq!(queue.reorder(2, 5, false), Some(30));
        assert_eq!(queue.reorder(0, 25, false), Some(10));
        assert_eq!(queue.reorder(9, 1, false), None);
        assert!(queue.remove(1));
        assert!(!queue.contains(1));
        assert_eq!(queue.drain(), vec![2, 0]);
    }
}
