use crate::component::{Content, Flow, User};
use crate::SimTime;


/// One viewing session of the trace
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub content: Content,
    pub destination: User,
    pub at: SimTime,
    pub round: u32,
    /// Part of the content the viewer watches before leaving
    pub fraction: f64,
}

impl Request {
    pub fn to_flow(&self) -> Flow {
        let mut flow = Flow::request(self.content, self.destination, self.at);
        let size = flow.unit_size() * num::clamp(self.fraction, 0.0, 1.0);
        flow.set_size_requested(size);
        flow
    }
}

/// An explicit request trace, standing in for catalog and popularity models
#[derive(Clone, Debug, Default)]
pub struct Workload {
    requests: Vec<Request>,
}

impl Workload {
    pub fn new(mut requests: Vec<Request>) -> Self {
        requests.sort_by_key(|r| (r.round, r.at));
        Workload { requests }
    }
    /// Adds `requests` to the trace of `round`
    pub fn extend(&mut self, round: u32, requests: Vec<Request>) {
        self.requests.extend(requests.into_iter().map(|r| Request { round, ..r }));
        self.requests.sort_by_key(|r| (r.round, r.at));
    }
    pub fn for_round(&self, round: u32) -> impl Iterator<Item=&Request> {
        self.requests.iter().filter(move |r| r.round == round)
    }
    pub fn len(&self) -> usize {
        self.requests.len()
    }
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
    pub fn last_round(&self) -> Option<u32> {
        self.requests.iter().map(|r| r.round).max()
    }
}
