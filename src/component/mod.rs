mod arena;
mod flow;

pub use arena::FlowArena;
pub use flow::{Content, Flow, FlowId, FlowKind, User};
