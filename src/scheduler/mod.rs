mod base;
mod scheduler;

pub use base::{EventKey, EventQueue};
pub use scheduler::Scheduler;
