mod event_queue;

pub use event_queue::{EventKey, EventQueue};
