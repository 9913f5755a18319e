pub mod config;
pub mod error;
pub mod logger;
pub mod workload;
pub mod yaml;

pub use error::Error;
