use thiserror::Error;

/// Failures of the outer surface: reading and validating the model inputs.
/// Broken invariants of a running simulation are panics, not errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read {0}")]
    Io(String, #[source] std::io::Error),
    #[error("failed to parse {0}")]
    Yaml(String, #[source] serde_yaml::Error),
    #[error("core vertex #{0} referenced by an edge does not exist")]
    UnknownNode(usize),
    #[error("vertex #{0} is not a valid request destination")]
    InvalidDestination(usize),
    #[error("invalid customer distribution on core vertex #{0}: {1}")]
    Distribution(usize, rand_distr::NormalError),
    #[error("expected exactly one central server, found {0}")]
    CentralServer(usize),
    #[error("content #{0} is requested but not listed")]
    UnknownContent(u32),
    #[error("unknown oracle {0:?}, expected origin or nearest")]
    UnknownOracle(String),
    #[error("invalid configuration: {0} must be {1}")]
    InvalidConfig(&'static str, &'static str),
}
