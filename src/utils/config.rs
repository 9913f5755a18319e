use serde::Deserialize;
use argh::FromArgs;

use super::error::Error;
use crate::{Capacity, SimTime, MAX_FLOW_SPEED};

/// Flow-level simulator of a CDN with caches at the metro/core vertices
#[derive(FromArgs)]
pub struct Arguments {
    /// path to the topology description
    #[argh(positional)]
    pub topology: String,
    /// path to the request trace
    #[argh(positional)]
    pub requests: String,
    /// path to configuration file
    #[argh(option, short='c', default="String::from(\"data/config/default.yaml\")")]
    pub config: String,
    /// override random seed used to populate the access trees
    #[argh(option, short='s')]
    pub seed: Option<u64>,
    /// override number of rounds to simulate
    #[argh(option, short='r')]
    pub rounds: Option<u32>,
    /// override oracle used to pick sources, origin or nearest
    #[argh(option, short='o')]
    pub oracle: Option<String>,
    /// override minimum bandwidth increase granted to a flow
    #[argh(option, short='m')]
    pub min_flow_increase: Option<f64>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub name: String,
    pub seed: u64,
    pub rounds: u32,
    /// seconds
    pub round_duration: SimTime,
    /// reference streaming bitrate, Mbps
    pub bitrate: Capacity,
    #[serde(default = "default_max_flow_speed")]
    pub max_flow_speed: Capacity,
    #[serde(default)]
    pub min_flow_increase: Capacity,
    /// seconds between snapshots, 0 for none
    #[serde(default)]
    pub snapshot_period: SimTime,
    /// customers on every access tree, 0 to sample them
    #[serde(default)]
    pub pon_cardinality: u32,
    pub oracle: String,
    #[serde(default)]
    pub snapshot_dir: Option<String>,
    /// rounds a content stays available after its release, forever if absent
    #[serde(default)]
    pub content_lifetime: Option<u32>,
}

fn default_max_flow_speed() -> Capacity {
    MAX_FLOW_SPEED
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: String::from("default"),
            seed: 0,
            rounds: 1,
            round_duration: 86400,
            bitrate: 5.0,
            max_flow_speed: MAX_FLOW_SPEED,
            min_flow_increase: 0.0,
            snapshot_period: 0,
            pon_cardinality: 0,
            oracle: String::from("origin"),
            snapshot_dir: None,
            content_lifetime: None,
        }
    }
}

impl Config {
    /// Rejects values the simulation kernel cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        if self.round_duration <= 0 {
            return Err(Error::InvalidConfig("round_duration", "positive"));
        }
        if !(self.bitrate > 0.0) {
            return Err(Error::InvalidConfig("bitrate", "positive"));
        }
        if !(self.max_flow_speed > 0.0) {
            return Err(Error::InvalidConfig("max_flow_speed", "positive"));
        }
        if self.snapshot_period < 0 {
            return Err(Error::InvalidConfig("snapshot_period", "non-negative"));
        }
        if !(self.min_flow_increase >= 0.0) {
            return Err(Error::InvalidConfig("min_flow_increase", "non-negative"));
        }
        if self.content_lifetime == Some(0) {
            return Err(Error::InvalidConfig("content_lifetime", "positive"));
        }
        Ok(())
    }
    pub fn override_from_args(&mut self, args: &Arguments) {
        if let Some(seed) = args.seed {
            self.seed = seed;
        }
        if let Some(rounds) = args.rounds {
            self.rounds = num::clamp(rounds, 1, 9999);
        }
        if let Some(oracle) = &args.oracle {
            self.oracle = oracle.clone();
        }
        if let Some(increase) = args.min_flow_increase {
            self.min_flow_increase = num::clamp(increase, 0.0, self.max_flow_speed);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn arguments(extra: &[&str]) -> Arguments {
        let mut args = vec!["topology.yaml", "requests.yaml"];
        args.extend_from_slice(extra);
        match Arguments::from_args(&["placesim"], &args) {
            Ok(args) => args,
            Err(exit) => panic!("Failed to parse arguments: {}", exit.output),
        }
    }

    #[test]
    fn it_overrides_from_args() {
        let mut config = Config::default();
        let args = arguments(&["-s", "7", "-r", "0", "-o", "nearest", "-m", "5000"]);
        config.override_from_args(&args);
        assert_eq!(config.seed, 7);
        assert_eq!(config.rounds, 1);
        assert_eq!(config.oracle, "nearest");
        assert_eq!(config.min_flow_increase, MAX_FLOW_SPEED);
        assert_eq!(args.config, "data/config/default.yaml");
    }

    #[test]
    fn it_fills_optional_fields() {
        let text = "name: tiny\nseed: 1\nrounds: 2\nround_duration: 100\n\
                    bitrate: 2.5\noracle: origin\n";
        let config: Config = serde_yaml::from_str(text)
            .expect("Failed to parse config");
        assert_eq!(config.max_flow_speed, MAX_FLOW_SPEED);
        assert_eq!(config.snapshot_period, 0);
        assert_eq!(config.snapshot_dir, None);
        assert_eq!(config.content_lifetime, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn it_rejects_unusable_values() {
        let rejected = |config: Config| match config.validate() {
            Err(Error::InvalidConfig(field, _)) => field,
            other => panic!("Expected an invalid configuration, got {:?}", other),
        };
        let base = Config::default();
        assert_eq!(rejected(Config { round_duration: 0, ..base.clone() }), "round_duration");
        assert_eq!(rejected(Config { round_duration: -5, ..base.clone() }), "round_duration");
        assert_eq!(rejected(Config { bitrate: 0.0, ..base.clone() }), "bitrate");
        assert_eq!(rejected(Config { max_flow_speed: 0.0, ..base.clone() }), "max_flow_speed");
        assert_eq!(rejected(Config { max_flow_speed: -1.0, ..base.clone() }), "max_flow_speed");
        assert_eq!(rejected(Config { snapshot_period: -1, ..base.clone() }), "snapshot_period");
        assert_eq!(rejected(Config { min_flow_increase: -0.5, ..base.clone() }),
                   "min_flow_increase");
        assert_eq!(rejected(Config { content_lifetime: Some(0), ..base }), "content_lifetime");
    }
}
