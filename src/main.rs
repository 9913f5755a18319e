use std::error::Error as _;

use log::{error, info};
use placesim::utils::config::Arguments;
use placesim::utils::{logger, yaml, Error};
use placesim::Simulation;

fn main() {
    logger::init();
    let args: Arguments = argh::from_env();
    if let Err(e) = run(args) {
        error!("{}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            error!("caused by: {}", cause);
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run(args: Arguments) -> Result<(), Error> {
    let mut config = yaml::load_config(&args.config)?;
    config.override_from_args(&args);
    info!("Running {} with the {} oracle for {} rounds",
          config.name, config.oracle, config.rounds);

    let topology = yaml::load_topology(&args.topology, &config)?;
    let workload = yaml::load_requests(&args.requests, &topology)?;
    info!("Loaded {} vertices, {} edges and {} requests",
          topology.network().node_count(), topology.network().edge_count(), workload.len());

    let mut sim = Simulation::new(topology, config)?;
    sim.set_workload(workload);
    let elapsed = sim.run();
    info!("--- computing time: {} μs ---", elapsed);
    Ok(())
}
