use anyhow::Result;
use clap::Parser;

use efficient_frontier::datastructures::{FrontierConfig, SequentialArgs};
use efficient_frontier::frontier;
use efficient_frontier::scripted::ScriptedFactory;

/// Number of points of the efficient frontier.
const NUM_STEPS: usize = 10;

fn main() -> Result<()> {
    let args = SequentialArgs::parse();
    env_logger::Builder::new()
        .filter_level(args.verbosity.log_level_filter())
        .init();
    let config = FrontierConfig {
        model_dir: args.model_dir.join("qpmv"),
        num_workers: 1,
        num_steps: NUM_STEPS,
    };
    let factory = ScriptedFactory::from_model_dir(&config.model_dir)?;
    let points = frontier::compute_frontier_sequential(&config, factory)?;
    println!("RETURN    VARIANCE");
    for point in points {
        println!("{point}");
    }
    Ok(())
}
