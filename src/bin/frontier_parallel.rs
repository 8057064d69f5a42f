use anyhow::Result;
use clap::Parser;

use efficient_frontier::datastructures::{FrontierConfig, ParallelArgs};
use efficient_frontier::frontier;
use efficient_frontier::scripted::ScriptedFactory;

/// Number of points of the efficient frontier.
const NUM_STEPS: usize = 20;

fn main() -> Result<()> {
    let args = ParallelArgs::parse();
    env_logger::Builder::new()
        .filter_level(args.verbosity.log_level_filter())
        .init();
    if args.num_workers == 0 {
        println!("number of workers must be positive");
        std::process::exit(exitcode::USAGE);
    }
    let config = FrontierConfig {
        model_dir: args.model_dir,
        num_workers: args.num_workers,
        num_steps: NUM_STEPS,
    };
    let factory = ScriptedFactory::from_model_dir(&config.model_dir)?;
    let points = frontier::compute_frontier(&config, factory)?;
    println!("RETURN    VARIANCE");
    for point in points {
        println!("{point}");
    }
    Ok(())
}
