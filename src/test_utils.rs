use crate::datastructures::FrontierConfig;
use crate::scripted::ScriptedFactory;

pub fn default_factory() -> ScriptedFactory {
    ScriptedFactory::new(&[("bond", 2.0), ("tech", 4.0)], 1.0)
}

pub fn default_config(num_workers: usize, num_steps: usize) -> FrontierConfig {
    FrontierConfig {
        model_dir: "models/qpmv".into(),
        num_workers,
        num_steps,
    }
}
