use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use polars::prelude::ChunkAgg;

use crate::datastructures::{Calibration, FrontierConfig, FrontierPoint, FrontierState};
use crate::session::{ModelingSession, SessionFactory, SessionOptions};

const MODEL_FILE: &str = "qpmv.mod";
const SCRIPT_FILE: &str = "qpmvbit.run";

/// Resets the inclusion sets to their widest state before a new target.
const RESET_SETS: &str = "let stockopall:={};let stockrun:=stockall;";
/// Narrows the run set to assets the relaxed solve gave positive weight.
const NARROW_RUN: &str = "let stockrun:={i in stockrun:weights[i]>0};";
/// Pins assets the relaxed solve weighted above one half.
const NARROW_OPTIMAL: &str = "let stockopall:={i in stockrun:weights[i]>0.5};";

/// One unit of concurrent execution of a frontier sweep.
///
/// A worker owns a private engine session, established lazily on first use
/// and kept for every step the worker later claims. It shares nothing with
/// other workers except the [`FrontierState`] handle.
pub struct Worker<F: SessionFactory> {
    state: Arc<FrontierState>,
    model_dir: PathBuf,
    factory: Arc<F>,
    session: Option<F::Session>,
}

impl<F: SessionFactory> Worker<F> {
    /// A worker for one frontier run. No session is established yet.
    pub fn new(state: Arc<FrontierState>, model_dir: impl Into<PathBuf>, factory: Arc<F>) -> Self {
        Self {
            state,
            model_dir: model_dir.into(),
            factory,
            session: None,
        }
    }

    /// Spawns and loads a fresh session: options, model, script, data tables.
    fn connect(&self) -> Result<F::Session> {
        debug!("loading model from {}", self.model_dir.display());
        let mut session = self.factory.spawn_session()?;
        session.configure(&SessionOptions::default())?;
        session.read_model(&self.model_dir.join(MODEL_FILE))?;
        session.read_script(&self.model_dir.join(SCRIPT_FILE))?;
        let data_dir = self.model_dir.to_string_lossy();
        session.set_string_parameter("data_dir", &data_dir)?;
        session.read_table("assetstable")?;
        session.read_table("astrets")?;
        Ok(session)
    }

    /// The worker's session, loading it on first use. The load happens at
    /// most once per worker no matter how many steps it processes.
    fn load(&mut self) -> Result<&mut F::Session> {
        if self.session.is_none() {
            self.session = Some(self.connect().context("model load failed")?);
        }
        self.session
            .as_mut()
            .ok_or_else(|| anyhow!("session missing after load"))
    }

    /// Calibrates the frontier's return range with one relaxed solve and one
    /// scan of the average-return table. Runs on the caller's thread, before
    /// any worker thread exists; the loaded session is kept for later steps.
    pub fn calibrate(&mut self, num_steps: usize) -> Result<Calibration> {
        let session = self.load()?;
        session.set_relaxation(true)?;
        session.solve().context("calibration solve failed")?;
        let min_return = session.variable_value("portret")?;
        let values = session.parameter_values("averret")?;
        let max_return = values
            .column("averret")?
            .f64()?
            .max()
            .context("average return table is empty")?;
        let calibration = Calibration::new(min_return, max_return, num_steps);
        info!(
            "calibrated return range [{min_return}, {max_return}], step size {}",
            calibration.step_size
        );
        Ok(calibration)
    }

    /// Runs one two-phase solve for a claimed step and returns its point.
    fn solve_step(&mut self, step: usize) -> Result<FrontierPoint> {
        let target = self.state.calibration()?.target_return(step);
        let session = self.load()?;
        println!("Solving for return = {target}");
        session.set_parameter("targetret", target)?;
        session.eval(RESET_SETS)?;
        // Phase one: continuous relaxation, fast and approximate.
        session.set_relaxation(true)?;
        session.solve()?;
        println!("QP result = {}", session.objective_value("cst")?);
        // Keep only assets the relaxed solution actually used.
        session.eval(NARROW_RUN)?;
        session.eval(NARROW_OPTIMAL)?;
        // Phase two: integrality restored, on the narrowed sets.
        session.set_relaxation(false)?;
        session.solve()?;
        let variance = session.objective_value("cst")?;
        println!("QMIP result = {variance}");
        Ok(FrontierPoint {
            ret: target,
            variance,
        })
    }

    /// Claims steps until none remain, recording each point at the index of
    /// the step it was claimed for. A solve failure aborts the worker with
    /// the failing step attached; nothing is retried.
    pub fn run(&mut self) -> Result<()> {
        while let Some(step) = self.state.claim_step() {
            debug!("claimed frontier step {step}");
            let point = self
                .solve_step(step)
                .with_context(|| format!("frontier step {step} failed"))?;
            self.state.record(step, point)?;
        }
        Ok(())
    }
}

/// Computes the full frontier with one OS thread per configured worker.
///
/// Calibration runs first, single-threaded, on worker 0 (which keeps its
/// loaded session for the concurrent phase). All workers are then spawned
/// together and joined together; the first worker error fails the whole
/// batch instead of yielding a partial table. With zero workers the
/// calibration still runs and every point stays at its zeroed default.
pub fn compute_frontier<F>(config: &FrontierConfig, factory: F) -> Result<Vec<FrontierPoint>>
where
    F: SessionFactory + Send + Sync,
    F::Session: Send,
{
    let state = Arc::new(FrontierState::new(config.num_steps));
    let factory = Arc::new(factory);
    let mut workers: Vec<Worker<F>> = (0..config.num_workers)
        .map(|_| Worker::new(state.clone(), &config.model_dir, factory.clone()))
        .collect();

    let calibration = match workers.first_mut() {
        Some(worker) => worker.calibrate(config.num_steps)?,
        None => Worker::new(state.clone(), &config.model_dir, factory.clone())
            .calibrate(config.num_steps)?,
    };
    state.publish_calibration(calibration)?;

    let results: Vec<Result<()>> = thread::scope(|scope| {
        let handles: Vec<_> = workers
            .iter_mut()
            .map(|worker| scope.spawn(move || worker.run()))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(_) => Err(anyhow!("frontier worker thread panicked")),
            })
            .collect()
    });
    for result in results {
        result?;
    }
    Ok(state.points())
}

/// The single-threaded variant: one worker sweeps every step on the calling
/// thread. Same calibration, same target formula, same indexing as the
/// parallel driver.
pub fn compute_frontier_sequential<F: SessionFactory>(
    config: &FrontierConfig,
    factory: F,
) -> Result<Vec<FrontierPoint>> {
    let state = Arc::new(FrontierState::new(config.num_steps));
    let mut worker = Worker::new(state.clone(), &config.model_dir, Arc::new(factory));
    let calibration = worker.calibrate(config.num_steps)?;
    state.publish_calibration(calibration)?;
    worker.run()?;
    Ok(state.points())
}
