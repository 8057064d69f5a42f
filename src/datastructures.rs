use core::fmt;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use clap::Parser;
use once_cell::sync::OnceCell;

/// The return range of the frontier, computed once before any worker starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Portfolio return of the unconstrained relaxed solve.
    pub min_return: f64,
    /// Highest single-asset average return.
    pub max_return: f64,
    /// `(max_return - min_return) / num_steps`.
    pub step_size: f64,
}

impl Calibration {
    /// Derives the step size for a sweep of `num_steps` points.
    pub fn new(min_return: f64, max_return: f64, num_steps: usize) -> Self {
        Self {
            min_return,
            max_return,
            step_size: (max_return - min_return) / num_steps as f64,
        }
    }

    /// Target return for a claimed step, counted 1..=K: step 1 maps to
    /// `max_return`, step K to `max_return - (K - 1) * step_size`.
    pub fn target_return(&self, step: usize) -> f64 {
        self.max_return - (step as f64 - 1.0) * self.step_size
    }
}

/// One point of the efficient frontier.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrontierPoint {
    /// The target return the point was solved for.
    pub ret: f64,
    /// The integral (QMIP) variance at that return.
    pub variance: f64,
}

impl fmt::Display for FrontierPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<8.6}  {:<8.6}", self.ret, self.variance)
    }
}

/// State shared by every worker of one frontier run.
///
/// `next_step` is the only field behind a lock. The calibration is published
/// exactly once before the worker threads are spawned, and each result slot
/// is written exactly once by the worker that claimed its step, so the slots
/// only need the write-once guarantee of [`OnceCell`] plus the visibility
/// barrier of the final join.
pub struct FrontierState {
    next_step: Mutex<usize>,
    calibration: OnceCell<Calibration>,
    points: Vec<OnceCell<FrontierPoint>>,
}

impl FrontierState {
    /// A fresh state for a sweep of `num_steps` frontier points.
    pub fn new(num_steps: usize) -> Self {
        Self {
            next_step: Mutex::new(num_steps),
            calibration: OnceCell::new(),
            points: (0..num_steps).map(|_| OnceCell::new()).collect(),
        }
    }

    /// Number of frontier points of this run.
    pub fn num_steps(&self) -> usize {
        self.points.len()
    }

    /// Hands out the next unclaimed step, K down to 1, one claimant at a
    /// time. Returns `None` once every step has been claimed; this is the
    /// terminal signal for the calling worker.
    pub fn claim_step(&self) -> Option<usize> {
        let mut next = self.next_step.lock().expect("frontier step lock poisoned");
        if *next == 0 {
            return None;
        }
        let step = *next;
        *next -= 1;
        Some(step)
    }

    /// Publishes the calibration. Must happen before any worker runs and at
    /// most once per state.
    pub fn publish_calibration(&self, calibration: Calibration) -> Result<()> {
        self.calibration
            .set(calibration)
            .map_err(|_| anyhow!("frontier calibration published twice"))
    }

    /// The published calibration.
    pub fn calibration(&self) -> Result<Calibration> {
        self.calibration
            .get()
            .copied()
            .ok_or_else(|| anyhow!("frontier range has not been calibrated"))
    }

    /// Records the point for a claimed step at its own slot.
    pub fn record(&self, step: usize, point: FrontierPoint) -> Result<()> {
        let index = step
            .checked_sub(1)
            .ok_or_else(|| anyhow!("step numbering starts at 1"))?;
        let slot = self
            .points
            .get(index)
            .ok_or_else(|| anyhow!("step {step} out of range 1..={}", self.points.len()))?;
        slot.set(point)
            .map_err(|_| anyhow!("frontier point for step {step} recorded twice"))
    }

    /// All points in index order. Slots no worker wrote (only possible when
    /// the run was aborted or had zero workers) stay at the zeroed default.
    pub fn points(&self) -> Vec<FrontierPoint> {
        self.points
            .iter()
            .map(|slot| slot.get().copied().unwrap_or_default())
            .collect()
    }
}

/// Driver configuration for one frontier run.
#[derive(Debug, Clone)]
pub struct FrontierConfig {
    /// Directory with the model, the script and the data tables.
    pub model_dir: PathBuf,
    /// Worker threads, each with its own engine session.
    pub num_workers: usize,
    /// Frontier points to compute.
    pub num_steps: usize,
}

/// Arguments of the parallel frontier executable.
#[derive(Parser, Debug)]
#[command(about = "Compute an efficient frontier in parallel worker threads")]
pub struct ParallelArgs {
    /// Directory containing the model, script and data tables
    pub model_dir: PathBuf,
    /// Number of worker threads, each with its own solver session
    pub num_workers: usize,
    /// Log verbosity, raised with -v and lowered with -q
    #[command(flatten)]
    pub verbosity: clap_verbosity_flag::Verbosity,
}

/// Arguments of the single-threaded frontier executable.
#[derive(Parser, Debug)]
#[command(about = "Compute an efficient frontier on the current thread")]
pub struct SequentialArgs {
    /// Directory containing the model, script and data tables
    #[arg(default_value = "models")]
    pub model_dir: PathBuf,
    /// Log verbosity, raised with -v and lowered with -q
    #[command(flatten)]
    pub verbosity: clap_verbosity_flag::Verbosity,
}

#[cfg(test)]
mod tests;
