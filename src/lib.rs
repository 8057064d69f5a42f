#![warn(missing_docs)]
//! Sweep the efficient frontier of a mixed-integer quadratic portfolio model
//! by fanning independent solves of an external algebraic modeling engine
//! across worker threads.
//!
//! The engine itself is an opaque collaborator reached through the narrow
//! [`session::ModelingSession`] trait. Each worker thread owns its private
//! session (engine sessions are not safe to share across threads) and
//! repeatedly claims the next frontier step from a shared
//! [`datastructures::FrontierState`] until none remain. Claiming is the only
//! locked operation; every result slot is written exactly once, at the index
//! the claiming worker holds, so the arrays need no further synchronization.
//!
//! This crate also ships a deterministic in-process engine,
//! [`scripted::ScriptedFactory`], so the two executables and the tests run
//! without the external engine installed. Any real binding that implements
//! [`session::ModelingSession`] plugs into the same machinery.
//!
//! Example
//! ```rust
//! use efficient_frontier::datastructures::FrontierConfig;
//! use efficient_frontier::frontier;
//! use efficient_frontier::scripted::ScriptedFactory;
//! # use anyhow::Result;
//!
//! fn example() -> Result<()> {
//!     let config = FrontierConfig {
//!         model_dir: "models/qpmv".into(),
//!         num_workers: 4,
//!         num_steps: 20,
//!     };
//!     let factory = ScriptedFactory::new(&[("bond", 2.0), ("tech", 4.0)], 1.0);
//!     let points = frontier::compute_frontier(&config, factory)?;
//!     for point in points {
//!         println!("{}  {}", point.ret, point.variance);
//!     }
//!     Ok(())
//! }
//! ```

/// Shared frontier state, calibration results and CLI argument structs.
pub mod datastructures;

/// Frontier workers, calibration and the parallel/sequential drivers.
pub mod frontier;

/// A deterministic in-process modeling engine for demos and tests.
pub mod scripted;

/// The capability interface of the external modeling engine.
pub mod session;

#[cfg(test)]
mod test_utils;
