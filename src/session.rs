use std::path::Path;

use polars::prelude::DataFrame;
use thiserror::Error;

/// Errors surfaced by the external modeling engine.
///
/// None of these are retried anywhere in this crate: a failing solve aborts
/// the whole batch, attributed to the frontier step it belonged to.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A model, script or table could not be read.
    #[error("failed to read {path}: {message}")]
    Read {
        /// Path or table name the engine was asked to read.
        path: String,
        /// Engine-reported reason.
        message: String,
    },
    /// The session was asked about an entity the loaded model does not have.
    #[error("model has no entity named {0:?}")]
    UnknownEntity(String),
    /// The problem has no feasible solution for the current bindings.
    #[error("problem is infeasible for target return {target}")]
    Infeasible {
        /// The bound target return, NaN when none was bound.
        target: f64,
    },
    /// The solver backend failed or was driven in an invalid order.
    #[error("solver backend failure: {0}")]
    Backend(String),
}

/// Engine options applied once per session, before the model is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    /// Start every solve from a clean initial guess.
    pub reset_initial_guesses: bool,
    /// Stream per-entity solution statuses back from the engine.
    pub send_statuses: bool,
    /// Solver backend to select.
    pub solver: String,
    /// Thread-count hint passed through to the backend.
    pub solver_threads: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            reset_initial_guesses: true,
            send_statuses: false,
            solver: "cplex".to_string(),
            solver_threads: 12,
        }
    }
}

/// One session of the external modeling engine.
///
/// The trait is the narrow slice of the engine API the frontier sweep
/// consumes. A session holds a loaded model plus solver state and must never
/// be shared across threads; every worker spawns its own through a
/// [`SessionFactory`].
pub trait ModelingSession {
    /// Applies engine options. Called once, before the model is read.
    fn configure(&mut self, options: &SessionOptions) -> Result<(), SessionError>;

    /// Reads the model definition.
    fn read_model(&mut self, path: &Path) -> Result<(), SessionError>;

    /// Reads an associated script.
    fn read_script(&mut self, path: &Path) -> Result<(), SessionError>;

    /// Binds a string parameter, e.g. the data directory.
    fn set_string_parameter(&mut self, name: &str, value: &str) -> Result<(), SessionError>;

    /// Loads an external data table declared by the script.
    fn read_table(&mut self, name: &str) -> Result<(), SessionError>;

    /// Binds a scalar parameter.
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), SessionError>;

    /// The values table of an indexed parameter, one column per field.
    fn parameter_values(&self, name: &str) -> Result<DataFrame, SessionError>;

    /// Current value of a model variable.
    fn variable_value(&self, name: &str) -> Result<f64, SessionError>;

    /// Current value of an objective.
    fn objective_value(&self, name: &str) -> Result<f64, SessionError>;

    /// Toggles continuous relaxation of the integer variables.
    fn set_relaxation(&mut self, relax: bool) -> Result<(), SessionError>;

    /// Runs the selected solver on the loaded model. Blocking; may take
    /// arbitrary wall-clock time.
    fn solve(&mut self) -> Result<(), SessionError>;

    /// Sends an ad hoc statement to the engine, used for set manipulation.
    fn eval(&mut self, statement: &str) -> Result<(), SessionError>;
}

/// Spawns independent engine sessions, one per worker.
pub trait SessionFactory {
    /// The session type this factory produces.
    type Session: ModelingSession;

    /// Establishes a fresh session with no model loaded.
    fn spawn_session(&self) -> Result<Self::Session, SessionError>;
}
