use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{ensure, Context, Result};
use itertools::Itertools;
use polars::prelude::*;

use crate::session::{ModelingSession, SessionError, SessionFactory, SessionOptions};

/// Tables the qpmv script declares; reading anything else is a model error.
const KNOWN_TABLES: [&str; 2] = ["assetstable", "astrets"];

/// What a scripted session was asked to do, in call order.
///
/// The factory keeps one log across all of its sessions so tests can assert
/// on the statement and solve sequence of a whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The model definition was read into a session.
    ModelRead,
    /// An ad hoc statement was evaluated.
    Statement(String),
    /// A solve ran, with the relaxation flag and the bound target return.
    Solve {
        /// Whether integrality was relaxed for this solve.
        relaxed: bool,
        /// The bound target return, `None` during calibration.
        target: Option<f64>,
    },
}

/// The response surface of the scripted engine.
#[derive(Debug, Clone)]
struct ScriptedModel {
    assets: Vec<(String, f64)>,
    base_return: f64,
    base_variance: f64,
    risk_curvature: f64,
    integrality_gap: f64,
    fail_for_target: Option<f64>,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self {
            assets: Vec::new(),
            base_return: 0.0,
            base_variance: 0.018,
            risk_curvature: 0.35,
            integrality_gap: 0.002,
            fail_for_target: None,
        }
    }
}

impl ScriptedModel {
    fn variance_at(&self, target: Option<f64>, relaxed: bool) -> f64 {
        let spread = target.map_or(0.0, |t| t - self.base_return);
        let full = self.base_variance + self.risk_curvature * spread * spread;
        if relaxed {
            full - self.integrality_gap
        } else {
            full
        }
    }
}

/// Spawns [`ScriptedSession`]s that all answer from the same scripted model.
///
/// This is the stand-in for an external modeling-engine binding: responses
/// are deterministic functions of the bound target return, not the output of
/// any solver. It keeps the executables runnable end to end and gives the
/// tests a fake with failure injection.
#[derive(Debug, Clone)]
pub struct ScriptedFactory {
    model: Arc<ScriptedModel>,
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl ScriptedFactory {
    /// A factory answering for the given `(asset, average return)` pairs,
    /// with `base_return` as the unconstrained relaxed portfolio return.
    pub fn new(asset_returns: &[(&str, f64)], base_return: f64) -> Self {
        let assets = asset_returns
            .iter()
            .map(|(name, ret)| ((*name).to_string(), *ret))
            .collect_vec();
        Self::with_model(ScriptedModel {
            assets,
            base_return,
            ..ScriptedModel::default()
        })
    }

    /// Seeds a factory from `astrets.csv` in the model directory, expecting
    /// `asset` and `averret` columns. The unconstrained return is taken as
    /// the mean average return.
    pub fn from_model_dir(dir: &Path) -> Result<Self> {
        let path = dir.join("astrets.csv");
        let df = CsvReader::from_path(&path)
            .with_context(|| format!("missing asset table {}", path.display()))?
            .has_header(true)
            .finish()
            .with_context(|| format!("malformed asset table {}", path.display()))?;
        let names = df.column("asset")?.utf8()?;
        let rets = df.column("averret")?.f64()?;
        let assets = names
            .into_iter()
            .zip(rets.into_iter())
            .filter_map(|(name, ret)| Some((name?.to_string(), ret?)))
            .collect_vec();
        ensure!(!assets.is_empty(), "asset table {} is empty", path.display());
        let base_return = rets.mean().unwrap_or(0.0);
        Ok(Self::with_model(ScriptedModel {
            assets,
            base_return,
            ..ScriptedModel::default()
        }))
    }

    fn with_model(model: ScriptedModel) -> Self {
        Self {
            model: Arc::new(model),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Makes every solve with this target return report infeasibility.
    pub fn fail_for_target(mut self, target: f64) -> Self {
        let mut model = (*self.model).clone();
        model.fail_for_target = Some(target);
        self.model = Arc::new(model);
        self
    }

    /// Snapshot of the event log across all sessions of this factory.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().expect("event log lock poisoned").clone()
    }

    fn push(&self, event: EngineEvent) {
        self.events
            .lock()
            .expect("event log lock poisoned")
            .push(event);
    }
}

impl SessionFactory for ScriptedFactory {
    type Session = ScriptedSession;

    fn spawn_session(&self) -> Result<Self::Session, SessionError> {
        Ok(ScriptedSession {
            factory: self.clone(),
            options: None,
            model_path: None,
            script_read: false,
            tables_read: Vec::new(),
            string_params: HashMap::new(),
            target_return: None,
            relaxed: false,
            solved: false,
        })
    }
}

/// One scripted engine session. Answers are pure functions of the bound
/// target return; the session only tracks enough state to reject calls a
/// real engine would reject (reads before configuration, queries before a
/// solve, unknown entity names).
pub struct ScriptedSession {
    factory: ScriptedFactory,
    options: Option<SessionOptions>,
    model_path: Option<PathBuf>,
    script_read: bool,
    tables_read: Vec<String>,
    string_params: HashMap<String, String>,
    target_return: Option<f64>,
    relaxed: bool,
    solved: bool,
}

impl ScriptedSession {
    fn model(&self) -> &ScriptedModel {
        &self.factory.model
    }

    fn require_loaded(&self) -> Result<(), SessionError> {
        if self.model_path.is_none() || !self.script_read {
            return Err(SessionError::Backend(
                "model and script must be read before this call".to_string(),
            ));
        }
        Ok(())
    }

    fn require_solved(&self) -> Result<(), SessionError> {
        if !self.solved {
            return Err(SessionError::Backend(
                "no solution available, solve first".to_string(),
            ));
        }
        Ok(())
    }
}

impl ModelingSession for ScriptedSession {
    fn configure(&mut self, options: &SessionOptions) -> Result<(), SessionError> {
        if self.model_path.is_some() {
            return Err(SessionError::Backend(
                "options must be set before the model is read".to_string(),
            ));
        }
        self.options = Some(options.clone());
        Ok(())
    }

    fn read_model(&mut self, path: &Path) -> Result<(), SessionError> {
        if self.options.is_none() {
            return Err(SessionError::Backend(
                "session is not configured".to_string(),
            ));
        }
        self.model_path = Some(path.to_path_buf());
        self.factory.push(EngineEvent::ModelRead);
        Ok(())
    }

    fn read_script(&mut self, path: &Path) -> Result<(), SessionError> {
        if self.model_path.is_none() {
            return Err(SessionError::Read {
                path: path.display().to_string(),
                message: "script read before the model".to_string(),
            });
        }
        self.script_read = true;
        Ok(())
    }

    fn set_string_parameter(&mut self, name: &str, value: &str) -> Result<(), SessionError> {
        if name != "data_dir" {
            return Err(SessionError::UnknownEntity(name.to_string()));
        }
        self.require_loaded()?;
        self.string_params.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn read_table(&mut self, name: &str) -> Result<(), SessionError> {
        self.require_loaded()?;
        // The script resolves table files against the bound data directory.
        if !self.string_params.contains_key("data_dir") {
            return Err(SessionError::Read {
                path: name.to_string(),
                message: "data_dir is not bound".to_string(),
            });
        }
        if !KNOWN_TABLES.contains(&name) {
            return Err(SessionError::UnknownEntity(name.to_string()));
        }
        if !self.tables_read.iter().any(|t| t == name) {
            self.tables_read.push(name.to_string());
        }
        Ok(())
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), SessionError> {
        if name != "targetret" {
            return Err(SessionError::UnknownEntity(name.to_string()));
        }
        self.require_loaded()?;
        self.target_return = Some(value);
        // A new target invalidates the previous solution.
        self.solved = false;
        Ok(())
    }

    fn parameter_values(&self, name: &str) -> Result<DataFrame, SessionError> {
        if name != "averret" {
            return Err(SessionError::UnknownEntity(name.to_string()));
        }
        self.require_loaded()?;
        let (assets, averret): (Vec<String>, Vec<f64>) =
            self.model().assets.iter().cloned().unzip();
        df! {
            "assets" => assets,
            "averret" => averret
        }
        .map_err(|e| SessionError::Backend(e.to_string()))
    }

    fn variable_value(&self, name: &str) -> Result<f64, SessionError> {
        if name != "portret" {
            return Err(SessionError::UnknownEntity(name.to_string()));
        }
        self.require_solved()?;
        Ok(self
            .target_return
            .unwrap_or(self.model().base_return))
    }

    fn objective_value(&self, name: &str) -> Result<f64, SessionError> {
        if name != "cst" {
            return Err(SessionError::UnknownEntity(name.to_string()));
        }
        self.require_solved()?;
        Ok(self.model().variance_at(self.target_return, self.relaxed))
    }

    fn set_relaxation(&mut self, relax: bool) -> Result<(), SessionError> {
        self.relaxed = relax;
        Ok(())
    }

    fn solve(&mut self) -> Result<(), SessionError> {
        self.require_loaded()?;
        if self.tables_read.len() != KNOWN_TABLES.len() {
            return Err(SessionError::Backend(
                "data tables are not loaded".to_string(),
            ));
        }
        self.factory.push(EngineEvent::Solve {
            relaxed: self.relaxed,
            target: self.target_return,
        });
        if let (Some(fail), Some(target)) = (self.model().fail_for_target, self.target_return) {
            if (fail - target).abs() < 1e-9 {
                return Err(SessionError::Infeasible { target });
            }
        }
        self.solved = true;
        Ok(())
    }

    fn eval(&mut self, statement: &str) -> Result<(), SessionError> {
        self.require_loaded()?;
        self.factory
            .push(EngineEvent::Statement(statement.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests;
