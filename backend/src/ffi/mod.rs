//! Python bindings
//!
//! JSON in, JSON out: configurations and reports cross the boundary as
//! strings, so Python only needs `json.dumps` / `json.loads`. The GIL is
//! released while trials run.
//!
//! ```python
//! import json
//! from gig_simulator_core_rs import run_scenario, summarize_report
//!
//! report = run_scenario(json.dumps({"seed": 42, "num_trials": 10}))
//! summary = json.loads(summarize_report(report, 0.95))
//! print(summary["metrics"]["compliance_rate"][0]["mean"])
//! ```

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::orchestrator::{MonteCarloEngine, RunReport, SimulationError};
use crate::scenario::ScenarioConfig;

fn to_py_err(e: SimulationError) -> PyErr {
    match e {
        SimulationError::Configuration(_)
        | SimulationError::Aggregation(_)
        | SimulationError::ConfigMismatch { .. } => PyValueError::new_err(e.to_string()),
        SimulationError::Network(_) | SimulationError::Serialization(_) => {
            PyRuntimeError::new_err(e.to_string())
        }
    }
}

fn parse_config(config_json: &str) -> Result<ScenarioConfig, SimulationError> {
    serde_json::from_str(config_json)
        .map_err(|e| SimulationError::Serialization(format!("Invalid scenario JSON: {}", e)))
}

fn run_report(config_json: &str) -> Result<String, SimulationError> {
    let config = parse_config(config_json)?;
    let engine = MonteCarloEngine::new(config.clone())?;
    let trials = engine.run();
    RunReport::new(config, trials)?.to_json()
}

fn summarize_json(report_json: &str, confidence_level: f64) -> Result<String, SimulationError> {
    let aggregate = RunReport::from_json(report_json)?.summarize(confidence_level)?;
    serde_json::to_string_pretty(&aggregate)
        .map_err(|e| SimulationError::Serialization(e.to_string()))
}

/// Run every trial of a scenario and return the run report as JSON
///
/// Raises ValueError for an invalid configuration.
#[pyfunction]
pub fn run_scenario(py: Python<'_>, config_json: &str) -> PyResult<String> {
    py.allow_threads(|| run_report(config_json)).map_err(to_py_err)
}

/// Aggregate a run report (JSON) into per-metric, per-tick statistics
///
/// Raises ValueError when no trial completed.
#[pyfunction]
#[pyo3(signature = (report_json, confidence_level = 0.95))]
pub fn summarize_report(py: Python<'_>, report_json: &str, confidence_level: f64) -> PyResult<String> {
    py.allow_threads(|| summarize_json(report_json, confidence_level))
        .map_err(to_py_err)
}

/// Validate a scenario and return its canonical config hash
#[pyfunction]
pub fn validate_scenario(config_json: &str) -> PyResult<String> {
    let config = parse_config(config_json).map_err(to_py_err)?;
    config
        .validate()
        .map_err(|e| to_py_err(SimulationError::Configuration(e)))?;
    crate::orchestrator::compute_config_hash(&config).map_err(to_py_err)
}
