//! Gig Economy Simulator Core - Rust Engine
//!
//! Monte Carlo simulation of freelancer-client contracting under
//! alternative compliance regimes, with deterministic execution.
//!
//! # Architecture
//!
//! - **scenario**: Configuration, validation and regulatory variants
//! - **distributions**: Attribute distributions for population generation
//! - **models**: Domain types (Agent, Contract, Population, Network)
//! - **policy**: Agent behavior policies (one action per agent per tick)
//! - **orchestrator**: Monte Carlo engine and per-trial tick loop
//! - **aggregate**: Cross-trial summary statistics
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. All money values are i64 (cents)
//! 2. All randomness is deterministic (seeded RNG, one stream per trial)
//! 3. Every contract joins two active agents of opposite roles
//! 4. FFI boundary is minimal and safe

// Module declarations
pub mod aggregate;
pub mod distributions;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod rng;
pub mod scenario;

// Re-exports for convenience
pub use aggregate::{summarize, AggregateResult, AggregationError, ConfidenceInterval, TickSummary};
pub use distributions::AttributeDistribution;
pub use models::{
    Agent, AgentId, AttributeValue, ComplianceStatus, Contract, NetworkError, NetworkRule, Population,
    RelationshipNetwork, Role,
};
pub use orchestrator::{
    run, AbortReason, CancellationToken, Metric, MonteCarloEngine, RunReport, SimulationError,
    TickMetrics, TrialOutcome, TrialRecord, TrialStatus,
};
pub use policy::{Action, BehaviorPolicy, PolicyConfig};
pub use rng::RngManager;
pub use scenario::{ConfigurationError, RegulatoryVariant, ScenarioConfig};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn gig_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(ffi::run_scenario, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::summarize_report, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::validate_scenario, m)?)?;
    Ok(())
}
