//! Orchestrator - Monte Carlo run and trial loop
//!
//! - `engine`: validates a scenario and runs all trials on a worker pool
//! - `trial`: the per-trial state machine and tick loop
//! - `metrics`: per-tick metric snapshots
//! - `report`: serializable run envelope with config hashing
//! - `cancel`: cooperative stop signal

pub mod cancel;
pub mod engine;
pub mod metrics;
pub mod report;
pub mod trial;

pub use cancel::CancellationToken;
pub use engine::{run, MonteCarloEngine, SimulationError};
pub use metrics::{Metric, TickMetrics};
pub use report::{compute_config_hash, RunReport};
pub use trial::{AbortReason, Trial, TrialOutcome, TrialRecord, TrialStateError, TrialStatus};
