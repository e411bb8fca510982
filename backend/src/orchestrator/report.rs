//! Run report - persistence envelope for a finished run
//!
//! Bundles the scenario configuration, its hash and every trial record into
//! one serializable value. The core does not write files; callers persist
//! the JSON however they like.
//!
//! # Critical Invariants
//!
//! - **Config Matching**: `config_hash` is the SHA-256 of the canonical
//!   (key-sorted) JSON of `config`; a report only verifies against the
//!   configuration that produced it
//! - **Counts**: `completed + aborted == trials.len()`

use crate::aggregate::{summarize, AggregateResult};
use crate::orchestrator::engine::SimulationError;
use crate::orchestrator::trial::TrialRecord;
use crate::scenario::ScenarioConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Everything produced by one Monte Carlo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Random identifier of this run (not part of the deterministic output)
    pub run_id: String,

    pub config_hash: String,

    pub config: ScenarioConfig,

    pub trials: Vec<TrialRecord>,

    pub completed: usize,

    pub aborted: usize,

    /// Aborted trial count per reason code
    pub abort_reasons: BTreeMap<String, usize>,
}

impl RunReport {
    pub fn new(config: ScenarioConfig, trials: Vec<TrialRecord>) -> Result<Self, SimulationError> {
        let config_hash = compute_config_hash(&config)?;

        let mut abort_reasons: BTreeMap<String, usize> = BTreeMap::new();
        for reason in trials.iter().filter_map(TrialRecord::abort_reason) {
            *abort_reasons.entry(reason.code().to_string()).or_default() += 1;
        }
        let aborted = abort_reasons.values().sum();

        Ok(Self {
            run_id: Uuid::new_v4().to_string(),
            config_hash,
            completed: trials.len() - aborted,
            aborted,
            abort_reasons,
            config,
            trials,
        })
    }

    pub fn to_json(&self) -> Result<String, SimulationError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SimulationError::Serialization(format!("Report serialization failed: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json)
            .map_err(|e| SimulationError::Serialization(format!("Report deserialization failed: {}", e)))
    }

    /// Check that this report was produced from `config`
    pub fn verify_config(&self, config: &ScenarioConfig) -> Result<(), SimulationError> {
        let actual = compute_config_hash(config)?;
        if actual != self.config_hash {
            return Err(SimulationError::ConfigMismatch {
                expected: self.config_hash.clone(),
                actual,
            });
        }
        Ok(())
    }

    /// Aggregate the report's trial records
    pub fn summarize(&self, confidence_level: f64) -> Result<AggregateResult, SimulationError> {
        Ok(summarize(&self.trials, confidence_level)?)
    }
}

/// SHA-256 of the config's canonical JSON, hex encoded
///
/// Going through `serde_json::Value` sorts object keys (its map is a
/// `BTreeMap`), so field declaration order never changes the hash.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    let canonical = serde_json::to_value(config)
        .and_then(|value| serde_json::to_vec(&value))
        .map_err(|e| SimulationError::Serialization(format!("Config hashing failed: {}", e)))?;
    Ok(format!("{:x}", Sha256::digest(&canonical)))
}
