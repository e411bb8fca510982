//! Monte Carlo engine
//!
//! Runs `num_trials` independent trials of one validated scenario and
//! returns their records in trial-index order.
//!
//! # Architecture
//!
//! ```text
//! run(config):
//! 1. Validate the configuration once (fails fast, nothing runs)
//! 2. Build the behavior policy
//! 3. Build a thread pool bounded by max_concurrency
//! 4. For each trial index i (in parallel):
//!      seed = base_seed XOR i
//!      Trial::new(i).run(cancel)  -> TrialRecord
//! 5. Collect records ordered by trial index
//! ```
//!
//! Trials share nothing mutable: each owns its population, network and
//! random stream, so the records do not depend on the number of workers.
//!
//! # Example
//!
//! ```rust
//! use gig_simulator_core_rs::orchestrator::MonteCarloEngine;
//! use gig_simulator_core_rs::policy::PolicyConfig;
//! use gig_simulator_core_rs::scenario::{PopulationConfig, ScenarioConfig};
//!
//! let config = ScenarioConfig {
//!     seed: 42,
//!     num_trials: 4,
//!     ticks_per_trial: 3,
//!     population: PopulationConfig {
//!         population_size: 12,
//!         ..PopulationConfig::default()
//!     },
//!     policy: PolicyConfig::NoAction,
//!     ..ScenarioConfig::default()
//! };
//!
//! let engine = MonteCarloEngine::new(config).unwrap();
//! let records = engine.run();
//! assert_eq!(records.len(), 4);
//! assert!(records.iter().all(|r| r.is_completed() && r.ticks.len() == 3));
//! ```

use crate::aggregate::AggregationError;
use crate::models::network::NetworkError;
use crate::orchestrator::cancel::CancellationToken;
use crate::orchestrator::trial::{Trial, TrialRecord};
use crate::policy::BehaviorPolicy;
use crate::scenario::{ConfigurationError, ResolvedScenario, ScenarioConfig};
use rayon::prelude::*;
use std::sync::Arc;
use thiserror::Error;

/// Top-level error for callers that drive a whole run
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Config mismatch: expected {expected}, got {actual}")]
    ConfigMismatch { expected: String, actual: String },
}

/// Runs every trial of one scenario
pub struct MonteCarloEngine {
    scenario: ResolvedScenario,
    policy: Arc<dyn BehaviorPolicy>,
}

impl MonteCarloEngine {
    /// Validate `config` and build its configured policy
    ///
    /// # Errors
    /// Any [`ConfigurationError`] from validation; no trial runs.
    pub fn new(config: ScenarioConfig) -> Result<Self, ConfigurationError> {
        let scenario = config.validate()?;
        let policy = scenario.config().policy.build();
        Ok(Self { scenario, policy })
    }

    /// Validate `config` but use a caller-supplied policy
    pub fn with_policy(
        config: ScenarioConfig,
        policy: Arc<dyn BehaviorPolicy>,
    ) -> Result<Self, ConfigurationError> {
        let scenario = config.validate()?;
        Ok(Self { scenario, policy })
    }

    pub fn scenario(&self) -> &ResolvedScenario {
        &self.scenario
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Run all trials to a terminal state
    pub fn run(&self) -> Vec<TrialRecord> {
        self.run_with_cancellation(&CancellationToken::new())
    }

    /// Run all trials, stopping cooperatively once `cancel` is set
    ///
    /// Trials still running (or not yet started) when the token is set are
    /// recorded as `Aborted` with reason `cancelled`; none are dropped.
    pub fn run_with_cancellation(&self, cancel: &CancellationToken) -> Vec<TrialRecord> {
        let config = self.scenario.config();
        tracing::info!(
            trials = config.num_trials,
            ticks = config.ticks_per_trial,
            population = config.population.population_size,
            variant = %self.scenario.rules().variant,
            policy = self.policy.name(),
            seed = config.seed,
            "starting monte carlo run"
        );

        let records = match self.build_pool() {
            Ok(pool) => pool.install(|| {
                (0..config.num_trials)
                    .into_par_iter()
                    .map(|index| self.run_trial(index, cancel))
                    .collect::<Vec<_>>()
            }),
            Err(e) => {
                tracing::warn!("thread pool unavailable ({}), running trials sequentially", e);
                (0..config.num_trials)
                    .map(|index| self.run_trial(index, cancel))
                    .collect()
            }
        };

        let completed = records.iter().filter(|r| r.is_completed()).count();
        tracing::info!(
            completed,
            aborted = records.len() - completed,
            "monte carlo run finished"
        );
        records
    }

    fn run_trial(&self, index: usize, cancel: &CancellationToken) -> TrialRecord {
        let record = Trial::new(index, &self.scenario, self.policy.as_ref()).run(cancel);
        tracing::debug!(
            trial = index,
            seed = record.seed,
            ticks = record.ticks.len(),
            completed = record.is_completed(),
            "trial finished"
        );
        record
    }

    fn build_pool(&self) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        let max_concurrency = self.scenario.config().max_concurrency;
        if max_concurrency > 0 {
            builder = builder.num_threads(max_concurrency);
        }
        builder.build()
    }
}

/// Validate `config` and run every trial with its configured policy
pub fn run(config: ScenarioConfig) -> Result<Vec<TrialRecord>, ConfigurationError> {
    Ok(MonteCarloEngine::new(config)?.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::trial::{AbortReason, TrialOutcome};
    use crate::policy::PolicyConfig;
    use crate::scenario::PopulationConfig;

    fn config() -> ScenarioConfig {
        ScenarioConfig {
            seed: 42,
            num_trials: 6,
            ticks_per_trial: 8,
            population: PopulationConfig {
                population_size: 30,
                ..PopulationConfig::default()
            },
            ..ScenarioConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_fails_before_running() {
        let bad = ScenarioConfig {
            regulatory_variant: "ab5".to_string(),
            ..config()
        };
        assert!(matches!(
            MonteCarloEngine::new(bad),
            Err(ConfigurationError::UnknownRegulatoryVariant(_))
        ));
    }

    #[test]
    fn test_records_in_index_order() {
        let records = MonteCarloEngine::new(config()).unwrap().run();
        let indices: Vec<usize> = records.iter().map(|r| r.trial_index).collect();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());
        for record in &records {
            assert_eq!(record.seed, 42 ^ record.trial_index as u64);
        }
    }

    #[test]
    fn test_cancelled_run_reports_every_trial() {
        let token = CancellationToken::new();
        token.cancel();
        let records = MonteCarloEngine::new(config())
            .unwrap()
            .run_with_cancellation(&token);

        assert_eq!(records.len(), 6);
        for record in records {
            assert_eq!(
                record.outcome,
                TrialOutcome::Aborted {
                    reason: AbortReason::Cancelled,
                    at_tick: 0
                }
            );
        }
    }

    #[test]
    fn test_policy_name() {
        let engine = MonteCarloEngine::new(ScenarioConfig {
            policy: PolicyConfig::NoAction,
            ..config()
        })
        .unwrap();
        assert_eq!(engine.policy_name(), "no_action");
    }
}
