//! Scenario configuration
//!
//! A [`ScenarioConfig`] is a plain serializable value. It is checked exactly
//! once, by [`ScenarioConfig::validate`], before any trial starts; the engine
//! only ever runs the resulting [`ResolvedScenario`].

use super::regulatory::{RegulatoryRules, RegulatoryVariant};
use crate::distributions::{AttributeDistribution, WeightedChoice};
use crate::models::network::NetworkRule;
use crate::policy::PolicyConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Largest accepted money parameter, in cents
///
/// Keeps per-tick sums over every contract of a large population well inside
/// `i64`.
pub const MAX_MONEY_CENTS: i64 = 1 << 40;

/// Largest accepted mean contract duration, in ticks
pub const MAX_CONTRACT_DURATION: usize = 1 << 20;

/// Invalid or missing scenario parameters
///
/// Always raised before any simulation work starts.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("Population size must be > 0")]
    EmptyPopulation,

    #[error("Invalid parameter '{field}': {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Attribute '{attribute}' references unknown distribution '{distribution}'")]
    UnknownDistribution {
        attribute: String,
        distribution: String,
    },

    #[error("Invalid distribution '{name}': {reason}")]
    InvalidDistribution { name: String, reason: String },

    #[error("Unknown regulatory variant '{0}'")]
    UnknownRegulatoryVariant(String),
}

impl ConfigurationError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidParameter {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Population size, role split and attribute sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Total number of agents
    pub population_size: usize,

    /// Fraction of agents that are clients (rounded to nearest agent)
    pub client_share: f64,

    /// Freelancer attribute name → distribution name
    pub freelancer_attributes: BTreeMap<String, String>,

    /// Client attribute name → distribution name
    pub client_attributes: BTreeMap<String, String>,

    /// Named distributions referenced by the attribute maps
    pub distributions: BTreeMap<String, AttributeDistribution>,
}

impl PopulationConfig {
    /// Number of clients implied by `population_size` and `client_share`
    pub fn num_clients(&self) -> usize {
        let clients = (self.population_size as f64 * self.client_share).round() as usize;
        clients.min(self.population_size)
    }

    pub fn num_freelancers(&self) -> usize {
        self.population_size - self.num_clients()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.population_size == 0 {
            return Err(ConfigurationError::EmptyPopulation);
        }
        if !(0.0..=1.0).contains(&self.client_share) {
            return Err(ConfigurationError::invalid(
                "population.client_share",
                "must lie in [0, 1]",
            ));
        }

        for (name, dist) in &self.distributions {
            dist.validate(name)?;
        }

        for (attribute, distribution) in self
            .freelancer_attributes
            .iter()
            .chain(self.client_attributes.iter())
        {
            if !self.distributions.contains_key(distribution) {
                return Err(ConfigurationError::UnknownDistribution {
                    attribute: attribute.clone(),
                    distribution: distribution.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        let unit_scale = AttributeDistribution::Beta {
            alpha: 2.0,
            beta: 2.0,
        };

        let distributions: BTreeMap<String, AttributeDistribution> = [
            ("unit_scale", unit_scale),
            (
                "low_scale",
                AttributeDistribution::Beta {
                    alpha: 2.0,
                    beta: 5.0,
                },
            ),
            (
                "hourly_rate",
                AttributeDistribution::Clamped {
                    base: Box::new(AttributeDistribution::LogNormal {
                        mean: 3.9,
                        std_dev: 0.4,
                    }),
                    min: 15.0,
                    max: 400.0,
                },
            ),
            (
                "monthly_budget",
                AttributeDistribution::Uniform {
                    min: 200_000.0,
                    max: 2_000_000.0,
                },
            ),
            ("awareness", AttributeDistribution::Bernoulli { p: 0.4 }),
            (
                "freelancer_type",
                categorical(&[
                    ("independent_contractor", 0.35),
                    ("gig_worker", 0.25),
                    ("consultant", 0.15),
                    ("creative_professional", 0.15),
                    ("technical_specialist", 0.10),
                ]),
            ),
            (
                "client_type",
                categorical(&[
                    ("small_business", 0.35),
                    ("medium_enterprise", 0.20),
                    ("large_corporation", 0.10),
                    ("startup", 0.20),
                    ("non_profit", 0.10),
                    ("government", 0.05),
                ]),
            ),
        ]
        .into_iter()
        .map(|(name, dist)| (name.to_string(), dist))
        .collect();

        let freelancer_attributes = [
            ("risk_tolerance", "unit_scale"),
            ("administrative_capacity", "unit_scale"),
            ("negotiation_skill", "unit_scale"),
            ("hourly_rate", "hourly_rate"),
            ("sb988_aware", "awareness"),
            ("freelancer_type", "freelancer_type"),
        ];
        let client_attributes = [
            ("compliance_priority", "unit_scale"),
            ("legal_resources", "low_scale"),
            ("risk_aversion", "unit_scale"),
            ("budget", "monthly_budget"),
            ("client_type", "client_type"),
        ];

        Self {
            population_size: 100,
            client_share: 0.3,
            freelancer_attributes: to_map(&freelancer_attributes),
            client_attributes: to_map(&client_attributes),
            distributions,
        }
    }
}

fn categorical(choices: &[(&str, f64)]) -> AttributeDistribution {
    AttributeDistribution::Categorical {
        choices: choices
            .iter()
            .map(|(label, weight)| WeightedChoice {
                label: label.to_string(),
                weight: *weight,
            })
            .collect(),
    }
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Pluggable economic and enforcement parameters
///
/// All monetary values in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomicParameters {
    /// Reference contract value per tick at tick 0
    pub base_contract_value: i64,

    /// Relative spread of initial contract values (std-dev / mean)
    pub contract_value_spread: f64,

    /// Expected contract length in ticks; `None` (the default) makes new
    /// contracts open-ended
    pub mean_contract_duration: Option<usize>,

    /// Administrative cost per compliant contract per tick under regulation
    pub admin_cost_per_contract: i64,

    /// Penalty per failed audit
    pub penalty_per_violation: i64,

    /// Per-tick audit probability for non-compliant contracts, in [0, 1]
    pub enforcement_level: f64,

    /// Contract age before audits apply
    pub grace_period_ticks: usize,

    /// Tick at which regulation takes effect
    pub enforcement_start_tick: usize,

    /// Probability an interested agent actually proposes a contract
    pub contract_formation_rate: f64,

    /// Probability an agent meets a new potential counterparty in a tick
    pub interaction_probability: f64,

    /// Relative step applied when renegotiating terms
    pub renegotiation_step: f64,

    /// Per-tick growth of the reference contract value
    pub inflation_per_tick: f64,

    /// Relative noise on proposed contract values
    pub market_volatility: f64,
}

impl Default for EconomicParameters {
    fn default() -> Self {
        Self {
            base_contract_value: 40_000,
            contract_value_spread: 0.25,
            mean_contract_duration: None,
            admin_cost_per_contract: 1_500,
            penalty_per_violation: 250_000,
            enforcement_level: 0.1,
            grace_period_ticks: 3,
            enforcement_start_tick: 0,
            contract_formation_rate: 0.3,
            interaction_probability: 0.2,
            renegotiation_step: 0.05,
            inflation_per_tick: 0.0025,
            market_volatility: 0.1,
        }
    }
}

impl EconomicParameters {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.base_contract_value <= 0 {
            return Err(ConfigurationError::invalid(
                "economics.base_contract_value",
                "must be > 0",
            ));
        }
        if let Some(mean) = self.mean_contract_duration {
            if mean == 0 || mean > MAX_CONTRACT_DURATION {
                return Err(ConfigurationError::invalid(
                    "economics.mean_contract_duration",
                    format!("must lie in [1, {}]", MAX_CONTRACT_DURATION),
                ));
            }
        }
        if self.admin_cost_per_contract < 0 || self.penalty_per_violation < 0 {
            return Err(ConfigurationError::invalid(
                "economics",
                "costs and penalties must be non-negative",
            ));
        }

        let amounts = [
            ("economics.base_contract_value", self.base_contract_value),
            ("economics.admin_cost_per_contract", self.admin_cost_per_contract),
            ("economics.penalty_per_violation", self.penalty_per_violation),
        ];
        for (field, amount) in amounts {
            if amount > MAX_MONEY_CENTS {
                return Err(ConfigurationError::invalid(
                    field,
                    format!("must be at most {} cents", MAX_MONEY_CENTS),
                ));
            }
        }

        let probabilities = [
            ("economics.enforcement_level", self.enforcement_level),
            ("economics.contract_formation_rate", self.contract_formation_rate),
            ("economics.interaction_probability", self.interaction_probability),
        ];
        for (field, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigurationError::invalid(field, "must lie in [0, 1]"));
            }
        }

        let rates = [
            ("economics.contract_value_spread", self.contract_value_spread),
            ("economics.renegotiation_step", self.renegotiation_step),
            ("economics.inflation_per_tick", self.inflation_per_tick),
            ("economics.market_volatility", self.market_volatility),
        ];
        for (field, r) in rates {
            if !r.is_finite() || r < 0.0 {
                return Err(ConfigurationError::invalid(
                    field,
                    "must be finite and non-negative",
                ));
            }
        }
        Ok(())
    }

    /// Reference contract value per tick at `tick`, after inflation
    pub fn reference_value(&self, tick: usize) -> f64 {
        self.base_contract_value as f64 * (1.0 + self.inflation_per_tick).powi(tick as i32)
    }
}

/// Steady-state diagnostic on the per-tick compliance rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Trailing window length in ticks
    pub window: usize,

    /// Variance below which the window counts as converged
    pub threshold: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            window: 10,
            threshold: 0.001,
        }
    }
}

/// Complete scenario configuration
///
/// # Example
///
/// ```
/// use gig_simulator_core_rs::scenario::ScenarioConfig;
///
/// let config = ScenarioConfig {
///     seed: 42,
///     num_trials: 10,
///     ticks_per_trial: 5,
///     ..ScenarioConfig::default()
/// };
/// let scenario = config.validate().unwrap();
/// assert_eq!(scenario.rules().variant.as_str(), "sb988");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Base seed; trial `i` runs with `seed ^ i`
    pub seed: u64,

    pub num_trials: usize,

    pub ticks_per_trial: usize,

    pub population: PopulationConfig,

    /// Rule for wiring the starting contract network
    pub network: NetworkRule,

    /// Regulatory variant identifier (see [`RegulatoryVariant`])
    pub regulatory_variant: String,

    pub economics: EconomicParameters,

    pub policy: PolicyConfig,

    /// Worker threads for parallel trials (0 = one per core)
    pub max_concurrency: usize,

    pub convergence: ConvergenceConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            num_trials: 100,
            ticks_per_trial: 52,
            population: PopulationConfig::default(),
            network: NetworkRule::PreferentialAttachment {
                contracts_per_freelancer: 1,
            },
            regulatory_variant: RegulatoryVariant::Sb988.as_str().to_string(),
            economics: EconomicParameters::default(),
            policy: PolicyConfig::default(),
            max_concurrency: 0,
            convergence: ConvergenceConfig::default(),
        }
    }
}

impl ScenarioConfig {
    /// Validate every parameter and resolve the regulatory variant
    pub fn validate(&self) -> Result<ResolvedScenario, ConfigurationError> {
        if self.num_trials == 0 {
            return Err(ConfigurationError::invalid("num_trials", "must be > 0"));
        }
        if self.ticks_per_trial == 0 {
            return Err(ConfigurationError::invalid("ticks_per_trial", "must be > 0"));
        }
        if self.convergence.window < 2 {
            return Err(ConfigurationError::invalid(
                "convergence.window",
                "must be >= 2",
            ));
        }
        if !self.convergence.threshold.is_finite() || self.convergence.threshold < 0.0 {
            return Err(ConfigurationError::invalid(
                "convergence.threshold",
                "must be finite and non-negative",
            ));
        }

        self.population.validate()?;
        self.network.validate()?;
        self.economics.validate()?;
        self.policy.validate()?;

        let variant: RegulatoryVariant = self.regulatory_variant.parse()?;
        let rules = RegulatoryRules::resolve(variant, &self.economics);

        Ok(ResolvedScenario {
            config: self.clone(),
            rules,
        })
    }
}

/// A validated scenario with its regulatory rules resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScenario {
    config: ScenarioConfig,
    rules: RegulatoryRules,
}

impl ResolvedScenario {
    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn rules(&self) -> &RegulatoryRules {
        &self.rules
    }

    pub fn economics(&self) -> &EconomicParameters {
        &self.config.economics
    }
}
