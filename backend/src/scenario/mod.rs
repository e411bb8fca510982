//! Scenario configuration and regulatory variants
//!
//! Everything a run needs to know up front: population and network shape,
//! economic parameters, the regulatory regime and the behaviour policy.

pub mod config;
pub mod regulatory;

pub use config::{
    ConfigurationError, ConvergenceConfig, EconomicParameters, PopulationConfig,
    ResolvedScenario, ScenarioConfig, MAX_CONTRACT_DURATION, MAX_MONEY_CENTS,
};
pub use regulatory::{RegulatoryRules, RegulatoryVariant};
