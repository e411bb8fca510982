//! Behavior Policy Module
//!
//! A behavior policy maps one agent's view of the market at the start of a
//! tick to a single [`Action`].
//!
//! # Overview
//!
//! Every active agent is asked once per tick, in ascending id order. All
//! answers are computed against the same frozen tick-start snapshot and only
//! applied, as one batch, after every agent has decided. A policy therefore
//! never observes another agent's decision from the same tick.
//!
//! # Policy Interface
//!
//! Policies implement [`BehaviorPolicy`]. `decide` takes `&self`: a policy
//! keeps no hidden state between calls, and any randomness it needs must
//! come from the supplied [`DrawSource`] so that trials stay reproducible.
//!
//! ```rust
//! use gig_simulator_core_rs::policy::{Action, BehaviorPolicy, LocalContext};
//! use gig_simulator_core_rs::rng::DrawSource;
//! use gig_simulator_core_rs::scenario::RegulatoryRules;
//! use gig_simulator_core_rs::Agent;
//!
//! struct QuitWhenIdle;
//!
//! impl BehaviorPolicy for QuitWhenIdle {
//!     fn name(&self) -> &'static str {
//!         "quit_when_idle"
//!     }
//!
//!     fn decide(
//!         &self,
//!         agent: &Agent,
//!         context: &LocalContext<'_>,
//!         _rules: &RegulatoryRules,
//!         _draw: &mut dyn DrawSource,
//!     ) -> Action {
//!         if context.neighbors.is_empty() && agent.state().idle_ticks > 3 {
//!             Action::ExitMarket
//!         } else {
//!             Action::NoAction
//!         }
//!     }
//! }
//! ```
//!
//! # Built-in Policies
//!
//! Selected through [`PolicyConfig`]:
//! 1. **NoAction**: never does anything (network stays frozen)
//! 2. **ComplianceAware**: weighs compliance burden against earnings and risk
//! 3. **RandomChurn**: attribute-blind random terminations and proposals

use crate::models::agent::{Agent, AgentId};
use crate::models::contract::Contract;
use crate::models::network::RelationshipNetwork;
use crate::models::population::Population;
use crate::rng::DrawSource;
use crate::scenario::{ConfigurationError, EconomicParameters, RegulatoryRules};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod compliance_aware;
pub mod no_action;
pub mod random_churn;

pub use compliance_aware::ComplianceAwarePolicy;
pub use no_action::NoActionPolicy;
pub use random_churn::RandomChurnPolicy;

/// Decision taken by one agent for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Leave everything as it is
    NoAction,

    /// Renew a contract with `counterparty` for another expected duration
    ContinueContract { counterparty: AgentId },

    /// End the contract with `counterparty` at the end of this tick
    TerminateContract { counterparty: AgentId },

    /// Change the per-tick value of the contract with `counterparty`
    ///
    /// While regulation is in force the renegotiated contract is re-papered
    /// and becomes compliant.
    RenegotiateTerms { counterparty: AgentId, new_value: i64 },

    /// Offer a new contract to a non-neighbor of the opposite role
    ProposeContract {
        counterparty: AgentId,
        value: i64,
        /// Length in ticks; `None` for an open-ended contract
        duration: Option<usize>,
    },

    /// Leave the market; all of the agent's contracts end
    ExitMarket,
}

impl Action {
    /// Agent this action is directed at, if any
    pub fn counterparty(&self) -> Option<AgentId> {
        match self {
            Action::ContinueContract { counterparty }
            | Action::TerminateContract { counterparty }
            | Action::RenegotiateTerms { counterparty, .. }
            | Action::ProposeContract { counterparty, .. } => Some(*counterparty),
            Action::NoAction | Action::ExitMarket => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::NoAction => "no_action",
            Action::ContinueContract { .. } => "continue_contract",
            Action::TerminateContract { .. } => "terminate_contract",
            Action::RenegotiateTerms { .. } => "renegotiate_terms",
            Action::ProposeContract { .. } => "propose_contract",
            Action::ExitMarket => "exit_market",
        }
    }
}

/// A current neighbor and the contract linking it to the deciding agent
#[derive(Debug, Clone, Copy)]
pub struct NeighborView<'a> {
    pub agent: &'a Agent,
    pub contract: &'a Contract,
}

/// Market-wide signals shared by every agent in a tick
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSignals {
    /// Inflation-adjusted reference contract value per tick (cents)
    pub reference_value: f64,

    pub active_contracts: usize,

    /// Mean per-tick value of active contracts (0 when there are none)
    pub average_contract_value: f64,
}

impl MarketSignals {
    pub fn observe(network: &RelationshipNetwork, economics: &EconomicParameters, tick: usize) -> Self {
        let active_contracts = network.edge_count();
        let average_contract_value = if active_contracts == 0 {
            0.0
        } else {
            network.contracts().map(|c| c.value_per_tick as f64).sum::<f64>()
                / active_contracts as f64
        };
        Self {
            reference_value: economics.reference_value(tick),
            active_contracts,
            average_contract_value,
        }
    }
}

/// Everything an agent may look at when deciding
pub struct LocalContext<'a> {
    pub tick: usize,

    /// Current neighbors, in network insertion order
    pub neighbors: Vec<NeighborView<'a>>,

    /// Potential new counterparty met this tick (active, opposite role,
    /// not already a neighbor)
    pub candidate: Option<&'a Agent>,

    pub market: &'a MarketSignals,

    pub economics: &'a EconomicParameters,
}

impl<'a> LocalContext<'a> {
    /// Assemble the context for `agent` from the tick-start snapshot
    pub fn build(
        agent: &Agent,
        tick: usize,
        population: &'a Population,
        network: &'a RelationshipNetwork,
        candidate: Option<AgentId>,
        market: &'a MarketSignals,
        economics: &'a EconomicParameters,
    ) -> Self {
        let neighbors = network
            .neighbors(agent.id())
            .iter()
            .filter_map(|id| {
                let neighbor = population.get(*id)?;
                let contract = network.contract_between(agent.id(), *id)?;
                Some(NeighborView {
                    agent: neighbor,
                    contract,
                })
            })
            .collect();

        Self {
            tick,
            neighbors,
            candidate: candidate.and_then(|id| population.get(id)),
            market,
            economics,
        }
    }

    pub fn neighbor(&self, id: AgentId) -> Option<&NeighborView<'a>> {
        self.neighbors.iter().find(|n| n.agent.id() == id)
    }

    /// Total per-tick value of the agent's current contracts (cents)
    pub fn contracted_value(&self) -> i64 {
        self.neighbors.iter().map(|n| n.contract.value_per_tick).sum()
    }
}

/// Behavior policy trait
///
/// Implementations must be deterministic given their inputs and the draw
/// stream, and must not perform I/O.
pub trait BehaviorPolicy: Send + Sync {
    /// Stable name used in logs
    fn name(&self) -> &'static str;

    /// Choose this tick's action for `agent`
    fn decide(
        &self,
        agent: &Agent,
        context: &LocalContext<'_>,
        rules: &RegulatoryRules,
        draw: &mut dyn DrawSource,
    ) -> Action;
}

/// Policy selection for a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// Always [`Action::NoAction`]
    NoAction,

    /// Compliance-aware behavioural model
    ComplianceAware {
        /// Idle ticks before an agent considers leaving the market
        exit_patience: usize,
        /// Maximum simultaneous contracts an agent seeks
        max_contracts: usize,
        /// Renegotiate when value falls below this fraction of the reference
        renegotiation_threshold: f64,
    },

    /// Attribute-blind churn baseline
    RandomChurn {
        terminate_probability: f64,
        propose_probability: f64,
    },
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig::ComplianceAware {
            exit_patience: 6,
            max_contracts: 3,
            renegotiation_threshold: 0.85,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            PolicyConfig::NoAction => Ok(()),
            PolicyConfig::ComplianceAware {
                max_contracts,
                renegotiation_threshold,
                ..
            } => {
                if *max_contracts == 0 {
                    return Err(ConfigurationError::invalid(
                        "policy.max_contracts",
                        "must be > 0",
                    ));
                }
                if !renegotiation_threshold.is_finite() || *renegotiation_threshold < 0.0 {
                    return Err(ConfigurationError::invalid(
                        "policy.renegotiation_threshold",
                        "must be finite and non-negative",
                    ));
                }
                Ok(())
            }
            PolicyConfig::RandomChurn {
                terminate_probability,
                propose_probability,
            } => {
                for (field, p) in [
                    ("policy.terminate_probability", terminate_probability),
                    ("policy.propose_probability", propose_probability),
                ] {
                    if !(0.0..=1.0).contains(p) {
                        return Err(ConfigurationError::invalid(field, "must lie in [0, 1]"));
                    }
                }
                Ok(())
            }
        }
    }

    /// Instantiate the configured policy
    pub fn build(&self) -> Arc<dyn BehaviorPolicy> {
        match self {
            PolicyConfig::NoAction => Arc::new(NoActionPolicy),
            PolicyConfig::ComplianceAware {
                exit_patience,
                max_contracts,
                renegotiation_threshold,
            } => Arc::new(ComplianceAwarePolicy::new(
                *exit_patience,
                *max_contracts,
                *renegotiation_threshold,
            )),
            PolicyConfig::RandomChurn {
                terminate_probability,
                propose_probability,
            } => Arc::new(RandomChurnPolicy::new(
                *terminate_probability,
                *propose_probability,
            )),
        }
    }
}

/// Proposed value around the market reference, never below one cent
pub(crate) fn noisy_value(
    reference: f64,
    volatility: f64,
    factor: f64,
    draw: &mut dyn DrawSource,
) -> i64 {
    let noise = 1.0 + volatility * draw.standard_normal();
    (reference * noise * factor).round().max(1.0) as i64
}

/// Contract length uniform on `1..=2 * mean`; open-ended without a mean
pub(crate) fn draw_duration(mean: Option<usize>, draw: &mut dyn DrawSource) -> Option<usize> {
    mean.map(|m| 1 + draw.index(2 * m.max(1)))
}
