//! Random churn policy
//!
//! Attribute-blind baseline: each tick an agent with contracts may drop a
//! random one, and an agent who met a candidate may propose to it.

use super::{draw_duration, noisy_value, Action, BehaviorPolicy, LocalContext};
use crate::models::agent::Agent;
use crate::rng::DrawSource;
use crate::scenario::RegulatoryRules;

#[derive(Debug, Clone)]
pub struct RandomChurnPolicy {
    terminate_probability: f64,
    propose_probability: f64,
}

impl RandomChurnPolicy {
    pub fn new(terminate_probability: f64, propose_probability: f64) -> Self {
        Self {
            terminate_probability,
            propose_probability,
        }
    }
}

impl BehaviorPolicy for RandomChurnPolicy {
    fn name(&self) -> &'static str {
        "random_churn"
    }

    fn decide(
        &self,
        _agent: &Agent,
        context: &LocalContext<'_>,
        _rules: &RegulatoryRules,
        draw: &mut dyn DrawSource,
    ) -> Action {
        if !context.neighbors.is_empty() && draw.chance(self.terminate_probability) {
            let pick = draw.index(context.neighbors.len());
            return Action::TerminateContract {
                counterparty: context.neighbors[pick].agent.id(),
            };
        }

        if let Some(candidate) = context.candidate {
            if draw.chance(self.propose_probability) {
                let economics = context.economics;
                return Action::ProposeContract {
                    counterparty: candidate.id(),
                    value: noisy_value(
                        context.market.reference_value,
                        economics.market_volatility,
                        1.0,
                        draw,
                    ),
                    duration: draw_duration(economics.mean_contract_duration, draw),
                };
            }
        }

        Action::NoAction
    }
}
