//! Compliance-aware policy
//!
//! Default behavioural model. Freelancers weigh contract income against the
//! share of compliance paperwork they carry; clients weigh audit exposure
//! against their compliance priority and spending budget.
//!
//! # Behavior
//!
//! Freelancer, first match wins:
//! 1. Terminate a contract whose net value (after paperwork) is not positive
//! 2. Renegotiate an underpaid contract (chance = negotiation skill)
//! 3. Renew a contract that ends this tick (chance grows with risk tolerance)
//! 4. Leave the market after `exit_patience` idle ticks (chance = 1 - risk tolerance)
//! 5. Propose to the candidate met this tick, if below `max_contracts`
//!
//! Client, first match wins:
//! 1. Over budget: terminate the most expensive contract
//! 2. Non-compliant contract under enforcement: re-paper it (chance =
//!    compliance priority) or drop it (chance grows with risk aversion)
//! 3. Renew a compliant contract that ends this tick
//! 4. Leave the market after `exit_patience` idle ticks (chance = risk aversion / 2)
//! 5. Hire the candidate if the budget allows

use super::{draw_duration, noisy_value, Action, BehaviorPolicy, LocalContext};
use crate::models::agent::{Agent, Role};
use crate::models::contract::ComplianceStatus;
use crate::rng::DrawSource;
use crate::scenario::RegulatoryRules;

#[derive(Debug, Clone)]
pub struct ComplianceAwarePolicy {
    exit_patience: usize,
    max_contracts: usize,
    renegotiation_threshold: f64,
}

impl ComplianceAwarePolicy {
    pub fn new(exit_patience: usize, max_contracts: usize, renegotiation_threshold: f64) -> Self {
        Self {
            exit_patience,
            max_contracts,
            renegotiation_threshold,
        }
    }

    fn decide_freelancer(
        &self,
        agent: &Agent,
        context: &LocalContext<'_>,
        rules: &RegulatoryRules,
        draw: &mut dyn DrawSource,
    ) -> Action {
        let tick = context.tick;
        let risk_tolerance = agent.numeric_or("risk_tolerance", 0.5);
        let capacity = agent.numeric_or("administrative_capacity", 0.5);
        let skill = agent.numeric_or("negotiation_skill", 0.5);

        for neighbor in &context.neighbors {
            let contract = neighbor.contract;
            let counterparty = neighbor.agent.id();

            // Paperwork weighs more on freelancers with little admin capacity
            let paperwork = if rules.in_force(tick) && contract.compliance == ComplianceStatus::Compliant {
                rules.admin_cost_per_contract as f64 / 2.0 * (1.5 - capacity)
            } else {
                0.0
            };
            let net_value = contract.value_per_tick as f64 - paperwork;

            if net_value <= 0.0 {
                return Action::TerminateContract { counterparty };
            }

            let floor = context.market.reference_value * self.renegotiation_threshold;
            if (contract.value_per_tick as f64) < floor && draw.chance(skill) {
                let raised =
                    contract.value_per_tick as f64 * (1.0 + context.economics.renegotiation_step);
                return Action::RenegotiateTerms {
                    counterparty,
                    new_value: (raised.round() as i64).max(contract.value_per_tick.saturating_add(1)),
                };
            }

            if contract.remaining(tick) == Some(0) && draw.chance(0.5 + 0.5 * risk_tolerance) {
                return Action::ContinueContract { counterparty };
            }
        }

        if context.neighbors.is_empty()
            && agent.state().idle_ticks >= self.exit_patience
            && draw.chance(1.0 - risk_tolerance)
        {
            return Action::ExitMarket;
        }

        if context.neighbors.len() < self.max_contracts {
            if let Some(candidate) = context.candidate {
                if draw.chance(context.economics.contract_formation_rate) {
                    let economics = context.economics;
                    return Action::ProposeContract {
                        counterparty: candidate.id(),
                        value: noisy_value(
                            context.market.reference_value,
                            economics.market_volatility,
                            0.9 + 0.2 * skill,
                            draw,
                        ),
                        duration: draw_duration(economics.mean_contract_duration, draw),
                    };
                }
            }
        }

        Action::NoAction
    }

    fn decide_client(
        &self,
        agent: &Agent,
        context: &LocalContext<'_>,
        rules: &RegulatoryRules,
        draw: &mut dyn DrawSource,
    ) -> Action {
        let tick = context.tick;
        let priority = agent.numeric_or("compliance_priority", 0.5);
        let risk_aversion = agent.numeric_or("risk_aversion", 0.5);
        let budget = agent.numeric_or("budget", f64::INFINITY);
        let spend = context.contracted_value() as f64;

        if spend > budget {
            let mut priciest = None;
            for neighbor in &context.neighbors {
                let value = neighbor.contract.value_per_tick;
                if priciest.map_or(true, |(_, v)| value > v) {
                    priciest = Some((neighbor.agent.id(), value));
                }
            }
            if let Some((counterparty, _)) = priciest {
                return Action::TerminateContract { counterparty };
            }
        }

        for neighbor in &context.neighbors {
            let contract = neighbor.contract;
            let counterparty = neighbor.agent.id();

            if rules.in_force(tick) && contract.compliance == ComplianceStatus::NonCompliant {
                if draw.chance(priority) {
                    return Action::RenegotiateTerms {
                        counterparty,
                        new_value: contract.value_per_tick,
                    };
                }
                let exposure = (risk_aversion * rules.audit_probability * 5.0).min(1.0);
                if draw.chance(exposure) {
                    return Action::TerminateContract { counterparty };
                }
            }

            if contract.remaining(tick) == Some(0)
                && contract.compliance != ComplianceStatus::NonCompliant
                && draw.chance(0.6)
            {
                return Action::ContinueContract { counterparty };
            }
        }

        if context.neighbors.is_empty()
            && agent.state().idle_ticks >= self.exit_patience
            && draw.chance(risk_aversion / 2.0)
        {
            return Action::ExitMarket;
        }

        if context.neighbors.len() < self.max_contracts
            && spend + context.market.reference_value <= budget
        {
            if let Some(candidate) = context.candidate {
                if draw.chance(context.economics.contract_formation_rate) {
                    let economics = context.economics;
                    return Action::ProposeContract {
                        counterparty: candidate.id(),
                        value: noisy_value(
                            context.market.reference_value,
                            economics.market_volatility,
                            1.0 - 0.1 * risk_aversion,
                            draw,
                        ),
                        duration: draw_duration(economics.mean_contract_duration, draw),
                    };
                }
            }
        }

        Action::NoAction
    }
}

impl BehaviorPolicy for ComplianceAwarePolicy {
    fn name(&self) -> &'static str {
        "compliance_aware"
    }

    fn decide(
        &self,
        agent: &Agent,
        context: &LocalContext<'_>,
        rules: &RegulatoryRules,
        draw: &mut dyn DrawSource,
    ) -> Action {
        match agent.role() {
            Role::Freelancer => self.decide_freelancer(agent, context, rules, draw),
            Role::Client => self.decide_client(agent, context, rules, draw),
        }
    }
}
