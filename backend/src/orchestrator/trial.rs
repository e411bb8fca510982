//! Single trial execution
//!
//! A [`Trial`] owns the live population, network and random stream of one
//! independent run and advances them tick by tick.
//!
//! # Tick Loop
//!
//! ```text
//! For each tick t:
//! 1. Check the cancellation token
//! 2. Observe market signals from the tick-start snapshot
//! 3. Ask every active agent for one action (ascending id, frozen snapshot)
//! 4. Validate each action; an invalid one aborts the trial
//! 5. Commit: exits, terminations, renegotiations/renewals, proposals
//! 6. Expire contracts that end with this tick
//! 7. Settle economics (income, admin cost, audits and penalties)
//! 8. Check that every edge joins two active agents
//! 9. Record tick metrics and the convergence diagnostic
//! 10. Abort if no active agents remain
//! ```
//!
//! # State Machine
//!
//! `Initializing -> Running -> {Completed, Aborted}`; `Initializing` may
//! also go straight to `Aborted` if the starting state cannot be built.
//! Terminal states accept no further transitions.

use crate::models::agent::{AgentId, Role};
use crate::models::contract::{ComplianceStatus, Contract, EdgeKey};
use crate::models::network::{documentation_probability, RelationshipNetwork};
use crate::models::population::Population;
use crate::orchestrator::cancel::CancellationToken;
use crate::orchestrator::metrics::{Metric, TickMetrics};
use crate::policy::{Action, BehaviorPolicy, LocalContext, MarketSignals};
use crate::rng::{trial_seed, DrawSource, RngManager};
use crate::scenario::ResolvedScenario;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Status and outcome types
// ============================================================================

/// Lifecycle state of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    Initializing,
    Running,
    Completed,
    Aborted,
}

impl TrialStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TrialStatus::Completed | TrialStatus::Aborted)
    }

    /// Whether the state machine allows `self -> next`
    pub fn can_transition_to(self, next: TrialStatus) -> bool {
        matches!(
            (self, next),
            (TrialStatus::Initializing, TrialStatus::Running)
                | (TrialStatus::Initializing, TrialStatus::Aborted)
                | (TrialStatus::Running, TrialStatus::Completed)
                | (TrialStatus::Running, TrialStatus::Aborted)
        )
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TrialStateError {
    #[error("Invalid trial transition {from:?} -> {to:?}")]
    InvalidTransition { from: TrialStatus, to: TrialStatus },
}

/// Why a trial stopped before its last tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum AbortReason {
    /// No active agents remain
    PopulationCollapsed,

    /// The cancellation token was set
    Cancelled,

    /// A policy returned an action that does not apply to the snapshot
    InvalidAction { agent: AgentId, detail: String },

    /// Committed state broke a structural invariant
    InvariantViolation { detail: String },
}

impl AbortReason {
    /// Stable reason code used in reports and abort counts
    pub fn code(&self) -> &'static str {
        match self {
            AbortReason::PopulationCollapsed => "population_collapsed",
            AbortReason::Cancelled => "cancelled",
            AbortReason::InvalidAction { .. } => "invalid_action",
            AbortReason::InvariantViolation { .. } => "invariant_violation",
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::InvalidAction { agent, detail } => {
                write!(f, "{}: {} ({})", self.code(), detail, agent)
            }
            AbortReason::InvariantViolation { detail } => write!(f, "{}: {}", self.code(), detail),
            _ => f.write_str(self.code()),
        }
    }
}

/// Terminal outcome of a trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrialOutcome {
    Completed,
    Aborted { reason: AbortReason, at_tick: usize },
}

/// Everything recorded about one trial
///
/// Plain data, safe to serialize and hand to an external store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_index: usize,

    /// Seed the trial's stream was created from
    pub seed: u64,

    pub outcome: TrialOutcome,

    /// One snapshot per executed tick, in tick order
    pub ticks: Vec<TickMetrics>,

    /// First tick at which the compliance rate settled, if it did
    pub converged_at_tick: Option<usize>,
}

impl TrialRecord {
    pub fn is_completed(&self) -> bool {
        self.outcome == TrialOutcome::Completed
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        match &self.outcome {
            TrialOutcome::Aborted { reason, .. } => Some(reason),
            TrialOutcome::Completed => None,
        }
    }

    /// Values of `metric` across ticks
    pub fn series(&self, metric: Metric) -> Vec<f64> {
        self.ticks.iter().map(|t| t.value(metric)).collect()
    }
}

// ============================================================================
// Trial
// ============================================================================

/// Counters accumulated while committing one tick
#[derive(Debug, Default)]
struct TickCounters {
    formed: usize,
    terminated: usize,
    expired: usize,
    renegotiated: usize,
    exited: usize,
    compliance_cost: i64,
    penalties: i64,
    income: i64,
    settled: usize,
}

/// One independent stochastic run
pub struct Trial<'s> {
    index: usize,
    seed: u64,
    scenario: &'s ResolvedScenario,
    policy: &'s dyn BehaviorPolicy,
    status: TrialStatus,
    rng: RngManager,
    population: Population,
    network: RelationshipNetwork,
    tick: usize,
    ticks: Vec<TickMetrics>,
    converged_at_tick: Option<usize>,
}

impl<'s> Trial<'s> {
    /// Prepare trial `index`; nothing is generated until [`Trial::initialize`]
    pub fn new(index: usize, scenario: &'s ResolvedScenario, policy: &'s dyn BehaviorPolicy) -> Self {
        let seed = trial_seed(scenario.config().seed, index);
        let population = Population::from_agents(Vec::new());
        let network = RelationshipNetwork::new(&population);
        Self {
            index,
            seed,
            scenario,
            policy,
            status: TrialStatus::Initializing,
            rng: RngManager::new(seed),
            population,
            network,
            tick: 0,
            ticks: Vec::new(),
            converged_at_tick: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn status(&self) -> TrialStatus {
        self.status
    }

    /// Next tick to execute
    pub fn current_tick(&self) -> usize {
        self.tick
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn network(&self) -> &RelationshipNetwork {
        &self.network
    }

    pub fn ticks(&self) -> &[TickMetrics] {
        &self.ticks
    }

    fn transition(&mut self, next: TrialStatus) -> Result<(), TrialStateError> {
        if !self.status.can_transition_to(next) {
            return Err(TrialStateError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Generate the population and starting network, then enter `Running`
    pub fn initialize(&mut self) -> Result<(), AbortReason> {
        if self.status != TrialStatus::Initializing {
            return Err(invariant(TrialStateError::InvalidTransition {
                from: self.status,
                to: TrialStatus::Running,
            }));
        }

        let population = Population::generate_with(&self.scenario.config().population, &mut self.rng)
            .map_err(invariant)?;
        let network =
            RelationshipNetwork::build(&population, self.scenario, &mut self.rng).map_err(invariant)?;
        network.check_endpoints(&population).map_err(inactive_endpoint)?;

        tracing::trace!(
            trial = self.index,
            agents = population.len(),
            contracts = network.edge_count(),
            "trial initialized"
        );

        self.population = population;
        self.network = network;
        self.transition(TrialStatus::Running).map_err(invariant)
    }

    /// Execute one tick and return its metrics
    ///
    /// The caller decides what an `Err` means for the trial; [`Trial::run`]
    /// turns it into an `Aborted` outcome.
    pub fn step(&mut self) -> Result<TickMetrics, AbortReason> {
        if self.status != TrialStatus::Running {
            return Err(invariant(format!("step called while {:?}", self.status)));
        }

        let tick = self.tick;
        let scenario = self.scenario;
        let economics = scenario.economics();
        let rules = scenario.rules();

        // Decision phase: everything below reads the tick-start snapshot only
        let market = MarketSignals::observe(&self.network, economics, tick);
        let freelancers = self.population.active_ids_with_role(Role::Freelancer);
        let clients = self.population.active_ids_with_role(Role::Client);

        let mut decisions: Vec<(AgentId, Action)> = Vec::with_capacity(self.population.len());
        for agent in self.population.active_agents() {
            let pool = match agent.role() {
                Role::Freelancer => &clients,
                Role::Client => &freelancers,
            };
            let candidate = meet_candidate(
                &self.network,
                agent.id(),
                pool,
                economics.interaction_probability,
                &mut self.rng,
            );
            let context = LocalContext::build(
                agent,
                tick,
                &self.population,
                &self.network,
                candidate,
                &market,
                economics,
            );
            let action = self.policy.decide(agent, &context, rules, &mut self.rng);
            validate_action(&self.population, &self.network, agent.id(), &action).map_err(
                |detail| AbortReason::InvalidAction {
                    agent: agent.id(),
                    detail,
                },
            )?;
            decisions.push((agent.id(), action));
        }

        // Commit phase
        let mut counters = self.commit(tick, decisions)?;
        let expired = self.expire(tick, &mut counters)?;
        self.settle(tick, expired, &mut counters);
        self.update_idle();

        self.network
            .check_endpoints(&self.population)
            .map_err(inactive_endpoint)?;

        let metrics = self.snapshot(tick, &counters);
        tracing::trace!(
            trial = self.index,
            tick,
            active_agents = metrics.active_agents,
            active_contracts = metrics.active_contracts,
            compliance_rate = metrics.compliance_rate,
            "tick committed"
        );
        self.ticks.push(metrics.clone());
        self.check_convergence(tick);
        self.tick += 1;

        if metrics.active_agents == 0 {
            return Err(AbortReason::PopulationCollapsed);
        }
        Ok(metrics)
    }

    /// Drive the trial to a terminal state and produce its record
    pub fn run(mut self, cancel: &CancellationToken) -> TrialRecord {
        if let Err(reason) = self.initialize() {
            return self.abort(reason, 0);
        }

        let ticks_per_trial = self.scenario.config().ticks_per_trial;
        while self.tick < ticks_per_trial {
            if cancel.is_cancelled() {
                let at_tick = self.tick;
                return self.abort(AbortReason::Cancelled, at_tick);
            }
            let tick = self.tick;
            if let Err(reason) = self.step() {
                return self.abort(reason, tick);
            }
        }

        self.finish(TrialStatus::Completed, TrialOutcome::Completed)
    }

    fn abort(self, reason: AbortReason, at_tick: usize) -> TrialRecord {
        tracing::warn!(
            trial = self.index,
            at_tick,
            reason = reason.code(),
            "trial aborted: {}",
            reason
        );
        self.finish(TrialStatus::Aborted, TrialOutcome::Aborted { reason, at_tick })
    }

    fn finish(mut self, status: TrialStatus, outcome: TrialOutcome) -> TrialRecord {
        if let Err(e) = self.transition(status) {
            tracing::error!(trial = self.index, "{}", e);
        }
        TrialRecord {
            trial_index: self.index,
            seed: self.seed,
            outcome,
            ticks: self.ticks,
            converged_at_tick: self.converged_at_tick,
        }
    }

    // ========================================================================
    // Commit steps
    // ========================================================================

    /// Apply exits, terminations, renegotiations, renewals and proposals
    fn commit(
        &mut self,
        tick: usize,
        decisions: Vec<(AgentId, Action)>,
    ) -> Result<TickCounters, AbortReason> {
        let mut counters = TickCounters::default();

        let mut exits: Vec<AgentId> = Vec::new();
        let mut terminations: BTreeSet<EdgeKey> = BTreeSet::new();
        let mut renegotiations: BTreeMap<EdgeKey, Vec<i64>> = BTreeMap::new();
        let mut renewals: BTreeSet<EdgeKey> = BTreeSet::new();
        let mut proposals: BTreeMap<EdgeKey, Vec<(i64, Option<usize>)>> = BTreeMap::new();

        for (agent, action) in decisions {
            match action {
                Action::NoAction => {}
                Action::ExitMarket => exits.push(agent),
                Action::TerminateContract { counterparty } => {
                    terminations.extend(self.network.key_between(agent, counterparty));
                }
                Action::RenegotiateTerms {
                    counterparty,
                    new_value,
                } => {
                    if let Some(key) = self.network.key_between(agent, counterparty) {
                        renegotiations.entry(key).or_default().push(new_value);
                    }
                }
                Action::ContinueContract { counterparty } => {
                    renewals.extend(self.network.key_between(agent, counterparty));
                }
                Action::ProposeContract {
                    counterparty,
                    value,
                    duration,
                } => {
                    if let Some(key) = self.network.key_between(agent, counterparty) {
                        proposals.entry(key).or_default().push((value, duration));
                    }
                }
            }
        }

        // 1. Exits
        for id in exits {
            if self.population.mark_exited(id, tick) {
                counters.exited += 1;
                for contract in self.network.remove_incident(id) {
                    counters.terminated += 1;
                    self.record_ended(&contract);
                }
            }
        }

        // 2. Terminations
        for key in &terminations {
            if self.network.has_edge(*key) {
                let contract = self.network.remove_edge(*key).map_err(invariant)?;
                counters.terminated += 1;
                self.record_ended(&contract);
            }
        }

        // 3. Renegotiations and renewals on surviving edges
        let in_force = self.scenario.rules().in_force(tick);
        for (key, values) in renegotiations {
            let Some(contract) = self.network.contract_mut(key) else {
                continue;
            };
            let value = values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64;
            contract.value_per_tick = (value.round() as i64).max(1);
            contract.renegotiations += 1;
            if in_force {
                contract.compliance = ComplianceStatus::Compliant;
            }
            counters.renegotiated += 1;
        }

        let extension = self.scenario.economics().mean_contract_duration;
        for key in renewals {
            if let Some(contract) = self.network.contract_mut(key) {
                contract.duration_ticks = match (contract.duration_ticks, extension) {
                    (Some(current), Some(extra)) => Some(current.saturating_add(extra)),
                    _ => None,
                };
            }
        }

        // 4. Proposals
        for (key, offers) in proposals {
            if !self.population.is_active(key.freelancer)
                || !self.population.is_active(key.client)
                || self.network.has_edge(key)
                || terminations.contains(&key)
            {
                continue;
            }

            let count = offers.len() as f64;
            let value = (offers.iter().map(|(v, _)| *v).sum::<i64>() as f64 / count).round() as i64;
            // Shorter term wins; open-ended only if every offer is
            let duration = offers.iter().filter_map(|(_, d)| *d).min();

            let documentation = documentation_probability(&self.population, key.freelancer, key.client);
            let compliance = self
                .scenario
                .rules()
                .initial_status(tick, documentation, &mut self.rng);

            // Takes effect from the next tick
            let contract = Contract::new(
                key.freelancer,
                key.client,
                value.max(1),
                tick + 1,
                duration,
                compliance,
            );
            self.network.add_edge(contract).map_err(invariant)?;
            for id in [key.freelancer, key.client] {
                if let Some(agent) = self.population.get_mut(id) {
                    agent.state_mut().contracts_started += 1;
                }
            }
            counters.formed += 1;
        }

        Ok(counters)
    }

    /// 5. Remove contracts whose last tick is `tick`, returning them
    fn expire(&mut self, tick: usize, counters: &mut TickCounters) -> Result<Vec<Contract>, AbortReason> {
        let due: Vec<EdgeKey> = self
            .network
            .contracts()
            .filter(|c| c.ends_at().is_some_and(|end| end <= tick + 1))
            .map(Contract::key)
            .collect();

        let mut expired = Vec::with_capacity(due.len());
        for key in due {
            let contract = self.network.remove_edge(key).map_err(invariant)?;
            self.record_ended(&contract);
            counters.expired += 1;
            expired.push(contract);
        }
        Ok(expired)
    }

    /// 6. Pay contracts that were in effect during `tick`, charge admin
    /// cost on compliant ones and audit non-compliant ones
    fn settle(&mut self, tick: usize, expired: Vec<Contract>, counters: &mut TickCounters) {
        let scenario = self.scenario;
        let rules = scenario.rules();
        let in_force = rules.in_force(tick);

        // Contracts signed before enforcement get papered (or not) once it starts
        if in_force {
            for key in self.network.edge_keys() {
                let pending = self
                    .network
                    .contract(key)
                    .is_some_and(|c| c.compliance == ComplianceStatus::PendingReview);
                if pending {
                    let documentation =
                        documentation_probability(&self.population, key.freelancer, key.client);
                    let status = rules.initial_status(tick, documentation, &mut self.rng);
                    if let Some(contract) = self.network.contract_mut(key) {
                        contract.compliance = status;
                    }
                }
            }
        }

        let mut settled: Vec<Contract> = self
            .network
            .contracts()
            .filter(|c| c.started_at <= tick)
            .cloned()
            .chain(expired)
            .collect();
        settled.sort_by_key(Contract::key);

        for contract in &settled {
            counters.settled += 1;
            counters.income = counters.income.saturating_add(contract.value_per_tick);
            if let Some(freelancer) = self.population.get_mut(contract.freelancer()) {
                let state = freelancer.state_mut();
                state.cumulative_earnings = state.cumulative_earnings.saturating_add(contract.value_per_tick);
            }

            match contract.compliance {
                ComplianceStatus::Compliant if in_force => {
                    let total = rules.admin_cost_per_contract;
                    let freelancer_share = total / 2;
                    counters.compliance_cost = counters.compliance_cost.saturating_add(total);
                    if let Some(freelancer) = self.population.get_mut(contract.freelancer()) {
                        let state = freelancer.state_mut();
                        state.cumulative_compliance_cost =
                            state.cumulative_compliance_cost.saturating_add(freelancer_share);
                    }
                    if let Some(client) = self.population.get_mut(contract.client()) {
                        let state = client.state_mut();
                        state.cumulative_compliance_cost =
                            state.cumulative_compliance_cost.saturating_add(total - freelancer_share);
                    }
                }
                ComplianceStatus::NonCompliant
                    if rules.auditable(tick, contract.age(tick))
                        && self.rng.chance(rules.audit_probability) =>
                {
                    counters.penalties = counters.penalties.saturating_add(rules.penalty_per_violation);
                    if let Some(client) = self.population.get_mut(contract.client()) {
                        let state = client.state_mut();
                        state.cumulative_penalties =
                            state.cumulative_penalties.saturating_add(rules.penalty_per_violation);
                    }
                }
                _ => {}
            }
        }
    }

    fn update_idle(&mut self) {
        let network = &self.network;
        for agent in self.population.agents_mut().filter(|a| a.is_active()) {
            let idle = network.degree(agent.id()) == 0;
            let state = agent.state_mut();
            if idle {
                state.idle_ticks += 1;
            } else {
                state.idle_ticks = 0;
            }
        }
    }

    fn record_ended(&mut self, contract: &Contract) {
        for id in [contract.freelancer(), contract.client()] {
            if let Some(agent) = self.population.get_mut(id) {
                agent.state_mut().contracts_ended += 1;
            }
        }
    }

    // ========================================================================
    // Metrics
    // ========================================================================

    fn snapshot(&self, tick: usize, counters: &TickCounters) -> TickMetrics {
        let active_freelancers = self.population.active_ids_with_role(Role::Freelancer).len();
        let active_clients = self.population.active_ids_with_role(Role::Client).len();
        let active_contracts = self.network.edge_count();

        let (value_sum, compliant) = self.network.contracts().fold((0i64, 0usize), |(sum, ok), c| {
            let ok = ok + usize::from(c.compliance == ComplianceStatus::Compliant);
            (sum.saturating_add(c.value_per_tick), ok)
        });

        TickMetrics {
            tick,
            active_agents: active_freelancers + active_clients,
            active_freelancers,
            active_clients,
            active_contracts,
            contracts_formed: counters.formed,
            contracts_terminated: counters.terminated,
            contracts_expired: counters.expired,
            contracts_renegotiated: counters.renegotiated,
            agents_exited: counters.exited,
            average_contract_value: ratio(value_sum as f64, active_contracts),
            total_compliance_cost: counters.compliance_cost,
            average_compliance_cost: ratio(counters.compliance_cost as f64, counters.settled),
            compliance_rate: ratio(compliant as f64, active_contracts),
            enforcement_penalties: counters.penalties,
            average_freelancer_earnings: ratio(counters.income as f64, active_freelancers),
        }
    }

    /// Record the first tick at which the trailing compliance-rate window
    /// has variance below the threshold. Never stops the trial.
    fn check_convergence(&mut self, tick: usize) {
        if self.converged_at_tick.is_some() {
            return;
        }
        let convergence = &self.scenario.config().convergence;
        if self.ticks.len() < convergence.window {
            return;
        }

        let window: Vec<f64> = self.ticks[self.ticks.len() - convergence.window..]
            .iter()
            .map(|t| t.compliance_rate)
            .collect();
        if sample_variance(&window) < convergence.threshold {
            self.converged_at_tick = Some(tick);
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// With probability `interaction_probability`, meet one random active agent
/// of the opposite role. Existing neighbors are not candidates.
fn meet_candidate(
    network: &RelationshipNetwork,
    agent: AgentId,
    pool: &[AgentId],
    interaction_probability: f64,
    draw: &mut dyn DrawSource,
) -> Option<AgentId> {
    if !draw.chance(interaction_probability) || pool.is_empty() {
        return None;
    }
    let candidate = pool[draw.index(pool.len())];
    if network.key_between(agent, candidate).is_some_and(|k| network.has_edge(k)) {
        None
    } else {
        Some(candidate)
    }
}

/// Check an action against the tick-start snapshot
fn validate_action(
    population: &Population,
    network: &RelationshipNetwork,
    agent: AgentId,
    action: &Action,
) -> Result<(), String> {
    match action {
        Action::NoAction | Action::ExitMarket => Ok(()),
        Action::ContinueContract { counterparty }
        | Action::TerminateContract { counterparty } => {
            require_contract(network, agent, *counterparty, action)
        }
        Action::RenegotiateTerms {
            counterparty,
            new_value,
        } => {
            require_contract(network, agent, *counterparty, action)?;
            if *new_value <= 0 {
                return Err(format!("renegotiate_terms with non-positive value {}", new_value));
            }
            Ok(())
        }
        Action::ProposeContract {
            counterparty,
            value,
            duration,
        } => {
            if *counterparty == agent {
                return Err("propose_contract to self".to_string());
            }
            if !population.is_active(*counterparty) {
                return Err(format!("propose_contract to inactive or unknown {}", counterparty));
            }
            if network.key_between(agent, *counterparty).is_none() {
                return Err(format!("propose_contract to same-role {}", counterparty));
            }
            if *value <= 0 {
                return Err(format!("propose_contract with non-positive value {}", value));
            }
            if *duration == Some(0) {
                return Err("propose_contract with zero duration".to_string());
            }
            Ok(())
        }
    }
}

fn require_contract(
    network: &RelationshipNetwork,
    agent: AgentId,
    counterparty: AgentId,
    action: &Action,
) -> Result<(), String> {
    if network.contract_between(agent, counterparty).is_none() {
        return Err(format!("{} without a contract with {}", action.kind(), counterparty));
    }
    Ok(())
}

fn invariant(detail: impl fmt::Display) -> AbortReason {
    AbortReason::InvariantViolation {
        detail: detail.to_string(),
    }
}

fn inactive_endpoint(key: EdgeKey) -> AbortReason {
    invariant(format!("edge {} has an inactive endpoint", key))
}

fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::network::NetworkRule;
    use crate::policy::{NoActionPolicy, PolicyConfig};
    use crate::scenario::{PopulationConfig, ScenarioConfig};

    fn scenario(network: NetworkRule) -> ResolvedScenario {
        ScenarioConfig {
            seed: 7,
            num_trials: 1,
            ticks_per_trial: 12,
            population: PopulationConfig {
                population_size: 20,
                ..PopulationConfig::default()
            },
            network,
            policy: PolicyConfig::NoAction,
            ..ScenarioConfig::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_status_transitions() {
        use TrialStatus::*;
        assert!(Initializing.can_transition_to(Running));
        assert!(Initializing.can_transition_to(Aborted));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Aborted));
        assert!(!Completed.can_transition_to(Running));
        assert!(!Aborted.can_transition_to(Completed));
        assert!(!Running.can_transition_to(Initializing));
        assert!(Completed.is_terminal() && Aborted.is_terminal());
    }

    #[test]
    fn test_step_before_initialize_is_rejected() {
        let scenario = scenario(NetworkRule::Empty);
        let mut trial = Trial::new(0, &scenario, &NoActionPolicy);
        assert!(matches!(
            trial.step(),
            Err(AbortReason::InvariantViolation { .. })
        ));
        trial.initialize().unwrap();
        assert_eq!(trial.status(), TrialStatus::Running);
        assert!(trial.initialize().is_err());
    }

    #[test]
    fn test_completed_trial_has_one_snapshot_per_tick() {
        let scenario = scenario(NetworkRule::PreferentialAttachment {
            contracts_per_freelancer: 1,
        });
        let record = Trial::new(3, &scenario, &NoActionPolicy).run(&CancellationToken::new());

        assert!(record.is_completed());
        assert_eq!(record.trial_index, 3);
        assert_eq!(record.seed, 7 ^ 3);
        assert_eq!(record.ticks.len(), 12);
        for (i, tick) in record.ticks.iter().enumerate() {
            assert_eq!(tick.tick, i);
            assert_eq!(tick.active_agents, 20);
        }
    }

    #[test]
    fn test_cancelled_before_first_tick() {
        let scenario = scenario(NetworkRule::Empty);
        let token = CancellationToken::new();
        token.cancel();
        let record = Trial::new(0, &scenario, &NoActionPolicy).run(&token);

        assert_eq!(
            record.outcome,
            TrialOutcome::Aborted {
                reason: AbortReason::Cancelled,
                at_tick: 0
            }
        );
        assert!(record.ticks.is_empty());
    }

    #[test]
    fn test_constant_compliance_converges() {
        // Empty network: the compliance rate is 0 on every tick
        let scenario = scenario(NetworkRule::Empty);
        let record = Trial::new(0, &scenario, &NoActionPolicy).run(&CancellationToken::new());
        assert_eq!(record.converged_at_tick, Some(9));
    }

    #[test]
    fn test_idle_ticks_count_agents_without_contracts() {
        let scenario = scenario(NetworkRule::Empty);
        let mut trial = Trial::new(0, &scenario, &NoActionPolicy);
        trial.initialize().unwrap();
        for _ in 0..3 {
            trial.step().unwrap();
        }
        assert!(trial.population().agents().all(|a| a.state().idle_ticks == 3));
    }

    #[test]
    fn test_expiry_frees_both_sides() {
        let mut config = scenario(NetworkRule::PreferentialAttachment {
            contracts_per_freelancer: 1,
        })
        .config()
        .clone();
        config.economics.mean_contract_duration = Some(3);
        let scenario = config.validate().unwrap();

        let mut trial = Trial::new(0, &scenario, &NoActionPolicy);
        trial.initialize().unwrap();
        let initial = trial.network().edge_count();
        assert!(initial > 0);

        // Starting durations are at most 2 * 3 ticks
        let mut expired = 0;
        for _ in 0..6 {
            expired += trial.step().unwrap().contracts_expired;
        }
        assert_eq!(expired, initial);
        assert_eq!(trial.network().edge_count(), 0);
        assert!(trial
            .population()
            .agents()
            .filter(|a| a.role() == Role::Freelancer)
            .all(|a| a.state().contracts_ended == 1));
    }

    #[test]
    fn test_abort_reason_codes() {
        assert_eq!(AbortReason::Cancelled.code(), "cancelled");
        assert_eq!(AbortReason::PopulationCollapsed.code(), "population_collapsed");
        let reason = AbortReason::InvalidAction {
            agent: AgentId(4),
            detail: "bad".into(),
        };
        assert_eq!(reason.code(), "invalid_action");
        assert_eq!(reason.to_string(), "invalid_action: bad (agent-00004)");

        let json = serde_json::to_string(&reason).unwrap();
        assert!(json.contains("\"code\":\"invalid_action\""));
    }

    #[test]
    fn test_sample_variance() {
        assert_eq!(sample_variance(&[0.5, 0.5, 0.5]), 0.0);
        assert!((sample_variance(&[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-12);
    }
}
