//! Per-tick trial metrics
//!
//! Every tick of a trial produces one [`TickMetrics`] snapshot, taken after
//! the tick's actions have been committed. Metrics are addressed by the
//! [`Metric`] enum, whose snake_case names are the keys used by the
//! aggregator and in serialized reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named metric recorded once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    ActiveAgents,
    ActiveFreelancers,
    ActiveClients,
    ActiveContracts,
    ContractsFormed,
    ContractsTerminated,
    ContractsExpired,
    ContractsRenegotiated,
    AgentsExited,
    AverageContractValue,
    TotalComplianceCost,
    AverageComplianceCost,
    ComplianceRate,
    EnforcementPenalties,
    AverageFreelancerEarnings,
}

impl Metric {
    pub const ALL: [Metric; 15] = [
        Metric::ActiveAgents,
        Metric::ActiveFreelancers,
        Metric::ActiveClients,
        Metric::ActiveContracts,
        Metric::ContractsFormed,
        Metric::ContractsTerminated,
        Metric::ContractsExpired,
        Metric::ContractsRenegotiated,
        Metric::AgentsExited,
        Metric::AverageContractValue,
        Metric::TotalComplianceCost,
        Metric::AverageComplianceCost,
        Metric::ComplianceRate,
        Metric::EnforcementPenalties,
        Metric::AverageFreelancerEarnings,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::ActiveAgents => "active_agents",
            Metric::ActiveFreelancers => "active_freelancers",
            Metric::ActiveClients => "active_clients",
            Metric::ActiveContracts => "active_contracts",
            Metric::ContractsFormed => "contracts_formed",
            Metric::ContractsTerminated => "contracts_terminated",
            Metric::ContractsExpired => "contracts_expired",
            Metric::ContractsRenegotiated => "contracts_renegotiated",
            Metric::AgentsExited => "agents_exited",
            Metric::AverageContractValue => "average_contract_value",
            Metric::TotalComplianceCost => "total_compliance_cost",
            Metric::AverageComplianceCost => "average_compliance_cost",
            Metric::ComplianceRate => "compliance_rate",
            Metric::EnforcementPenalties => "enforcement_penalties",
            Metric::AverageFreelancerEarnings => "average_freelancer_earnings",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| format!("unknown metric '{}'", s))
    }
}

/// Snapshot of one trial at the end of one tick
///
/// Counts of events (`contracts_formed`, `agents_exited`, ...) and money
/// flows (`total_compliance_cost`, `enforcement_penalties`) refer to this
/// tick only; `active_*` fields describe the committed state.
///
/// CRITICAL: money totals are i64 cents; averages are f64 cents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TickMetrics {
    pub tick: usize,

    pub active_agents: usize,
    pub active_freelancers: usize,
    pub active_clients: usize,
    pub active_contracts: usize,

    pub contracts_formed: usize,
    pub contracts_terminated: usize,
    pub contracts_expired: usize,
    pub contracts_renegotiated: usize,
    pub agents_exited: usize,

    /// Mean per-tick value of active contracts (0 without contracts)
    pub average_contract_value: f64,

    /// Administrative compliance cost incurred this tick, both sides
    pub total_compliance_cost: i64,

    /// `total_compliance_cost` per contract settled this tick
    pub average_compliance_cost: f64,

    /// Share of active contracts that are compliant (0 without contracts)
    pub compliance_rate: f64,

    /// Penalties levied by audits this tick
    pub enforcement_penalties: i64,

    /// Contract income paid this tick per active freelancer
    pub average_freelancer_earnings: f64,
}

impl TickMetrics {
    /// Value of `metric` as f64
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::ActiveAgents => self.active_agents as f64,
            Metric::ActiveFreelancers => self.active_freelancers as f64,
            Metric::ActiveClients => self.active_clients as f64,
            Metric::ActiveContracts => self.active_contracts as f64,
            Metric::ContractsFormed => self.contracts_formed as f64,
            Metric::ContractsTerminated => self.contracts_terminated as f64,
            Metric::ContractsExpired => self.contracts_expired as f64,
            Metric::ContractsRenegotiated => self.contracts_renegotiated as f64,
            Metric::AgentsExited => self.agents_exited as f64,
            Metric::AverageContractValue => self.average_contract_value,
            Metric::TotalComplianceCost => self.total_compliance_cost as f64,
            Metric::AverageComplianceCost => self.average_compliance_cost,
            Metric::ComplianceRate => self.compliance_rate,
            Metric::EnforcementPenalties => self.enforcement_penalties as f64,
            Metric::AverageFreelancerEarnings => self.average_freelancer_earnings,
        }
    }
}
