//! Agent (freelancer or client) model
//!
//! Represents one participant in the freelance market. Each agent has:
//! - A stable identifier, assigned at population generation and never reused
//! - A role (freelancer or client)
//! - Named attributes sampled from the scenario's distributions
//! - A mutable state record, updated only at tick commit
//!
//! CRITICAL: All money values are i64 (cents)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable agent identifier
///
/// Ordering is numeric, which fixes the per-tick decision order.
///
/// # Example
/// ```
/// use gig_simulator_core_rs::AgentId;
///
/// let id = AgentId(42);
/// assert_eq!(id.to_string(), "agent-00042");
/// assert!(AgentId(1) < AgentId(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent-{:05}", self.0)
    }
}

/// Side of the market an agent sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Freelancer,
    Client,
}

impl Role {
    /// The role an agent must have to hold a contract with this one
    pub fn counterpart(self) -> Role {
        match self {
            Role::Freelancer => Role::Client,
            Role::Client => Role::Freelancer,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Freelancer => write!(f, "freelancer"),
            Role::Client => write!(f, "client"),
        }
    }
}

/// Value of a named agent attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Numeric(f64),
    Flag(bool),
    Categorical(String),
}

impl AttributeValue {
    /// Numeric view of the value (flags map to 0.0 / 1.0)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Numeric(v) => Some(*v),
            AttributeValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
            AttributeValue::Categorical(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Categorical(s) => Some(s),
            _ => None,
        }
    }
}

/// Whether an agent is still participating in the market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    /// Left the market at the end of `tick`; keeps its identifier
    Exited { tick: usize },
}

/// Mutable per-agent state, written only during tick commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub status: AgentStatus,

    /// Contract income received (freelancers) or paid (clients), cents
    pub cumulative_earnings: i64,

    /// Administrative compliance cost borne so far, cents
    pub cumulative_compliance_cost: i64,

    /// Enforcement penalties paid so far, cents
    pub cumulative_penalties: i64,

    /// Consecutive ticks ended without any contract
    pub idle_ticks: usize,

    pub contracts_started: usize,
    pub contracts_ended: usize,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            status: AgentStatus::Active,
            cumulative_earnings: 0,
            cumulative_compliance_cost: 0,
            cumulative_penalties: 0,
            idle_ticks: 0,
            contracts_started: 0,
            contracts_ended: 0,
        }
    }
}

/// A freelancer or client in the simulated market
///
/// # Example
/// ```
/// use gig_simulator_core_rs::{Agent, AgentId, AttributeValue, Role};
///
/// let agent = Agent::new(AgentId(3), Role::Freelancer)
///     .with_attribute("risk_tolerance", AttributeValue::Numeric(0.7));
///
/// assert!(agent.is_active());
/// assert_eq!(agent.numeric("risk_tolerance"), Some(0.7));
/// assert_eq!(agent.numeric_or("negotiation_skill", 0.5), 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    role: Role,
    attributes: BTreeMap<String, AttributeValue>,
    state: AgentState,
}

impl Agent {
    /// Create an active agent with no attributes
    pub fn new(id: AgentId, role: Role) -> Self {
        Self {
            id,
            role,
            attributes: BTreeMap::new(),
            state: AgentState::default(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttributeValue> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Numeric attribute, if present and numeric
    pub fn numeric(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).and_then(AttributeValue::as_f64)
    }

    /// Numeric attribute with a fallback for scenarios that omit it
    pub fn numeric_or(&self, name: &str, default: f64) -> f64 {
        self.numeric(name).unwrap_or(default)
    }

    pub fn category(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(AttributeValue::as_str)
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Mutable state access
    ///
    /// Intended for the trial commit step and for tests; policies only ever
    /// see `&Agent`.
    pub fn state_mut(&mut self) -> &mut AgentState {
        &mut self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.status == AgentStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_attribute_is_numeric() {
        let agent = Agent::new(AgentId(0), Role::Client)
            .with_attribute("sb988_aware", AttributeValue::Flag(true));
        assert_eq!(agent.numeric("sb988_aware"), Some(1.0));
    }

    #[test]
    fn test_categorical_attribute() {
        let agent = Agent::new(AgentId(0), Role::Client)
            .with_attribute("client_type", AttributeValue::Categorical("startup".into()));
        assert_eq!(agent.category("client_type"), Some("startup"));
        assert_eq!(agent.numeric("client_type"), None);
    }

    #[test]
    fn test_counterpart_roles() {
        assert_eq!(Role::Freelancer.counterpart(), Role::Client);
        assert_eq!(Role::Client.counterpart(), Role::Freelancer);
    }
}
