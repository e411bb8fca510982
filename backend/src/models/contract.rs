//! Contract model (relationship edge attributes)
//!
//! A contract links exactly one freelancer to exactly one client. The pair
//! is the edge key; there is at most one contract per pair at any time.
//!
//! CRITICAL: All money values are i64 (cents)

use crate::models::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compliance state of a contract under the active regulatory variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    /// Formed before enforcement started; resolved once rules apply
    PendingReview,
}

/// Undirected edge key, normalised to (freelancer, client)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub freelancer: AgentId,
    pub client: AgentId,
}

impl EdgeKey {
    pub fn new(freelancer: AgentId, client: AgentId) -> Self {
        Self { freelancer, client }
    }

    /// The endpoint that is not `id`
    pub fn other(&self, id: AgentId) -> AgentId {
        if self.freelancer == id {
            self.client
        } else {
            self.freelancer
        }
    }

    pub fn touches(&self, id: AgentId) -> bool {
        self.freelancer == id || self.client == id
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}", self.freelancer, self.client)
    }
}

/// An active freelancer-client contract
///
/// # Example
/// ```
/// use gig_simulator_core_rs::models::{AgentId, ComplianceStatus, Contract};
///
/// let contract = Contract::new(AgentId(1), AgentId(9), 50_000, 4, Some(10), ComplianceStatus::Compliant);
/// assert_eq!(contract.ends_at(), Some(14));
/// assert_eq!(contract.age(12), 2);
/// assert_eq!(contract.remaining(13), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    key: EdgeKey,

    /// Amount paid by the client to the freelancer each tick (cents)
    pub value_per_tick: i64,

    /// Tick at which the contract was formed
    pub started_at: usize,

    /// Contracted length in ticks; `None` for an open-ended contract
    pub duration_ticks: Option<usize>,

    pub compliance: ComplianceStatus,

    /// Number of successful renegotiations
    pub renegotiations: u32,
}

impl Contract {
    pub fn new(
        freelancer: AgentId,
        client: AgentId,
        value_per_tick: i64,
        started_at: usize,
        duration_ticks: Option<usize>,
        compliance: ComplianceStatus,
    ) -> Self {
        Self {
            key: EdgeKey::new(freelancer, client),
            value_per_tick,
            started_at,
            duration_ticks,
            compliance,
            renegotiations: 0,
        }
    }

    pub fn key(&self) -> EdgeKey {
        self.key
    }

    pub fn freelancer(&self) -> AgentId {
        self.key.freelancer
    }

    pub fn client(&self) -> AgentId {
        self.key.client
    }

    /// First tick at which the contract is no longer in effect
    pub fn ends_at(&self) -> Option<usize> {
        self.duration_ticks.map(|d| self.started_at.saturating_add(d))
    }

    pub fn is_open_ended(&self) -> bool {
        self.duration_ticks.is_none()
    }

    /// Ticks elapsed since formation
    pub fn age(&self, tick: usize) -> usize {
        tick.saturating_sub(self.started_at)
    }

    /// Ticks left after `tick` (0 means it ends when `tick` commits)
    pub fn remaining(&self, tick: usize) -> Option<usize> {
        self.ends_at().map(|end| end.saturating_sub(tick + 1))
    }
}
