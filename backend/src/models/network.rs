//! Relationship network
//!
//! Undirected graph whose nodes are agent ids and whose edges are active
//! freelancer-client contracts.
//!
//! Key features:
//! - BTreeMap-keyed contracts for sorted, deterministic iteration
//! - Per-node neighbor lists kept in insertion order
//! - Mutation APIs that reject self loops, duplicate edges, same-role pairs
//!   and endpoints outside the population

use crate::models::agent::{AgentId, Role};
use crate::models::contract::{Contract, EdgeKey};
use crate::models::population::Population;
use crate::rng::DrawSource;
use crate::scenario::{ConfigurationError, ResolvedScenario};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from network mutation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NetworkError {
    #[error("Self loop on {0}")]
    SelfLoop(AgentId),

    #[error("Duplicate edge {0}")]
    DuplicateEdge(EdgeKey),

    #[error("Unknown endpoint {0}")]
    UnknownEndpoint(AgentId),

    #[error("Edge {0} must join a freelancer and a client")]
    RoleMismatch(EdgeKey),

    #[error("No edge {0}")]
    MissingEdge(EdgeKey),
}

/// How the starting network of a trial is wired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkRule {
    /// No starting contracts
    Empty,

    /// Each freelancer-client pair is connected independently with
    /// probability `density`
    RandomDensity { density: f64 },

    /// Each freelancer signs with `contracts_per_freelancer` distinct
    /// clients, chosen with probability proportional to `1 + degree`
    PreferentialAttachment { contracts_per_freelancer: usize },
}

impl NetworkRule {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self {
            NetworkRule::RandomDensity { density } if !(0.0..=1.0).contains(density) => Err(
                ConfigurationError::invalid("network.density", "must lie in [0, 1]"),
            ),
            _ => Ok(()),
        }
    }
}

/// Contract graph of a single trial
///
/// # Example
///
/// ```
/// use gig_simulator_core_rs::models::{
///     Agent, AgentId, ComplianceStatus, Contract, Population, RelationshipNetwork, Role,
/// };
///
/// let population = Population::from_agents(vec![
///     Agent::new(AgentId(0), Role::Freelancer),
///     Agent::new(AgentId(1), Role::Client),
/// ]);
/// let mut network = RelationshipNetwork::new(&population);
/// network
///     .add_edge(Contract::new(AgentId(0), AgentId(1), 10_000, 0, Some(5), ComplianceStatus::Compliant))
///     .unwrap();
///
/// assert_eq!(network.edge_count(), 1);
/// assert_eq!(network.neighbors(AgentId(1)), &[AgentId(0)]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipNetwork {
    /// Node → role, fixed at construction
    nodes: BTreeMap<AgentId, Role>,

    /// Node → neighbors in insertion order
    adjacency: BTreeMap<AgentId, Vec<AgentId>>,

    /// Edge attributes, sorted by (freelancer, client)
    contracts: BTreeMap<EdgeKey, Contract>,
}

impl RelationshipNetwork {
    /// Empty network over every agent of `population`
    pub fn new(population: &Population) -> Self {
        let nodes: BTreeMap<AgentId, Role> =
            population.agents().map(|a| (a.id(), a.role())).collect();
        let adjacency = nodes.keys().map(|id| (*id, Vec::new())).collect();
        Self {
            nodes,
            adjacency,
            contracts: BTreeMap::new(),
        }
    }

    /// Wire the starting network according to the scenario's rule
    ///
    /// Starting contracts are formed at tick 0 with values spread around the
    /// reference value and durations uniform on `1..=2 * mean_contract_duration`
    /// (open-ended when no mean duration is configured).
    pub fn build(
        population: &Population,
        scenario: &ResolvedScenario,
        draw: &mut dyn DrawSource,
    ) -> Result<Self, NetworkError> {
        let mut network = Self::new(population);
        let freelancers = population.active_ids_with_role(Role::Freelancer);
        let clients = population.active_ids_with_role(Role::Client);

        match &scenario.config().network {
            NetworkRule::Empty => {}
            NetworkRule::RandomDensity { density } => {
                for &freelancer in &freelancers {
                    for &client in &clients {
                        if draw.chance(*density) {
                            let contract =
                                starting_contract(population, scenario, freelancer, client, draw);
                            network.add_edge(contract)?;
                        }
                    }
                }
            }
            NetworkRule::PreferentialAttachment {
                contracts_per_freelancer,
            } => {
                let k = (*contracts_per_freelancer).min(clients.len());
                for &freelancer in &freelancers {
                    for _ in 0..k {
                        let candidates: Vec<(AgentId, f64)> = clients
                            .iter()
                            .filter(|c| !network.has_edge(EdgeKey::new(freelancer, **c)))
                            .map(|c| (*c, 1.0 + network.degree(*c) as f64))
                            .collect();
                        let Some(client) = pick_weighted(&candidates, draw) else {
                            break;
                        };
                        let contract =
                            starting_contract(population, scenario, freelancer, client, draw);
                        network.add_edge(contract)?;
                    }
                }
            }
        }

        Ok(network)
    }

    /// Insert a contract as a new edge
    pub fn add_edge(&mut self, contract: Contract) -> Result<(), NetworkError> {
        let key = contract.key();
        if key.freelancer == key.client {
            return Err(NetworkError::SelfLoop(key.freelancer));
        }
        let freelancer_role = self
            .nodes
            .get(&key.freelancer)
            .ok_or(NetworkError::UnknownEndpoint(key.freelancer))?;
        let client_role = self
            .nodes
            .get(&key.client)
            .ok_or(NetworkError::UnknownEndpoint(key.client))?;
        if *freelancer_role != Role::Freelancer || *client_role != Role::Client {
            return Err(NetworkError::RoleMismatch(key));
        }
        if self.contracts.contains_key(&key) {
            return Err(NetworkError::DuplicateEdge(key));
        }

        self.adjacency
            .entry(key.freelancer)
            .or_default()
            .push(key.client);
        self.adjacency
            .entry(key.client)
            .or_default()
            .push(key.freelancer);
        self.contracts.insert(key, contract);
        Ok(())
    }

    /// Remove an edge, returning its contract
    pub fn remove_edge(&mut self, key: EdgeKey) -> Result<Contract, NetworkError> {
        let contract = self
            .contracts
            .remove(&key)
            .ok_or(NetworkError::MissingEdge(key))?;
        if let Some(list) = self.adjacency.get_mut(&key.freelancer) {
            list.retain(|n| *n != key.client);
        }
        if let Some(list) = self.adjacency.get_mut(&key.client) {
            list.retain(|n| *n != key.freelancer);
        }
        Ok(contract)
    }

    /// Remove every edge incident to `id`, in neighbor order
    pub fn remove_incident(&mut self, id: AgentId) -> Vec<Contract> {
        let keys: Vec<EdgeKey> = self
            .neighbors(id)
            .iter()
            .filter_map(|n| self.key_between(id, *n))
            .collect();
        keys.into_iter()
            .filter_map(|key| self.remove_edge(key).ok())
            .collect()
    }

    /// Neighbors of `id` in insertion order (empty for unknown ids)
    pub fn neighbors(&self, id: AgentId) -> &[AgentId] {
        self.adjacency.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn degree(&self, id: AgentId) -> usize {
        self.neighbors(id).len()
    }

    /// Normalised edge key for a pair, if the roles form a valid pair
    pub fn key_between(&self, a: AgentId, b: AgentId) -> Option<EdgeKey> {
        match (self.nodes.get(&a)?, self.nodes.get(&b)?) {
            (Role::Freelancer, Role::Client) => Some(EdgeKey::new(a, b)),
            (Role::Client, Role::Freelancer) => Some(EdgeKey::new(b, a)),
            _ => None,
        }
    }

    pub fn has_edge(&self, key: EdgeKey) -> bool {
        self.contracts.contains_key(&key)
    }

    pub fn contract(&self, key: EdgeKey) -> Option<&Contract> {
        self.contracts.get(&key)
    }

    pub fn contract_mut(&mut self, key: EdgeKey) -> Option<&mut Contract> {
        self.contracts.get_mut(&key)
    }

    /// Contract between two agents, in either order
    pub fn contract_between(&self, a: AgentId, b: AgentId) -> Option<&Contract> {
        self.key_between(a, b).and_then(|key| self.contracts.get(&key))
    }

    /// All contracts sorted by edge key
    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.contracts.values()
    }

    pub fn contracts_mut(&mut self) -> impl Iterator<Item = &mut Contract> {
        self.contracts.values_mut()
    }

    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.contracts.keys().copied().collect()
    }

    pub fn edge_count(&self) -> usize {
        self.contracts.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Check that every edge joins two active agents of `population`
    ///
    /// Returns the first offending edge.
    pub fn check_endpoints(&self, population: &Population) -> Result<(), EdgeKey> {
        match self
            .contracts
            .keys()
            .find(|k| !population.is_active(k.freelancer) || !population.is_active(k.client))
        {
            Some(key) => Err(*key),
            None => Ok(()),
        }
    }
}

fn starting_contract(
    population: &Population,
    scenario: &ResolvedScenario,
    freelancer: AgentId,
    client: AgentId,
    draw: &mut dyn DrawSource,
) -> Contract {
    let economics = scenario.economics();
    let noise = 1.0 + economics.contract_value_spread * draw.standard_normal();
    let value = (economics.reference_value(0) * noise).round().max(1.0) as i64;
    let duration = economics
        .mean_contract_duration
        .map(|mean| 1 + draw.index(2 * mean));
    let documentation = documentation_probability(population, freelancer, client);
    let compliance = scenario.rules().initial_status(0, documentation, draw);
    Contract::new(freelancer, client, value, 0, duration, compliance)
}

/// Chance a new contract between the pair is properly documented
///
/// Driven by the client's compliance priority and legal resources and the
/// freelancer's administrative capacity.
pub fn documentation_probability(population: &Population, freelancer: AgentId, client: AgentId) -> f64 {
    let capacity = population
        .get(freelancer)
        .map_or(0.5, |a| a.numeric_or("administrative_capacity", 0.5));
    let (priority, resources) = population.get(client).map_or((0.5, 0.5), |a| {
        (
            a.numeric_or("compliance_priority", 0.5),
            a.numeric_or("legal_resources", 0.5),
        )
    });
    (0.2 + 0.4 * priority + 0.2 * resources + 0.2 * capacity).clamp(0.0, 1.0)
}

fn pick_weighted(candidates: &[(AgentId, f64)], draw: &mut dyn DrawSource) -> Option<AgentId> {
    let total: f64 = candidates.iter().map(|(_, w)| w).sum();
    if candidates.is_empty() || total <= 0.0 {
        return None;
    }
    let mut target = draw.next_f64() * total;
    for (id, weight) in candidates {
        target -= weight;
        if target < 0.0 {
            return Some(*id);
        }
    }
    candidates.last().map(|(id, _)| *id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::Agent;
    use crate::models::contract::ComplianceStatus;

    fn pair_population() -> Population {
        Population::from_agents(vec![
            Agent::new(AgentId(0), Role::Freelancer),
            Agent::new(AgentId(1), Role::Freelancer),
            Agent::new(AgentId(2), Role::Client),
            Agent::new(AgentId(3), Role::Client),
        ])
    }

    fn contract(f: u32, c: u32) -> Contract {
        Contract::new(AgentId(f), AgentId(c), 1_000, 0, Some(3), ComplianceStatus::Compliant)
    }

    #[test]
    fn test_rejects_self_loop() {
        let mut network = RelationshipNetwork::new(&pair_population());
        assert_eq!(
            network.add_edge(contract(0, 0)),
            Err(NetworkError::SelfLoop(AgentId(0)))
        );
    }

    #[test]
    fn test_rejects_duplicate() {
        let mut network = RelationshipNetwork::new(&pair_population());
        network.add_edge(contract(0, 2)).unwrap();
        assert!(matches!(
            network.add_edge(contract(0, 2)),
            Err(NetworkError::DuplicateEdge(_))
        ));
        assert_eq!(network.edge_count(), 1);
        assert_eq!(network.neighbors(AgentId(0)), &[AgentId(2)]);
    }

    #[test]
    fn test_rejects_same_role_and_unknown() {
        let mut network = RelationshipNetwork::new(&pair_population());
        assert!(matches!(
            network.add_edge(contract(0, 1)),
            Err(NetworkError::RoleMismatch(_))
        ));
        assert_eq!(
            network.add_edge(contract(0, 9)),
            Err(NetworkError::UnknownEndpoint(AgentId(9)))
        );
    }

    #[test]
    fn test_neighbors_keep_insertion_order() {
        let mut network = RelationshipNetwork::new(&pair_population());
        network.add_edge(contract(1, 3)).unwrap();
        network.add_edge(contract(0, 3)).unwrap();
        assert_eq!(network.neighbors(AgentId(3)), &[AgentId(1), AgentId(0)]);

        network.remove_edge(EdgeKey::new(AgentId(1), AgentId(3))).unwrap();
        assert_eq!(network.neighbors(AgentId(3)), &[AgentId(0)]);
        assert!(network.neighbors(AgentId(1)).is_empty());
    }

    #[test]
    fn test_remove_incident() {
        let mut network = RelationshipNetwork::new(&pair_population());
        network.add_edge(contract(0, 2)).unwrap();
        network.add_edge(contract(0, 3)).unwrap();
        network.add_edge(contract(1, 3)).unwrap();

        let removed = network.remove_incident(AgentId(0));
        assert_eq!(removed.len(), 2);
        assert_eq!(network.edge_count(), 1);
        assert!(network.neighbors(AgentId(2)).is_empty());
    }

    #[test]
    fn test_key_between_normalises() {
        let network = RelationshipNetwork::new(&pair_population());
        let key = EdgeKey::new(AgentId(1), AgentId(2));
        assert_eq!(network.key_between(AgentId(2), AgentId(1)), Some(key));
        assert_eq!(network.key_between(AgentId(0), AgentId(1)), None);
    }
}
