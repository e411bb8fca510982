//! Entity population
//!
//! Holds every agent of one trial, keyed by [`AgentId`]. Agents are created
//! once, at generation time, and stay in the map until the trial is torn
//! down; leaving the market only flips their status to `Exited`.
//!
//! # Critical Invariants
//!
//! 1. **Stable identity**: an id is assigned once and never reused
//! 2. **Deterministic order**: iteration is always by ascending id
//! 3. **Reproducibility**: same config + same seed → identical population

use crate::distributions::sample;
use crate::models::agent::{Agent, AgentId, AgentStatus, Role};
use crate::rng::{DrawSource, RngManager};
use crate::scenario::{ConfigurationError, PopulationConfig};
use std::collections::BTreeMap;

/// All agents of a single trial
///
/// # Example
///
/// ```
/// use gig_simulator_core_rs::models::Population;
/// use gig_simulator_core_rs::scenario::PopulationConfig;
///
/// let config = PopulationConfig {
///     population_size: 10,
///     client_share: 0.3,
///     ..PopulationConfig::default()
/// };
/// let population = Population::generate(&config, 42).unwrap();
/// assert_eq!(population.len(), 10);
/// assert_eq!(population.active_count(), 10);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    agents: BTreeMap<AgentId, Agent>,
}

impl Population {
    /// Build a population directly from agents (ids must be unique)
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        Self {
            agents: agents.into_iter().map(|a| (a.id(), a)).collect(),
        }
    }

    /// Generate a fresh population seeded from `seed`
    pub fn generate(config: &PopulationConfig, seed: u64) -> Result<Self, ConfigurationError> {
        let mut rng = RngManager::new(seed);
        Self::generate_with(config, &mut rng)
    }

    /// Generate a fresh population drawing from an existing stream
    ///
    /// Freelancers take ids `0..num_freelancers`, clients follow. Attributes
    /// are sampled agent by agent in id order, attribute names in sorted order.
    pub fn generate_with<D: DrawSource + ?Sized>(
        config: &PopulationConfig,
        draw: &mut D,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let num_freelancers = config.num_freelancers();
        let mut agents = BTreeMap::new();

        for index in 0..config.population_size {
            let id = AgentId(index as u32);
            let (role, attribute_specs) = if index < num_freelancers {
                (Role::Freelancer, &config.freelancer_attributes)
            } else {
                (Role::Client, &config.client_attributes)
            };

            let mut agent = Agent::new(id, role);
            for (attribute, distribution_name) in attribute_specs {
                let distribution = config.distributions.get(distribution_name).ok_or_else(|| {
                    ConfigurationError::UnknownDistribution {
                        attribute: attribute.clone(),
                        distribution: distribution_name.clone(),
                    }
                })?;
                agent = agent.with_attribute(attribute.clone(), sample(distribution, draw));
            }
            agents.insert(id, agent);
        }

        Ok(Self { agents })
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    /// All agents in ascending id order
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn agents_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.values_mut()
    }

    /// Active agents in ascending id order
    pub fn active_agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(|a| a.is_active())
    }

    /// Ids of active agents with the given role, ascending
    pub fn active_ids_with_role(&self, role: Role) -> Vec<AgentId> {
        self.active_agents()
            .filter(|a| a.role() == role)
            .map(Agent::id)
            .collect()
    }

    pub fn is_active(&self, id: AgentId) -> bool {
        self.agents.get(&id).is_some_and(Agent::is_active)
    }

    pub fn role_of(&self, id: AgentId) -> Option<Role> {
        self.agents.get(&id).map(Agent::role)
    }

    /// Total agents, including those who exited
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active_agents().count()
    }

    /// Mark an agent as having left the market at `tick`
    ///
    /// Returns `false` if the agent is unknown or already exited.
    pub fn mark_exited(&mut self, id: AgentId, tick: usize) -> bool {
        match self.agents.get_mut(&id) {
            Some(agent) if agent.is_active() => {
                agent.state_mut().status = AgentStatus::Exited { tick };
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(size: usize) -> PopulationConfig {
        PopulationConfig {
            population_size: size,
            client_share: 0.25,
            ..PopulationConfig::default()
        }
    }

    #[test]
    fn test_roles_assigned_by_id_range() {
        let population = Population::generate(&small_config(8), 1).unwrap();
        let roles: Vec<Role> = population.agents().map(Agent::role).collect();
        assert_eq!(&roles[..6], &[Role::Freelancer; 6]);
        assert_eq!(&roles[6..], &[Role::Client; 2]);
    }

    #[test]
    fn test_attributes_follow_role() {
        let population = Population::generate(&small_config(8), 1).unwrap();
        let freelancer = population.get(AgentId(0)).unwrap();
        let client = population.get(AgentId(7)).unwrap();

        assert!(freelancer.numeric("risk_tolerance").is_some());
        assert!(freelancer.numeric("compliance_priority").is_none());
        assert!(client.numeric("compliance_priority").is_some());
        assert!(client.category("client_type").is_some());
    }

    #[test]
    fn test_mark_exited_once() {
        let mut population = Population::generate(&small_config(4), 1).unwrap();
        assert!(population.mark_exited(AgentId(1), 3));
        assert!(!population.mark_exited(AgentId(1), 4));
        assert!(!population.mark_exited(AgentId(99), 4));
        assert_eq!(population.active_count(), 3);
        assert_eq!(population.len(), 4);
        assert_eq!(
            population.get(AgentId(1)).unwrap().state().status,
            AgentStatus::Exited { tick: 3 }
        );
    }
}
