//! Entity population generation

use gig_simulator_core_rs::distributions::AttributeDistribution;
use gig_simulator_core_rs::models::{AgentId, Population, Role};
use gig_simulator_core_rs::scenario::{ConfigurationError, PopulationConfig};
use proptest::prelude::*;

fn config(size: usize) -> PopulationConfig {
    PopulationConfig {
        population_size: size,
        ..PopulationConfig::default()
    }
}

// ============================================================================
// Sizes and roles
// ============================================================================

#[test]
fn test_fifty_agents_split_by_client_share() {
    let population = Population::generate(&config(50), 42).unwrap();

    assert_eq!(population.len(), 50);
    assert_eq!(population.active_ids_with_role(Role::Client).len(), 15);
    assert_eq!(population.active_ids_with_role(Role::Freelancer).len(), 35);
    assert_eq!(population.role_of(AgentId(34)), Some(Role::Freelancer));
    assert_eq!(population.role_of(AgentId(35)), Some(Role::Client));
    assert_eq!(population.role_of(AgentId(50)), None);
}

#[test]
fn test_iteration_is_by_ascending_id() {
    let population = Population::generate(&config(25), 3).unwrap();
    let ids: Vec<u32> = population.agents().map(|a| a.id().0).collect();
    assert_eq!(ids, (0..25).collect::<Vec<_>>());
}

// ============================================================================
// Reproducibility
// ============================================================================

#[test]
fn test_same_seed_same_population() {
    let a = Population::generate(&config(40), 7).unwrap();
    let b = Population::generate(&config(40), 7).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_different_seed_different_attributes() {
    let a = Population::generate(&config(40), 7).unwrap();
    let b = Population::generate(&config(40), 8).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_generation_does_not_mutate_config() {
    let original = config(10);
    let copy = original.clone();
    Population::generate(&original, 1).unwrap();
    assert_eq!(original, copy);
}

// ============================================================================
// Attribute sampling
// ============================================================================

#[test]
fn test_behavioral_scales_stay_in_unit_interval() {
    let population = Population::generate(&config(200), 11).unwrap();
    for agent in population.agents() {
        let names: &[&str] = match agent.role() {
            Role::Freelancer => &["risk_tolerance", "administrative_capacity", "negotiation_skill"],
            Role::Client => &["compliance_priority", "legal_resources", "risk_aversion"],
        };
        for name in names {
            let value = agent.numeric(name).unwrap();
            assert!((0.0..=1.0).contains(&value), "{} = {}", name, value);
        }
    }
}

#[test]
fn test_constant_distribution_applies_to_every_agent() {
    let mut config = config(6);
    config
        .distributions
        .insert("fixed".to_string(), AttributeDistribution::Constant { value: 0.25 });
    config
        .freelancer_attributes
        .insert("risk_tolerance".to_string(), "fixed".to_string());

    let population = Population::generate(&config, 5).unwrap();
    for id in population.active_ids_with_role(Role::Freelancer) {
        assert_eq!(population.get(id).unwrap().numeric("risk_tolerance"), Some(0.25));
    }
}

// ============================================================================
// Configuration errors
// ============================================================================

#[test]
fn test_zero_population_rejected() {
    assert_eq!(
        Population::generate(&config(0), 1).unwrap_err(),
        ConfigurationError::EmptyPopulation
    );
}

#[test]
fn test_unknown_distribution_rejected() {
    let mut config = config(10);
    config
        .client_attributes
        .insert("bargaining_power".to_string(), "pareto".to_string());

    assert_eq!(
        Population::generate(&config, 1).unwrap_err(),
        ConfigurationError::UnknownDistribution {
            attribute: "bargaining_power".to_string(),
            distribution: "pareto".to_string(),
        }
    );
}

#[test]
fn test_invalid_distribution_parameters_rejected() {
    let mut config = config(10);
    config.distributions.insert(
        "broken".to_string(),
        AttributeDistribution::Uniform { min: 2.0, max: 1.0 },
    );
    assert!(matches!(
        Population::generate(&config, 1),
        Err(ConfigurationError::InvalidDistribution { .. })
    ));
}

proptest! {
    #[test]
    fn prop_role_counts_add_up(size in 1usize..120, share in 0.0f64..=1.0, seed in any::<u64>()) {
        let config = PopulationConfig {
            population_size: size,
            client_share: share,
            ..PopulationConfig::default()
        };
        let population = Population::generate(&config, seed).unwrap();
        let clients = population.active_ids_with_role(Role::Client).len();
        let freelancers = population.active_ids_with_role(Role::Freelancer).len();

        prop_assert_eq!(population.len(), size);
        prop_assert_eq!(clients + freelancers, size);
        prop_assert_eq!(clients, config.num_clients());
    }
}
