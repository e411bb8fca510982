//! Behavior policies against hand-built snapshots

use gig_simulator_core_rs::models::{
    Agent, AgentId, AttributeValue, ComplianceStatus, Contract, Population, RelationshipNetwork, Role,
};
use gig_simulator_core_rs::policy::{
    Action, BehaviorPolicy, ComplianceAwarePolicy, LocalContext, MarketSignals, NoActionPolicy,
    RandomChurnPolicy,
};
use gig_simulator_core_rs::rng::RngManager;
use gig_simulator_core_rs::scenario::{EconomicParameters, RegulatoryRules, RegulatoryVariant};

/// Freelancers 0 and 1 both contracted to client 2; freelancer 3 idle
fn market_fixture(compliance: ComplianceStatus, value: i64) -> (Population, RelationshipNetwork) {
    let population = Population::from_agents(vec![
        Agent::new(AgentId(0), Role::Freelancer)
            .with_attribute("negotiation_skill", AttributeValue::Numeric(1.0))
            .with_attribute("administrative_capacity", AttributeValue::Numeric(1.0)),
        Agent::new(AgentId(1), Role::Freelancer),
        Agent::new(AgentId(2), Role::Client)
            .with_attribute("compliance_priority", AttributeValue::Numeric(1.0)),
        Agent::new(AgentId(3), Role::Freelancer),
    ]);
    let mut network = RelationshipNetwork::new(&population);
    for freelancer in [0, 1] {
        network
            .add_edge(Contract::new(
                AgentId(freelancer),
                AgentId(2),
                value,
                0,
                Some(20),
                compliance,
            ))
            .unwrap();
    }
    (population, network)
}

fn decide(
    policy: &dyn BehaviorPolicy,
    population: &Population,
    network: &RelationshipNetwork,
    agent: AgentId,
    candidate: Option<AgentId>,
    variant: RegulatoryVariant,
    seed: u64,
) -> Action {
    let economics = EconomicParameters::default();
    let rules = RegulatoryRules::resolve(variant, &economics);
    let market = MarketSignals::observe(network, &economics, 1);
    let agent = population.get(agent).unwrap();
    let context = LocalContext::build(agent, 1, population, network, candidate, &market, &economics);
    let mut rng = RngManager::new(seed);
    policy.decide(agent, &context, &rules, &mut rng)
}

// ============================================================================
// Context
// ============================================================================

#[test]
fn test_context_lists_neighbors_in_insertion_order() {
    let (population, network) = market_fixture(ComplianceStatus::Compliant, 30_000);
    let economics = EconomicParameters::default();
    let market = MarketSignals::observe(&network, &economics, 0);
    let client = population.get(AgentId(2)).unwrap();
    let context = LocalContext::build(client, 0, &population, &network, None, &market, &economics);

    let ids: Vec<AgentId> = context.neighbors.iter().map(|n| n.agent.id()).collect();
    assert_eq!(ids, vec![AgentId(0), AgentId(1)]);
    assert_eq!(context.contracted_value(), 60_000);
    assert_eq!(market.active_contracts, 2);
    assert_eq!(market.average_contract_value, 30_000.0);
}

// ============================================================================
// Built-in policies
// ============================================================================

#[test]
fn test_no_action_policy() {
    let (population, network) = market_fixture(ComplianceStatus::NonCompliant, 1);
    for id in 0..4 {
        let action = decide(
            &NoActionPolicy,
            &population,
            &network,
            AgentId(id),
            Some(AgentId(2)),
            RegulatoryVariant::Sb988Strict,
            id as u64,
        );
        assert_eq!(action, Action::NoAction);
    }
}

#[test]
fn test_random_churn_terminates_existing_contract() {
    let (population, network) = market_fixture(ComplianceStatus::Compliant, 30_000);
    let policy = RandomChurnPolicy::new(1.0, 0.0);
    let action = decide(
        &policy,
        &population,
        &network,
        AgentId(2),
        None,
        RegulatoryVariant::Baseline,
        5,
    );
    match action {
        Action::TerminateContract { counterparty } => {
            assert!(counterparty == AgentId(0) || counterparty == AgentId(1))
        }
        other => panic!("expected termination, got {:?}", other),
    }
}

#[test]
fn test_random_churn_proposes_to_candidate() {
    let (population, network) = market_fixture(ComplianceStatus::Compliant, 30_000);
    let policy = RandomChurnPolicy::new(0.0, 1.0);
    let action = decide(
        &policy,
        &population,
        &network,
        AgentId(3),
        Some(AgentId(2)),
        RegulatoryVariant::Baseline,
        5,
    );
    match action {
        Action::ProposeContract {
            counterparty,
            value,
            duration,
        } => {
            assert_eq!(counterparty, AgentId(2));
            assert!(value > 0);
            // No mean duration configured: open-ended
            assert_eq!(duration, None);
        }
        other => panic!("expected proposal, got {:?}", other),
    }

    // Nobody met, nothing to drop
    let idle = decide(
        &policy,
        &population,
        &network,
        AgentId(3),
        None,
        RegulatoryVariant::Baseline,
        5,
    );
    assert_eq!(idle, Action::NoAction);
}

#[test]
fn test_compliance_aware_client_repapers_non_compliant_contract() {
    let (population, network) = market_fixture(ComplianceStatus::NonCompliant, 30_000);
    let action = decide(
        &ComplianceAwarePolicy::new(6, 3, 0.85),
        &population,
        &network,
        AgentId(2),
        None,
        RegulatoryVariant::Sb988,
        1,
    );
    assert_eq!(
        action,
        Action::RenegotiateTerms {
            counterparty: AgentId(0),
            new_value: 30_000
        }
    );
}

#[test]
fn test_compliance_aware_freelancer_renegotiates_underpaid_contract() {
    let (population, network) = market_fixture(ComplianceStatus::Compliant, 10_000);
    let action = decide(
        &ComplianceAwarePolicy::new(6, 3, 0.85),
        &population,
        &network,
        AgentId(0),
        None,
        RegulatoryVariant::Baseline,
        1,
    );
    assert_eq!(
        action,
        Action::RenegotiateTerms {
            counterparty: AgentId(2),
            new_value: 10_500
        }
    );
}

#[test]
fn test_policies_are_reproducible_from_the_stream() {
    let (population, network) = market_fixture(ComplianceStatus::Compliant, 30_000);
    let policy = RandomChurnPolicy::new(0.5, 0.5);
    for seed in 0..20 {
        let a = decide(&policy, &population, &network, AgentId(1), Some(AgentId(2)), RegulatoryVariant::Sb988, seed);
        let b = decide(&policy, &population, &network, AgentId(1), Some(AgentId(2)), RegulatoryVariant::Sb988, seed);
        assert_eq!(a, b);
    }
}
