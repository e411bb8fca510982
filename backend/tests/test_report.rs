//! Run reports and scenario JSON

use gig_simulator_core_rs::orchestrator::{MonteCarloEngine, RunReport, SimulationError};
use gig_simulator_core_rs::policy::PolicyConfig;
use gig_simulator_core_rs::scenario::{PopulationConfig, ScenarioConfig};
use gig_simulator_core_rs::{Metric, RegulatoryVariant};

fn small_config() -> ScenarioConfig {
    ScenarioConfig {
        seed: 99,
        num_trials: 4,
        ticks_per_trial: 6,
        population: PopulationConfig {
            population_size: 24,
            ..PopulationConfig::default()
        },
        ..ScenarioConfig::default()
    }
}

fn report_for(config: ScenarioConfig) -> RunReport {
    let records = MonteCarloEngine::new(config.clone()).unwrap().run();
    RunReport::new(config, records).unwrap()
}

#[test]
fn test_report_survives_json() {
    let report = report_for(small_config());
    assert_eq!(report.trials.len(), 4);
    assert_eq!(report.completed + report.aborted, 4);

    let json = report.to_json().unwrap();
    let restored = RunReport::from_json(&json).unwrap();
    assert_eq!(restored, report);
    assert!(restored.verify_config(&small_config()).is_ok());
}

#[test]
fn test_report_rejects_other_config() {
    let report = report_for(small_config());
    let other = ScenarioConfig {
        regulatory_variant: "baseline".to_string(),
        ..small_config()
    };
    match report.verify_config(&other) {
        Err(SimulationError::ConfigMismatch { expected, actual }) => {
            assert_eq!(expected, report.config_hash);
            assert_ne!(expected, actual);
        }
        other => panic!("expected mismatch, got {:?}", other),
    }
}

#[test]
fn test_run_ids_differ_but_hashes_match() {
    let a = report_for(small_config());
    let b = report_for(small_config());
    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.trials, b.trials);
}

#[test]
fn test_summarize_report() {
    let report = report_for(ScenarioConfig {
        policy: PolicyConfig::NoAction,
        ..small_config()
    });
    let summary = report.summarize(0.9).unwrap();
    assert_eq!(summary.completed_trials, 4);
    assert_eq!(summary.series(Metric::ActiveAgents).unwrap().len(), 6);
    assert_eq!(summary.get("active_agents", 0).unwrap().mean, 24.0);

    assert!(matches!(
        report.summarize(1.0),
        Err(SimulationError::Aggregation(_))
    ));
}

#[test]
fn test_partial_config_json_uses_defaults() {
    let json = r#"{
        "seed": 5,
        "num_trials": 3,
        "regulatory_variant": "sb988_strict",
        "population": { "population_size": 80 },
        "economics": { "mean_contract_duration": null }
    }"#;
    let config: ScenarioConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.seed, 5);
    assert_eq!(config.population.population_size, 80);
    assert_eq!(
        config.population.client_share,
        PopulationConfig::default().client_share
    );
    assert_eq!(config.economics.mean_contract_duration, None);
    assert_eq!(config.ticks_per_trial, ScenarioConfig::default().ticks_per_trial);

    let scenario = config.validate().unwrap();
    assert_eq!(scenario.rules().variant, RegulatoryVariant::Sb988Strict);
}

#[test]
fn test_policy_config_is_tagged() {
    let json = r#"{ "policy": { "type": "random_churn", "terminate_probability": 0.1, "propose_probability": 0.4 } }"#;
    let config: ScenarioConfig = serde_json::from_str(json).unwrap();
    assert_eq!(
        config.policy,
        PolicyConfig::RandomChurn {
            terminate_probability: 0.1,
            propose_probability: 0.4
        }
    );
    assert_eq!(config.policy.build().name(), "random_churn");
}

#[test]
fn test_malformed_report_json() {
    assert!(matches!(
        RunReport::from_json(r#"{"run_id": 3}"#),
        Err(SimulationError::Serialization(_))
    ));
}
