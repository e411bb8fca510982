//! Regulatory variants
//!
//! The set of compliance regimes is closed: a scenario names one of the
//! identifiers below and validation resolves it, together with the
//! scenario's economic parameters, into concrete [`RegulatoryRules`].
//! Unknown identifiers never reach a running trial.

use super::config::{ConfigurationError, EconomicParameters};
use crate::models::contract::ComplianceStatus;
use crate::rng::DrawSource;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known compliance regimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegulatoryVariant {
    /// No written-contract requirement, no compliance cost, no enforcement
    Baseline,

    /// Written contracts required; administrative cost per contract and
    /// probabilistic audits of non-compliant contracts after a grace period
    Sb988,

    /// Doubled administrative cost, doubled audit probability, no grace period
    Sb988Strict,
}

impl RegulatoryVariant {
    pub const ALL: [RegulatoryVariant; 3] = [
        RegulatoryVariant::Baseline,
        RegulatoryVariant::Sb988,
        RegulatoryVariant::Sb988Strict,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RegulatoryVariant::Baseline => "baseline",
            RegulatoryVariant::Sb988 => "sb988",
            RegulatoryVariant::Sb988Strict => "sb988_strict",
        }
    }
}

impl fmt::Display for RegulatoryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegulatoryVariant {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegulatoryVariant::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ConfigurationError::UnknownRegulatoryVariant(s.to_string()))
    }
}

/// Resolved compliance rules used by policies and the trial commit step
///
/// # Example
/// ```
/// use gig_simulator_core_rs::scenario::{EconomicParameters, RegulatoryRules, RegulatoryVariant};
///
/// let economics = EconomicParameters::default();
/// let rules = RegulatoryRules::resolve(RegulatoryVariant::Baseline, &economics);
/// assert!(!rules.in_force(100));
/// assert_eq!(rules.admin_cost_per_contract, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryRules {
    pub variant: RegulatoryVariant,

    /// Whether contracts must be documented to count as compliant
    pub written_contracts_required: bool,

    /// Administrative cost per compliant contract per tick (cents),
    /// split evenly between freelancer and client
    pub admin_cost_per_contract: i64,

    /// Per-tick probability a non-compliant contract past grace is audited
    pub audit_probability: f64,

    /// Penalty charged to the client per failed audit (cents)
    pub penalty_per_violation: i64,

    /// Contract age (ticks) before audits apply
    pub grace_period_ticks: usize,

    /// First tick at which the rules apply
    pub enforcement_start_tick: usize,
}

impl RegulatoryRules {
    pub fn resolve(variant: RegulatoryVariant, economics: &EconomicParameters) -> Self {
        match variant {
            RegulatoryVariant::Baseline => Self {
                variant,
                written_contracts_required: false,
                admin_cost_per_contract: 0,
                audit_probability: 0.0,
                penalty_per_violation: 0,
                grace_period_ticks: 0,
                enforcement_start_tick: economics.enforcement_start_tick,
            },
            RegulatoryVariant::Sb988 => Self {
                variant,
                written_contracts_required: true,
                admin_cost_per_contract: economics.admin_cost_per_contract,
                audit_probability: economics.enforcement_level,
                penalty_per_violation: economics.penalty_per_violation,
                grace_period_ticks: economics.grace_period_ticks,
                enforcement_start_tick: economics.enforcement_start_tick,
            },
            RegulatoryVariant::Sb988Strict => Self {
                variant,
                written_contracts_required: true,
                admin_cost_per_contract: economics.admin_cost_per_contract.saturating_mul(2),
                audit_probability: (economics.enforcement_level * 2.0).min(1.0),
                penalty_per_violation: economics.penalty_per_violation,
                grace_period_ticks: 0,
                enforcement_start_tick: economics.enforcement_start_tick,
            },
        }
    }

    /// Whether compliance rules bind at `tick`
    pub fn in_force(&self, tick: usize) -> bool {
        self.written_contracts_required && tick >= self.enforcement_start_tick
    }

    /// Whether a contract of age `age_ticks` can be audited at `tick`
    pub fn auditable(&self, tick: usize, age_ticks: usize) -> bool {
        self.in_force(tick) && age_ticks >= self.grace_period_ticks
    }

    /// Compliance status a contract receives when formed or resolved at `tick`
    ///
    /// `documentation_probability` is the chance the parties paper the deal;
    /// one draw is consumed only while the rules are in force.
    pub fn initial_status(
        &self,
        tick: usize,
        documentation_probability: f64,
        draw: &mut dyn DrawSource,
    ) -> ComplianceStatus {
        if !self.written_contracts_required {
            ComplianceStatus::Compliant
        } else if !self.in_force(tick) {
            ComplianceStatus::PendingReview
        } else if draw.chance(documentation_probability) {
            ComplianceStatus::Compliant
        } else {
            ComplianceStatus::NonCompliant
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngManager;

    #[test]
    fn test_parse_known_variants() {
        for variant in RegulatoryVariant::ALL {
            assert_eq!(variant.as_str().parse::<RegulatoryVariant>().unwrap(), variant);
        }
    }

    #[test]
    fn test_unknown_variant_rejected() {
        let err = "ab5".parse::<RegulatoryVariant>().unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownRegulatoryVariant("ab5".into()));
    }

    #[test]
    fn test_strict_doubles_cost_and_drops_grace() {
        let economics = EconomicParameters {
            admin_cost_per_contract: 300,
            enforcement_level: 0.4,
            grace_period_ticks: 6,
            ..EconomicParameters::default()
        };
        let normal = RegulatoryRules::resolve(RegulatoryVariant::Sb988, &economics);
        let strict = RegulatoryRules::resolve(RegulatoryVariant::Sb988Strict, &economics);

        assert_eq!(strict.admin_cost_per_contract, 2 * normal.admin_cost_per_contract);
        assert_eq!(strict.audit_probability, 0.8);
        assert_eq!(strict.grace_period_ticks, 0);
        assert_eq!(normal.grace_period_ticks, 6);
    }

    #[test]
    fn test_pending_before_enforcement_start() {
        let economics = EconomicParameters {
            enforcement_start_tick: 5,
            ..EconomicParameters::default()
        };
        let rules = RegulatoryRules::resolve(RegulatoryVariant::Sb988, &economics);
        let mut rng = RngManager::new(1);

        assert_eq!(rules.initial_status(2, 1.0, &mut rng), ComplianceStatus::PendingReview);
        assert_eq!(rules.initial_status(5, 1.0, &mut rng), ComplianceStatus::Compliant);
        assert_eq!(rules.initial_status(5, 0.0, &mut rng), ComplianceStatus::NonCompliant);
    }

    #[test]
    fn test_baseline_contracts_always_compliant() {
        let rules = RegulatoryRules::resolve(RegulatoryVariant::Baseline, &EconomicParameters::default());
        let mut rng = RngManager::new(1);
        assert_eq!(rules.initial_status(0, 0.0, &mut rng), ComplianceStatus::Compliant);
        assert!(!rules.auditable(50, 50));
    }
}
