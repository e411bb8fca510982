//! Attribute distributions for synthetic population generation.
//!
//! Scenarios declare named distributions once and reference them by name
//! from each role's attribute list. Sampling is deterministic: it only
//! consumes draws from the supplied [`DrawSource`].
//!
//! # Example
//!
//! ```
//! use gig_simulator_core_rs::distributions::{sample, AttributeDistribution};
//! use gig_simulator_core_rs::rng::RngManager;
//! use gig_simulator_core_rs::AttributeValue;
//!
//! let mut rng = RngManager::new(42);
//! let dist = AttributeDistribution::Uniform { min: 0.2, max: 0.8 };
//! match sample(&dist, &mut rng) {
//!     AttributeValue::Numeric(v) => assert!((0.2..0.8).contains(&v)),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use crate::models::agent::AttributeValue;
use crate::rng::DrawSource;
use crate::scenario::ConfigurationError;
use serde::{Deserialize, Serialize};

/// One labelled outcome of a categorical distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedChoice {
    pub label: String,
    pub weight: f64,
}

/// Distribution types for agent attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeDistribution {
    /// Always the same value
    Constant { value: f64 },

    /// Uniform on `[min, max)`
    Uniform { min: f64, max: f64 },

    /// Normal with mean and standard deviation
    Normal { mean: f64, std_dev: f64 },

    /// Log-normal; `mean` and `std_dev` are in log space
    LogNormal { mean: f64, std_dev: f64 },

    /// Exponential with rate parameter
    Exponential { rate: f64 },

    /// Beta on `[0, 1]`, for behavioural scales
    Beta { alpha: f64, beta: f64 },

    /// Boolean flag, true with probability `p`
    Bernoulli { p: f64 },

    /// Label drawn proportionally to weight
    Categorical { choices: Vec<WeightedChoice> },

    /// Numeric distribution with its samples clamped to `[min, max]`
    Clamped {
        base: Box<AttributeDistribution>,
        min: f64,
        max: f64,
    },
}

impl AttributeDistribution {
    /// Check parameters; `name` is the scenario-level distribution name
    pub fn validate(&self, name: &str) -> Result<(), ConfigurationError> {
        let invalid = |reason: &str| ConfigurationError::InvalidDistribution {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        match self {
            AttributeDistribution::Constant { value } => {
                if !value.is_finite() {
                    return Err(invalid("value must be finite"));
                }
            }
            AttributeDistribution::Uniform { min, max } => {
                if !(min.is_finite() && max.is_finite()) || min >= max {
                    return Err(invalid("uniform requires finite min < max"));
                }
            }
            AttributeDistribution::Normal { mean, std_dev }
            | AttributeDistribution::LogNormal { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() || *std_dev < 0.0 {
                    return Err(invalid("std_dev must be finite and non-negative"));
                }
            }
            AttributeDistribution::Exponential { rate } => {
                if !rate.is_finite() || *rate <= 0.0 {
                    return Err(invalid("rate must be positive"));
                }
            }
            AttributeDistribution::Beta { alpha, beta } => {
                if !(alpha.is_finite() && beta.is_finite()) || *alpha <= 0.0 || *beta <= 0.0 {
                    return Err(invalid("alpha and beta must be positive"));
                }
            }
            AttributeDistribution::Bernoulli { p } => {
                if !(0.0..=1.0).contains(p) {
                    return Err(invalid("p must lie in [0, 1]"));
                }
            }
            AttributeDistribution::Categorical { choices } => {
                if choices.is_empty() {
                    return Err(invalid("categorical needs at least one choice"));
                }
                if choices.iter().any(|c| !c.weight.is_finite() || c.weight < 0.0) {
                    return Err(invalid("weights must be finite and non-negative"));
                }
                if choices.iter().map(|c| c.weight).sum::<f64>() <= 0.0 {
                    return Err(invalid("weights must not all be zero"));
                }
            }
            AttributeDistribution::Clamped { base, min, max } => {
                if !(min.is_finite() && max.is_finite()) || min > max {
                    return Err(invalid("clamp requires finite min <= max"));
                }
                if !base.is_numeric() {
                    return Err(invalid("only numeric distributions can be clamped"));
                }
                base.validate(name)?;
            }
        }
        Ok(())
    }

    /// Whether samples are [`AttributeValue::Numeric`]
    pub fn is_numeric(&self) -> bool {
        !matches!(
            self,
            AttributeDistribution::Bernoulli { .. } | AttributeDistribution::Categorical { .. }
        )
    }
}

/// Draw one attribute value from `distribution`.
///
/// Assumes the distribution passed [`AttributeDistribution::validate`].
pub fn sample<D: DrawSource + ?Sized>(
    distribution: &AttributeDistribution,
    draw: &mut D,
) -> AttributeValue {
    match distribution {
        AttributeDistribution::Bernoulli { p } => AttributeValue::Flag(draw.chance(*p)),
        AttributeDistribution::Categorical { choices } => {
            AttributeValue::Categorical(select_weighted(choices, draw))
        }
        numeric => AttributeValue::Numeric(sample_numeric(numeric, draw)),
    }
}

fn sample_numeric<D: DrawSource + ?Sized>(distribution: &AttributeDistribution, draw: &mut D) -> f64 {
    match distribution {
        AttributeDistribution::Constant { value } => *value,
        AttributeDistribution::Uniform { min, max } => min + (max - min) * draw.next_f64(),
        AttributeDistribution::Normal { mean, std_dev } => mean + std_dev * draw.standard_normal(),
        AttributeDistribution::LogNormal { mean, std_dev } => {
            (mean + std_dev * draw.standard_normal()).exp()
        }
        AttributeDistribution::Exponential { rate } => {
            let u = 1.0 - draw.next_f64();
            -u.ln() / rate
        }
        AttributeDistribution::Beta { alpha, beta } => {
            let x = sample_gamma(*alpha, draw);
            let y = sample_gamma(*beta, draw);
            if x + y > 0.0 {
                x / (x + y)
            } else {
                0.5
            }
        }
        AttributeDistribution::Clamped { base, min, max } => {
            sample_numeric(base, draw).clamp(*min, *max)
        }
        AttributeDistribution::Bernoulli { p } => {
            if draw.chance(*p) {
                1.0
            } else {
                0.0
            }
        }
        AttributeDistribution::Categorical { .. } => f64::NAN,
    }
}

fn select_weighted<D: DrawSource + ?Sized>(choices: &[WeightedChoice], draw: &mut D) -> String {
    let total: f64 = choices.iter().map(|c| c.weight).sum();
    let mut target = draw.next_f64() * total;

    for choice in choices {
        target -= choice.weight;
        if target < 0.0 {
            return choice.label.clone();
        }
    }

    // Rounding left a sliver of mass: fall back to the last weighted label
    choices
        .iter()
        .rev()
        .find(|c| c.weight > 0.0)
        .map(|c| c.label.clone())
        .unwrap_or_default()
}

/// Gamma(shape, 1) via Marsaglia-Tsang squeeze
fn sample_gamma<D: DrawSource + ?Sized>(shape: f64, draw: &mut D) -> f64 {
    if shape < 1.0 {
        // Boost: Gamma(a) = Gamma(a + 1) * U^(1/a)
        let u = 1.0 - draw.next_f64();
        return sample_gamma(shape + 1.0, draw) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let z = draw.standard_normal();
        let v = 1.0 + c * z;
        if v <= 0.0 {
            continue;
        }
        let v = v * v * v;
        let u = 1.0 - draw.next_f64();
        if u.ln() < 0.5 * z * z + d - d * v + d * v.ln() {
            return d * v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngManager;

    fn numeric(value: AttributeValue) -> f64 {
        value.as_f64().expect("numeric sample")
    }

    #[test]
    fn test_sampling_deterministic() {
        let dist = AttributeDistribution::LogNormal {
            mean: 3.9,
            std_dev: 0.4,
        };
        let mut rng1 = RngManager::new(42);
        let mut rng2 = RngManager::new(42);
        for _ in 0..100 {
            assert_eq!(sample(&dist, &mut rng1), sample(&dist, &mut rng2));
        }
    }

    #[test]
    fn test_beta_in_unit_interval() {
        let dist = AttributeDistribution::Beta { alpha: 0.5, beta: 2.0 };
        let mut rng = RngManager::new(7);
        for _ in 0..500 {
            let v = numeric(sample(&dist, &mut rng));
            assert!((0.0..=1.0).contains(&v), "beta sample {} out of range", v);
        }
    }

    #[test]
    fn test_beta_mean_roughly_correct() {
        let dist = AttributeDistribution::Beta { alpha: 2.0, beta: 6.0 };
        let mut rng = RngManager::new(11);
        let n = 5000;
        let mean: f64 = (0..n).map(|_| numeric(sample(&dist, &mut rng))).sum::<f64>() / n as f64;
        assert!((mean - 0.25).abs() < 0.02, "mean {}", mean);
    }

    #[test]
    fn test_clamped_respects_bounds() {
        let dist = AttributeDistribution::Clamped {
            base: Box::new(AttributeDistribution::Normal {
                mean: 0.5,
                std_dev: 5.0,
            }),
            min: 0.0,
            max: 1.0,
        };
        let mut rng = RngManager::new(3);
        for _ in 0..200 {
            let v = numeric(sample(&dist, &mut rng));
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_categorical_skips_zero_weight() {
        let dist = AttributeDistribution::Categorical {
            choices: vec![
                WeightedChoice {
                    label: "never".into(),
                    weight: 0.0,
                },
                WeightedChoice {
                    label: "always".into(),
                    weight: 1.0,
                },
            ],
        };
        let mut rng = RngManager::new(5);
        for _ in 0..100 {
            assert_eq!(sample(&dist, &mut rng).as_str(), Some("always"));
        }
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let cases = vec![
            AttributeDistribution::Uniform { min: 1.0, max: 1.0 },
            AttributeDistribution::Normal {
                mean: 0.0,
                std_dev: -1.0,
            },
            AttributeDistribution::Exponential { rate: 0.0 },
            AttributeDistribution::Beta { alpha: 0.0, beta: 1.0 },
            AttributeDistribution::Bernoulli { p: 1.5 },
            AttributeDistribution::Categorical { choices: vec![] },
            AttributeDistribution::Clamped {
                base: Box::new(AttributeDistribution::Bernoulli { p: 0.5 }),
                min: 0.0,
                max: 1.0,
            },
        ];
        for dist in cases {
            assert!(
                matches!(
                    dist.validate("bad"),
                    Err(ConfigurationError::InvalidDistribution { .. })
                ),
                "{:?} should be rejected",
                dist
            );
        }
    }
}
