//! Result aggregation
//!
//! Reduces a set of [`TrialRecord`]s to per-metric, per-tick summary
//! statistics. Only `Completed` trials contribute; aborted trials are
//! counted, by reason code, and otherwise ignored.
//!
//! # Critical Invariants
//!
//! - **Order independence**: records are sorted by trial index first, so
//!   the order in which trials finished never changes the result
//! - **Exact constants**: a metric with the same value `v` in every trial
//!   summarizes to mean `v` and standard deviation `0` exactly
//! - **Read-only**: input records are never modified

use crate::orchestrator::metrics::Metric;
use crate::orchestrator::trial::TrialRecord;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AggregationError {
    #[error("Insufficient data: {completed} completed trials")]
    InsufficientData { completed: usize },

    #[error("Confidence level must lie strictly between 0 and 1, got {0}")]
    InvalidConfidenceLevel(f64),

    #[error("Statistics error: {0}")]
    Statistics(String),
}

/// Two-sided Student-t interval around a sample mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Statistics of one metric at one tick index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: usize,

    /// Completed trials contributing a value at this tick
    pub n: usize,

    pub mean: f64,

    /// Sample standard deviation (`n - 1`); `None` when `n == 1`
    pub std_dev: Option<f64>,

    /// `None` when `n == 1`: the interval is undefined
    pub interval: Option<ConfidenceInterval>,
}

/// Cross-trial summary keyed by metric name and tick index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub confidence_level: f64,
    pub completed_trials: usize,
    pub aborted_trials: usize,

    /// Aborted trial count per reason code
    pub abort_reasons: BTreeMap<String, usize>,

    /// Metric name → one summary per tick index
    pub metrics: BTreeMap<String, Vec<TickSummary>>,
}

impl AggregateResult {
    pub fn get(&self, metric: &str, tick: usize) -> Option<&TickSummary> {
        self.metrics.get(metric)?.get(tick)
    }

    pub fn series(&self, metric: Metric) -> Option<&[TickSummary]> {
        self.metrics.get(metric.name()).map(Vec::as_slice)
    }

    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }
}

/// Summarize trial records
///
/// # Errors
/// - `InvalidConfidenceLevel` unless `0 < confidence_level < 1`
/// - `InsufficientData` when no record is `Completed`
///
/// # Example
///
/// ```
/// use gig_simulator_core_rs::aggregate::{summarize, AggregationError};
///
/// let err = summarize(&[], 0.95).unwrap_err();
/// assert_eq!(err, AggregationError::InsufficientData { completed: 0 });
/// ```
pub fn summarize(
    records: &[TrialRecord],
    confidence_level: f64,
) -> Result<AggregateResult, AggregationError> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(AggregationError::InvalidConfidenceLevel(confidence_level));
    }

    let mut sorted: Vec<&TrialRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.trial_index);

    let mut completed = Vec::new();
    let mut abort_reasons: BTreeMap<String, usize> = BTreeMap::new();
    for record in sorted {
        match record.abort_reason() {
            None => completed.push(record),
            Some(reason) => *abort_reasons.entry(reason.code().to_string()).or_default() += 1,
        }
    }

    if completed.is_empty() {
        return Err(AggregationError::InsufficientData { completed: 0 });
    }

    let horizon = completed.iter().map(|r| r.ticks.len()).max().unwrap_or(0);
    let mut critical_values = CriticalValues::new(confidence_level);
    let mut metrics = BTreeMap::new();

    for metric in Metric::ALL {
        let mut series = Vec::with_capacity(horizon);
        for tick in 0..horizon {
            let values: Vec<f64> = completed
                .iter()
                .filter_map(|r| r.ticks.get(tick))
                .map(|t| t.value(metric))
                .collect();
            series.push(summarize_values(tick, &values, &mut critical_values)?);
        }
        metrics.insert(metric.name().to_string(), series);
    }

    Ok(AggregateResult {
        confidence_level,
        completed_trials: completed.len(),
        aborted_trials: abort_reasons.values().sum(),
        abort_reasons,
        metrics,
    })
}

fn summarize_values(
    tick: usize,
    values: &[f64],
    critical_values: &mut CriticalValues,
) -> Result<TickSummary, AggregationError> {
    let n = values.len();
    let first = values.first().copied().unwrap_or(0.0);

    // Constant series: no floating point drift
    if values.iter().all(|v| *v == first) {
        let level = critical_values.level;
        return Ok(TickSummary {
            tick,
            n,
            mean: first,
            std_dev: (n > 1).then_some(0.0),
            interval: (n > 1).then_some(ConfidenceInterval {
                level,
                lower: first,
                upper: first,
            }),
        });
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_dev = variance.sqrt();
    let half_width = critical_values.get(n - 1)? * std_dev / (n as f64).sqrt();

    Ok(TickSummary {
        tick,
        n,
        mean,
        std_dev: Some(std_dev),
        interval: Some(ConfidenceInterval {
            level: critical_values.level,
            lower: mean - half_width,
            upper: mean + half_width,
        }),
    })
}

/// Two-sided t critical values, memoised by degrees of freedom
struct CriticalValues {
    level: f64,
    cache: BTreeMap<usize, f64>,
}

impl CriticalValues {
    fn new(level: f64) -> Self {
        Self {
            level,
            cache: BTreeMap::new(),
        }
    }

    fn get(&mut self, df: usize) -> Result<f64, AggregationError> {
        if let Some(t) = self.cache.get(&df) {
            return Ok(*t);
        }
        let dist = StudentsT::new(0.0, 1.0, df as f64)
            .map_err(|e| AggregationError::Statistics(e.to_string()))?;
        let t = dist.inverse_cdf(1.0 - (1.0 - self.level) / 2.0);
        self.cache.insert(df, t);
        Ok(t)
    }
}
