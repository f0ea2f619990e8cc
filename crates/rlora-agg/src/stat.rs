use rlora_core::errors::{AggError, ErrorInfo};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided normal critical value for a 95% interval.
pub const Z_95: f64 = 1.96;

/// Summary statistics for one sample group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    /// Number of samples.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (n - 1 divisor), zero for a single sample.
    pub std: f64,
    /// Lower and upper bound of the 95% confidence interval for the mean.
    pub ci95: [f64; 2],
}

/// Critical value family used for the confidence interval margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    /// Normal approximation with z = 1.96.
    #[default]
    Normal,
    /// Student-t quantile with n - 1 degrees of freedom.
    StudentT,
}

impl Interval {
    fn critical_value(self, count: usize) -> f64 {
        match self {
            Interval::Normal => Z_95,
            Interval::StudentT => {
                if count < 2 {
                    return 0.0;
                }
                StudentsT::new(0.0, 1.0, (count - 1) as f64)
                    .map(|dist| dist.inverse_cdf(0.975))
                    .unwrap_or(Z_95)
            }
        }
    }
}

/// Computes count, mean, sample std and a normal 95% interval.
pub fn compute_stats(values: &[f64]) -> Result<StatSummary, AggError> {
    compute_stats_with(values, Interval::Normal)
}

/// Computes summary statistics using the requested interval family.
pub fn compute_stats_with(values: &[f64], interval: Interval) -> Result<StatSummary, AggError> {
    if values.is_empty() {
        return Err(AggError::EmptySampleSet(ErrorInfo::new(
            "rlora_agg.stats_empty",
            "no values to aggregate",
        )));
    }
    let count = values.len();
    let n = count as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if count > 1 {
        let squares: f64 = values.iter().map(|value| (value - mean).powi(2)).sum();
        (squares / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    let margin = interval.critical_value(count) * std / n.sqrt();
    Ok(StatSummary {
        count,
        mean,
        std,
        ci95: [mean - margin, mean + margin],
    })
}

/// Per-run Student-t summary as stored in flattened exports; all fields are
/// `None` when the run produced no values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Mean of the run's values.
    pub mean: Option<f64>,
    /// Sample standard deviation.
    pub std: Option<f64>,
    /// Student-t 95% interval bounds.
    pub ci95: [Option<f64>; 2],
}

impl RunStats {
    /// Summarizes one run's values with a Student-t interval.
    pub fn from_values(values: &[f64]) -> Self {
        match compute_stats_with(values, Interval::StudentT) {
            Ok(summary) => Self {
                mean: Some(summary.mean),
                std: Some(summary.std),
                ci95: [Some(summary.ci95[0]), Some(summary.ci95[1])],
            },
            Err(_) => Self::default(),
        }
    }

    /// Every present field rounded to three decimals.
    pub fn rounded(self) -> Self {
        let round = |value: Option<f64>| value.map(round3);
        Self {
            mean: round(self.mean),
            std: round(self.std),
            ci95: [round(self.ci95[0]), round(self.ci95[1])],
        }
    }
}

/// Jain's fairness index `(sum x)^2 / (n * sum x^2)`, 1.0 when every share is zero.
pub fn jain_fairness(shares: &[f64]) -> f64 {
    let sum: f64 = shares.iter().sum();
    let squares: f64 = shares.iter().map(|share| share * share).sum();
    if squares > 0.0 {
        (sum * sum) / (shares.len() as f64 * squares)
    } else {
        1.0
    }
}

/// Mean of the provided values, `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Rounds to three decimal places (millisecond resolution for delays).
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
