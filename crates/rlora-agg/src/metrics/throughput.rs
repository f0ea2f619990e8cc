use std::path::Path;

use rlora_core::errors::AggError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::ResultDocument;
use super::{empty_samples, malformed, Metric, MetricKind, ParsedFile};
use crate::stat::{compute_stats, StatSummary};

/// Network-wide throughput, optionally restricted to effective (payload) bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Throughput {
    /// Reads `effectiveThroughput-*` exports instead of `throughput-*`.
    pub effective: bool,
}

impl Throughput {
    /// Raw throughput.
    pub fn total() -> Self {
        Self { effective: false }
    }

    /// Effective throughput.
    pub fn effective() -> Self {
        Self { effective: true }
    }
}

/// Reduction of a group of aggregate throughput series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    /// Statistics over each run's series total.
    pub total: StatSummary,
    /// Pointwise mean across runs, truncated to the shortest run.
    pub mean_series: Vec<f64>,
}

/// Element-wise sum of per-node series.
///
/// The first series fixes the length; longer series are truncated and a
/// shorter one is rejected.
pub fn sum_series<'a, I>(series: I) -> Result<Vec<f64>, AggError>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut iter = series.into_iter();
    let mut total = iter
        .next()
        .map(<[f64]>::to_vec)
        .ok_or_else(|| malformed("rlora_agg.series_empty", "no per-node series present"))?;
    for (index, values) in iter.enumerate() {
        if values.len() < total.len() {
            return Err(malformed(
                "rlora_agg.series_length",
                format!(
                    "series {} has {} points, expected {}",
                    index + 1,
                    values.len(),
                    total.len()
                ),
            ));
        }
        for (slot, value) in total.iter_mut().zip(values) {
            *slot += value;
        }
    }
    Ok(total)
}

fn numbers(values: &[Value]) -> Option<Vec<f64>> {
    values.iter().map(Value::as_f64).collect()
}

fn flattened_series(results: &Value) -> Result<Vec<f64>, AggError> {
    let Value::Array(items) = results else {
        return Err(malformed(
            "rlora_agg.series_shape",
            "throughput results are not a list",
        ));
    };
    if let Some(series) = numbers(items) {
        if series.is_empty() {
            return Err(malformed("rlora_agg.series_empty", "throughput series is empty"));
        }
        return Ok(series);
    }
    let per_node = items
        .iter()
        .map(|item| match item {
            Value::Array(values) => numbers(values),
            other => other.get("value").and_then(Value::as_array).and_then(|v| numbers(v)),
        })
        .collect::<Option<Vec<Vec<f64>>>>()
        .ok_or_else(|| {
            malformed(
                "rlora_agg.series_shape",
                "throughput results mix numeric and non-numeric entries",
            )
        })?;
    sum_series(per_node.iter().map(Vec::as_slice))
}

impl Metric for Throughput {
    type Sample = Vec<f64>;
    type Summary = SeriesSummary;

    fn kind(&self) -> MetricKind {
        if self.effective {
            MetricKind::EffectiveThroughput
        } else {
            MetricKind::Throughput
        }
    }

    fn patterns(&self) -> &'static [&'static str] {
        if self.effective {
            &["effectiveThroughput-*.json"]
        } else {
            &["throughput-*.json"]
        }
    }

    fn parse(&self, path: &Path) -> Result<ParsedFile<Vec<f64>>, AggError> {
        let document = ResultDocument::read(path)?;
        let metadata = document.metadata()?;
        let sample = match &document {
            ResultDocument::Flattened { results, .. } => flattened_series(results)?,
            ResultDocument::Raw { vectors, .. } => {
                sum_series(vectors.iter().map(|vector| vector.value.as_slice()))?
            }
        };
        Ok(ParsedFile { metadata, sample })
    }

    fn summarize(&self, samples: &[Vec<f64>]) -> Result<SeriesSummary, AggError> {
        let shortest = samples
            .iter()
            .map(Vec::len)
            .min()
            .ok_or_else(|| empty_samples("rlora_agg.series_group", "no runs in group"))?;
        let totals: Vec<f64> = samples.iter().map(|series| series.iter().sum()).collect();
        let runs = samples.len() as f64;
        let mean_series = (0..shortest)
            .map(|index| samples.iter().map(|series| series[index]).sum::<f64>() / runs)
            .collect();
        Ok(SeriesSummary {
            total: compute_stats(&totals)?,
            mean_series,
        })
    }
}
