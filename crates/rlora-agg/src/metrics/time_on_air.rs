use std::path::Path;

use rlora_core::errors::AggError;

use super::document::{extract_scalar, RawVector, ResultDocument};
use super::{malformed, Metric, MetricKind, ParsedFile};
use crate::stat::{compute_stats, jain_fairness, StatSummary};

/// Jain fairness of channel occupancy across nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeOnAir;

/// Fairness over the per-node total time-on-air, `None` without vectors.
pub fn fairness_of(vectors: &[RawVector]) -> Option<f64> {
    if vectors.is_empty() {
        return None;
    }
    let totals: Vec<f64> = vectors
        .iter()
        .map(|vector| vector.value.iter().sum())
        .collect();
    Some(jain_fairness(&totals))
}

impl Metric for TimeOnAir {
    type Sample = f64;
    type Summary = StatSummary;

    fn kind(&self) -> MetricKind {
        MetricKind::TimeOnAir
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["timeOnAir-*.json"]
    }

    fn parse(&self, path: &Path) -> Result<ParsedFile<f64>, AggError> {
        let document = ResultDocument::read(path)?;
        let metadata = document.metadata()?;
        let sample = match &document {
            ResultDocument::Flattened { results, .. } => extract_scalar(results)?,
            ResultDocument::Raw { vectors, .. } => fairness_of(vectors).ok_or_else(|| {
                malformed("rlora_agg.time_on_air_empty", "export holds no vectors")
            })?,
        };
        Ok(ParsedFile { metadata, sample })
    }

    fn summarize(&self, samples: &[f64]) -> Result<StatSummary, AggError> {
        compute_stats(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[f64]) -> RawVector {
        RawVector {
            value: values.to_vec(),
            ..RawVector::default()
        }
    }

    #[test]
    fn equal_occupancy_is_perfectly_fair() {
        let vectors = vec![vector(&[1.0, 1.5]), vector(&[2.5]), vector(&[0.5, 2.0])];
        let fairness = fairness_of(&vectors).unwrap();
        assert!((fairness - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_talker_scores_one_over_n() {
        let vectors = vec![vector(&[10.0]), vector(&[]), vector(&[0.0]), vector(&[])];
        assert_eq!(fairness_of(&vectors), Some(0.25));
        assert_eq!(fairness_of(&[]), None);
    }
}
