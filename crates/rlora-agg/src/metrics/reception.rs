use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rlora_core::errors::{AggError, ErrorInfo};
use serde_json::Value;

use super::document::{node_index, RawVector, ResultDocument};
use super::{malformed, Metric, MetricKind, ParsedFile};
use crate::stat::{compute_stats, RunStats, StatSummary};

const POSSIBLE_MARKER: &str = "couldhavereceivedid:vector";
const RECEIVED_MARKER: &str = "receivedfragmentid:vector";

/// Mean per-message reception success of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceptionSuccessRatio;

/// Per-identifier `|received| / |possible|`, ordered by identifier.
///
/// Identifiers nobody could have received are ignored. Values of `-1` mark
/// empty slots and are skipped.
pub fn reception_ratios(vectors: &[RawVector]) -> Vec<f64> {
    let mut possible: BTreeMap<u64, BTreeSet<usize>> = BTreeMap::new();
    let mut received: BTreeMap<u64, BTreeSet<usize>> = BTreeMap::new();

    for vector in vectors {
        let Some(node) = node_index(&vector.module) else {
            continue;
        };
        let name = vector.name.to_lowercase();
        let target = if name.contains(POSSIBLE_MARKER) {
            &mut possible
        } else if name.contains(RECEIVED_MARKER) {
            &mut received
        } else {
            continue;
        };
        for value in &vector.value {
            if *value == -1.0 {
                continue;
            }
            let id = value.abs() as u64;
            target.entry(id).or_default().insert(node);
        }
    }

    possible
        .iter()
        .filter(|(_, nodes)| !nodes.is_empty())
        .map(|(id, nodes)| {
            let hits = received.get(id).map_or(0, BTreeSet::len);
            hits as f64 / nodes.len() as f64
        })
        .collect()
}

fn flattened_mean(results: &Value) -> Result<f64, AggError> {
    results
        .get("mean")
        .ok_or_else(|| malformed("rlora_agg.reception_mean", "missing 'mean' in results"))?
        .as_f64()
        .ok_or_else(|| {
            AggError::NonNumericValue(ErrorInfo::new(
                "rlora_agg.reception_mean",
                "'mean' in results is not numeric",
            ))
        })
}

impl Metric for ReceptionSuccessRatio {
    type Sample = f64;
    type Summary = StatSummary;

    fn kind(&self) -> MetricKind {
        MetricKind::ReceptionSuccessRatio
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["idReceived-*.json"]
    }

    fn parse(&self, path: &Path) -> Result<ParsedFile<f64>, AggError> {
        let document = ResultDocument::read(path)?;
        let metadata = document.metadata()?;
        let sample = match &document {
            ResultDocument::Flattened { results, .. } => flattened_mean(results)?,
            ResultDocument::Raw { vectors, .. } => RunStats::from_values(&reception_ratios(vectors))
                .mean
                .ok_or_else(|| {
                    malformed(
                        "rlora_agg.reception_empty",
                        "no identifier with a possible receiver",
                    )
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
    use serde_json::json;

    fn vector(node: usize, name: &str, values: &[f64]) -> RawVector {
        RawVector {
            module: format!("ReceptionNet.loRaNodes[{node}].LoRaNic.mac"),
            name: name.to_string(),
            time: vec![0.0; values.len()],
            value: values.to_vec(),
        }
    }

    #[test]
    fn two_of_three_receivers() {
        let vectors = vec![
            vector(0, "couldHaveReceivedId:vector", &[7.0]),
            vector(1, "couldHaveReceivedId:vector", &[7.0]),
            vector(2, "couldHaveReceivedId:vector", &[7.0]),
            vector(0, "receivedFragmentId:vector", &[7.0]),
            vector(1, "receivedFragmentId:vector", &[-7.0]),
        ];
        let ratios = reception_ratios(&vectors);
        assert_eq!(ratios.len(), 1);
        assert!((ratios[0] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn sentinel_values_and_foreign_modules_are_ignored() {
        let mut gateway = vector(0, "couldHaveReceivedId:vector", &[3.0]);
        gateway.module = "ReceptionNet.gateway.mac".to_string();
        let vectors = vec![
            gateway,
            vector(1, "couldHaveReceivedId:vector", &[-1.0, 4.0]),
            vector(1, "receivedFragmentId:vector", &[-1.0, 4.0]),
        ];
        assert_eq!(reception_ratios(&vectors), vec![1.0]);
    }

    #[test]
    fn flattened_results_need_a_mean() {
        assert_eq!(flattened_mean(&json!({"mean": 0.5, "std": 0.1})).unwrap(), 0.5);
        assert!(matches!(
            flattened_mean(&json!([])),
            Err(AggError::MalformedDocument(_))
        ));
    }
}
