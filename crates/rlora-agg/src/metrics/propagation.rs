use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rlora_core::errors::AggError;
use serde::{Deserialize, Serialize};

use super::document::{node_index, RawVector, ResultDocument};
use super::{empty_samples, malformed, Metric, MetricKind, ParsedFile};
use crate::stat::{compute_stats, round3, RunStats, StatSummary};

const SEND_MARKERS: [&str; 2] = ["missionidrtssent", "missionidfragmentsent"];
const RECEIVE_MARKER: &str = "receivedmissionid";
const FULL_TOLERANCE: f64 = 1e-9;

/// Mission propagation delay and receiver coverage.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagationTime;

/// Per-run reduction of a mission-id export, also the flattened `results` shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropagationRun {
    /// Delay statistics over fully received missions.
    pub propagation_time: RunStats,
    /// Receiver ratio statistics over all delivered missions.
    pub receiver_ratio: RunStats,
    /// Fraction of delivered missions that reached every other node.
    pub receiver_ratio_full: Option<f64>,
}

/// Per-run means fed into cross-run aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropagationSample {
    /// Mean delay of fully received missions.
    pub propagation_time: Option<f64>,
    /// Mean receiver ratio.
    pub receiver_ratio: Option<f64>,
    /// Fully received fraction.
    pub receiver_ratio_full: Option<f64>,
}

impl From<&PropagationRun> for PropagationSample {
    fn from(run: &PropagationRun) -> Self {
        Self {
            propagation_time: run.propagation_time.mean,
            receiver_ratio: run.receiver_ratio.mean,
            receiver_ratio_full: run.receiver_ratio_full,
        }
    }
}

/// Cross-run statistics; a field is `None` when no run reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationSummary {
    /// Statistics over per-run mean delays.
    pub propagation_time: Option<StatSummary>,
    /// Statistics over per-run mean receiver ratios.
    pub receiver_ratio: Option<StatSummary>,
    /// Statistics over per-run fully received fractions.
    pub receiver_ratio_full: Option<StatSummary>,
}

#[derive(Debug, Default)]
struct MissionLog {
    sent: BTreeMap<usize, BTreeMap<i64, f64>>,
    received: BTreeMap<usize, BTreeMap<i64, f64>>,
    max_node: Option<usize>,
}

impl MissionLog {
    fn record(vectors: &[RawVector]) -> Self {
        let mut log = MissionLog::default();
        for vector in vectors {
            let Some(node) = node_index(&vector.module) else {
                continue;
            };
            log.max_node = log.max_node.max(Some(node));
            let name = vector.name.to_lowercase();
            let target = if SEND_MARKERS.iter().any(|marker| name.contains(marker)) {
                &mut log.sent
            } else if name.contains(RECEIVE_MARKER) {
                &mut log.received
            } else {
                continue;
            };
            let events = target.entry(node).or_default();
            for (time, value) in vector.time.iter().zip(&vector.value) {
                if *value == -1.0 {
                    continue;
                }
                events.insert(*value as i64, *time);
            }
        }
        log
    }

    fn missions(&self) -> BTreeSet<i64> {
        self.sent
            .values()
            .chain(self.received.values())
            .flat_map(|events| events.keys().copied())
            .collect()
    }

    fn times(side: &BTreeMap<usize, BTreeMap<i64, f64>>, mission: i64) -> Vec<f64> {
        side.values()
            .filter_map(|events| events.get(&mission).copied())
            .collect()
    }
}

fn is_full(ratio: f64) -> bool {
    (ratio - 1.0).abs() <= FULL_TOLERANCE
}

/// Reduces a raw mission-id export, `None` when it names no mission.
///
/// Delay is the latest receive minus the earliest send; the receiver ratio
/// divides distinct receivers by every node except one sender. Missions lacking
/// either a send or a receive are ignored.
pub fn propagation_run(vectors: &[RawVector]) -> Option<PropagationRun> {
    let log = MissionLog::record(vectors);
    let missions = log.missions();
    if missions.is_empty() {
        return None;
    }
    let others = log.max_node.unwrap_or(0);

    let mut delivered: Vec<(f64, Option<f64>)> = Vec::new();
    for mission in missions {
        let sends = MissionLog::times(&log.sent, mission);
        let receives = MissionLog::times(&log.received, mission);
        let (Some(first_send), Some(last_receive)) = (
            sends.iter().copied().reduce(f64::min),
            receives.iter().copied().reduce(f64::max),
        ) else {
            continue;
        };
        let ratio = (others > 0).then(|| round3(receives.len() as f64 / others as f64));
        delivered.push((round3(last_receive - first_send), ratio));
    }

    let full_delays: Vec<f64> = delivered
        .iter()
        .filter(|(_, ratio)| ratio.is_some_and(is_full))
        .map(|(delay, _)| *delay)
        .collect();
    let ratios: Vec<f64> = delivered.iter().filter_map(|(_, ratio)| *ratio).collect();
    let full_fraction = (!ratios.is_empty()).then(|| {
        let full = ratios.iter().filter(|ratio| is_full(**ratio)).count();
        round3(full as f64 / ratios.len() as f64)
    });

    Some(PropagationRun {
        propagation_time: RunStats::from_values(&full_delays).rounded(),
        receiver_ratio: RunStats::from_values(&ratios).rounded(),
        receiver_ratio_full: full_fraction,
    })
}

fn summarize_field(values: impl Iterator<Item = Option<f64>>) -> Result<Option<StatSummary>, AggError> {
    let values: Vec<f64> = values.flatten().collect();
    if values.is_empty() {
        return Ok(None);
    }
    compute_stats(&values).map(Some)
}

impl Metric for PropagationTime {
    type Sample = PropagationSample;
    type Summary = PropagationSummary;

    fn kind(&self) -> MetricKind {
        MetricKind::PropagationTime
    }

    fn patterns(&self) -> &'static [&'static str] {
        &["missionId-*.json"]
    }

    fn parse(&self, path: &Path) -> Result<ParsedFile<PropagationSample>, AggError> {
        let document = ResultDocument::read(path)?;
        let metadata = document.metadata()?;
        let run: PropagationRun = match document {
            ResultDocument::Flattened { results, .. } => serde_json::from_value(results)
                .map_err(|err| malformed("rlora_agg.propagation_results", err.to_string()))?,
            ResultDocument::Raw { vectors, .. } => propagation_run(&vectors).ok_or_else(|| {
                malformed("rlora_agg.propagation_empty", "export names no mission")
            })?,
        };
        let sample = PropagationSample::from(&run);
        if sample.propagation_time.is_none()
            && sample.receiver_ratio.is_none()
            && sample.receiver_ratio_full.is_none()
        {
            return Err(malformed(
                "rlora_agg.propagation_empty",
                "no delivered mission in run",
            ));
        }
        Ok(ParsedFile { metadata, sample })
    }

    fn summarize(&self, samples: &[PropagationSample]) -> Result<PropagationSummary, AggError> {
        let summary = PropagationSummary {
            propagation_time: summarize_field(samples.iter().map(|s| s.propagation_time))?,
            receiver_ratio: summarize_field(samples.iter().map(|s| s.receiver_ratio))?,
            receiver_ratio_full: summarize_field(samples.iter().map(|s| s.receiver_ratio_full))?,
        };
        if summary.propagation_time.is_none()
            && summary.receiver_ratio.is_none()
            && summary.receiver_ratio_full.is_none()
        {
            return Err(empty_samples(
                "rlora_agg.propagation_group",
                "no run reported propagation statistics",
            ));
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vector(node: usize, name: &str, events: &[(f64, f64)]) -> RawVector {
        RawVector {
            module: format!("Net.loRaNodes[{node}].app"),
            name: name.to_string(),
            time: events.iter().map(|(time, _)| *time).collect(),
            value: events.iter().map(|(_, id)| *id).collect(),
        }
    }

    #[test]
    fn delay_spans_first_send_to_last_receive() {
        // Three nodes: node 0 sends mission 5, both others receive it.
        let vectors = vec![
            vector(0, "missionIdRtsSent:vector", &[(1.0, 5.0), (9.0, -1.0)]),
            vector(1, "missionIdFragmentSent:vector", &[(1.5, 5.0)]),
            vector(1, "receivedMissionId:vector", &[(2.25, 5.0)]),
            vector(2, "receivedMissionId:vector", &[(3.5, 5.0)]),
        ];
        let run = propagation_run(&vectors).unwrap();
        assert_eq!(run.propagation_time.mean, Some(2.5));
        assert_eq!(run.receiver_ratio.mean, Some(1.0));
        assert_eq!(run.receiver_ratio_full, Some(1.0));
    }

    #[test]
    fn partial_delivery_is_excluded_from_delay() {
        let vectors = vec![
            vector(0, "missionIdRtsSent:vector", &[(0.0, 1.0), (10.0, 2.0)]),
            vector(1, "receivedMissionId:vector", &[(4.0, 1.0), (12.0, 2.0)]),
            vector(2, "receivedMissionId:vector", &[(5.0, 1.0)]),
            vector(3, "receivedMissionId:vector", &[(6.0, 1.0)]),
            vector(3, "receivedMissionId:vector", &[(7.0, 3.0)]),
        ];
        let run = propagation_run(&vectors).unwrap();
        // Mission 1: 3/3 receivers, delay 6. Mission 2: 1/3 receivers. Mission 3 never sent.
        assert_eq!(run.propagation_time.mean, Some(6.0));
        assert_eq!(run.receiver_ratio_full, Some(0.5));
        let ratio = run.receiver_ratio.mean.unwrap();
        assert!((ratio - (1.0 + 0.333) / 2.0).abs() <= 0.001);
    }

    #[test]
    fn run_statistics_are_rounded_to_three_decimals() {
        // Ratios 1.0, 0.333 and 0.333 over three possible receivers.
        let vectors = vec![
            vector(0, "missionIdRtsSent:vector", &[(0.0, 1.0), (10.0, 2.0), (20.0, 3.0)]),
            vector(1, "receivedMissionId:vector", &[(1.0, 1.0), (11.0, 2.0), (21.0, 3.0)]),
            vector(2, "receivedMissionId:vector", &[(2.0, 1.0)]),
            vector(3, "receivedMissionId:vector", &[(3.0, 1.0)]),
        ];
        let run = propagation_run(&vectors).unwrap();
        assert_eq!(run.receiver_ratio.mean, Some(0.555));
        assert_eq!(run.receiver_ratio.std, Some(0.385));
        for bound in run.receiver_ratio.ci95 {
            let scaled = bound.unwrap() * 1000.0;
            assert!((scaled - scaled.round()).abs() < 1e-6);
        }
        assert_eq!(run.propagation_time.mean, Some(3.0));
    }

    #[test]
    fn no_missions_means_no_run() {
        let vectors = vec![vector(0, "missionIdRtsSent:vector", &[(1.0, -1.0)])];
        assert!(propagation_run(&vectors).is_none());
    }

    #[test]
    fn flattened_results_round_trip_nulls() {
        let run: PropagationRun = serde_json::from_value(json!({
            "propagation_time": {"mean": null, "std": null, "ci95": [null, null]},
            "receiver_ratio": {"mean": 0.4, "std": 0.1, "ci95": [0.3, 0.5]},
            "receiver_ratio_full": 0.0
        }))
        .unwrap();
        let sample = PropagationSample::from(&run);
        assert_eq!(sample.propagation_time, None);
        assert_eq!(sample.receiver_ratio, Some(0.4));
    }

    #[test]
    fn summary_skips_missing_fields() {
        let summary = PropagationTime
            .summarize(&[
                PropagationSample {
                    propagation_time: None,
                    receiver_ratio: Some(0.5),
                    receiver_ratio_full: Some(0.0),
                },
                PropagationSample {
                    propagation_time: Some(2.0),
                    receiver_ratio: Some(1.0),
                    receiver_ratio_full: Some(1.0),
                },
            ])
            .unwrap();
        assert_eq!(summary.propagation_time.unwrap().count, 1);
        assert_eq!(summary.receiver_ratio.unwrap().mean, 0.75);
    }
}
