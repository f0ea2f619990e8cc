use std::path::Path;

use rlora_core::errors::AggError;

use super::filename::RunFileName;
use super::text::{LabeledText, COLLISIONS_LABEL};
use super::{zero_denominator, Metric, MetricKind, ParsedFile, TEXT_SUMMARY_GLOB};
use crate::stat::{compute_stats, StatSummary};

/// Collisions per node from the plain-text run summaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionPerNode;

impl Metric for CollisionPerNode {
    type Sample = f64;
    type Summary = StatSummary;

    fn kind(&self) -> MetricKind {
        MetricKind::CollisionPerNode
    }

    fn patterns(&self) -> &'static [&'static str] {
        &[TEXT_SUMMARY_GLOB]
    }

    fn parse(&self, path: &Path) -> Result<ParsedFile<f64>, AggError> {
        let name = RunFileName::from_path(path)?;
        if name.number_nodes <= 0 {
            return Err(zero_denominator(
                "rlora_agg.collision_nodes",
                "number of nodes must be positive",
            ));
        }
        let text = LabeledText::read(path)?;
        let collisions = text.values_after(COLLISIONS_LABEL)?[0];
        Ok(ParsedFile {
            metadata: name.metadata(),
            sample: collisions / name.number_nodes as f64,
        })
    }

    fn summarize(&self, samples: &[f64]) -> Result<StatSummary, AggError> {
        compute_stats(samples)
    }
}
