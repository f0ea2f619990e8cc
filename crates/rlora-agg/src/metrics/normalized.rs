use std::path::{Path, PathBuf};

use rlora_core::errors::AggError;
use serde::{Deserialize, Serialize};

use super::filename::RunFileName;
use super::mac_efficiency::received_bytes;
use super::text::LabeledText;
use super::{zero_denominator, Metric, MetricKind, ParsedFile, TEXT_SUMMARY_GLOB};
use crate::catalog::Partition;
use crate::report::{ReportEntry, ReportWriter};
use crate::settings::DEFAULT_SIM_DURATION_SECONDS;
use crate::stat::{compute_stats, StatSummary};

/// Directory of the effective-only companion report.
pub const EFFECTIVE_DIR: &str = "normalized-effective-data-throughput";

/// Received bytes per second per potential receiver.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedDataThroughput {
    /// Simulated seconds per run.
    pub sim_duration_seconds: f64,
}

impl Default for NormalizedDataThroughput {
    fn default() -> Self {
        Self {
            sim_duration_seconds: DEFAULT_SIM_DURATION_SECONDS,
        }
    }
}

/// Normalized totals of one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedSample {
    /// All received bytes.
    pub total: f64,
    /// Application payload bytes only.
    pub effective: f64,
}

/// Statistics of both normalized quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSummary {
    /// Over all received bytes.
    pub normalized_data_throughput: StatSummary,
    /// Over payload bytes.
    pub normalized_effective_data_throughput: StatSummary,
}

impl Metric for NormalizedDataThroughput {
    type Sample = NormalizedSample;
    type Summary = NormalizedSummary;

    fn kind(&self) -> MetricKind {
        MetricKind::NormalizedDataThroughput
    }

    fn patterns(&self) -> &'static [&'static str] {
        &[TEXT_SUMMARY_GLOB]
    }

    fn parse(&self, path: &Path) -> Result<ParsedFile<NormalizedSample>, AggError> {
        let name = RunFileName::from_path(path)?;
        if name.number_nodes <= 1 {
            return Err(zero_denominator(
                "rlora_agg.normalized_nodes",
                "number of nodes must be greater than 1",
            ));
        }
        let (effective, total) = received_bytes(&LabeledText::read(path)?)?;
        let denominator = self.sim_duration_seconds * (name.number_nodes - 1) as f64;
        Ok(ParsedFile {
            metadata: name.metadata(),
            sample: NormalizedSample {
                total: total / denominator,
                effective: effective / denominator,
            },
        })
    }

    fn summarize(&self, samples: &[NormalizedSample]) -> Result<NormalizedSummary, AggError> {
        let totals: Vec<f64> = samples.iter().map(|sample| sample.total).collect();
        let effective: Vec<f64> = samples.iter().map(|sample| sample.effective).collect();
        Ok(NormalizedSummary {
            normalized_data_throughput: compute_stats(&totals)?,
            normalized_effective_data_throughput: compute_stats(&effective)?,
        })
    }

    fn emit(
        &self,
        writer: &ReportWriter,
        partition: &Partition,
        entries: &[ReportEntry<NormalizedSummary>],
    ) -> Result<Vec<PathBuf>, AggError> {
        let combined = writer.write(partition, self.kind().dir_name(), entries)?;
        let effective_only: Vec<ReportEntry<StatSummary>> = entries
            .iter()
            .map(|entry| ReportEntry {
                metadata: entry.metadata.clone(),
                data: entry.data.normalized_effective_data_throughput.clone(),
            })
            .collect();
        let effective = writer.write(partition, EFFECTIVE_DIR, &effective_only)?;
        Ok(vec![combined, effective])
    }
}
