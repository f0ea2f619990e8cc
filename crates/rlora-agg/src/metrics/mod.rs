//! Per-metric decoders turning one result file into `(metadata, sample)`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rlora_core::errors::{AggError, ErrorInfo};
use rlora_core::ExperimentMetadata;
use serde::Serialize;

use crate::catalog::Partition;
use crate::report::{ReportEntry, ReportWriter};

/// Collisions per node.
pub mod collision;
pub mod document;
pub mod filename;
/// Data over total received bytes.
pub mod mac_efficiency;
/// Byte counts normalized by duration and receiver count.
pub mod normalized;
/// Mission propagation delay and coverage.
pub mod propagation;
/// Per-identifier reception success.
pub mod reception;
pub mod text;
/// Aggregate throughput series.
pub mod throughput;
/// Time-on-air fairness.
pub mod time_on_air;

pub use collision::CollisionPerNode;
pub use mac_efficiency::MacEfficiency;
pub use normalized::{NormalizedDataThroughput, NormalizedSample, NormalizedSummary};
pub use propagation::{PropagationRun, PropagationSample, PropagationSummary, PropagationTime};
pub use reception::ReceptionSuccessRatio;
pub use throughput::{SeriesSummary, Throughput};
pub use time_on_air::TimeOnAir;

/// Glob matching the plain-text run summaries.
pub const TEXT_SUMMARY_GLOB: &str = "mac*.txt";

/// Metadata and derived value decoded from one result file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFile<S> {
    /// Normalized experiment metadata.
    pub metadata: ExperimentMetadata,
    /// Metric-specific sample.
    pub sample: S,
}

/// A metric kind: how to decode its files and how to reduce a sample group.
pub trait Metric {
    /// Value extracted from one file.
    type Sample;
    /// Reduction of all samples sharing a group key.
    type Summary: Serialize;

    /// Kind identifier, also the output directory name.
    fn kind(&self) -> MetricKind;

    /// File name globs selecting this metric's inputs.
    fn patterns(&self) -> &'static [&'static str];

    /// Decodes one file.
    fn parse(&self, path: &Path) -> Result<ParsedFile<Self::Sample>, AggError>;

    /// Reduces a non-empty sample group.
    fn summarize(&self, samples: &[Self::Sample]) -> Result<Self::Summary, AggError>;

    /// Persists the entries of one flushed partition.
    fn emit(
        &self,
        writer: &ReportWriter,
        partition: &Partition,
        entries: &[ReportEntry<Self::Summary>],
    ) -> Result<Vec<PathBuf>, AggError> {
        let path = writer.write(partition, self.kind().dir_name(), entries)?;
        Ok(vec![path])
    }
}

/// Every aggregated metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    /// Jain fairness of per-node time-on-air.
    TimeOnAir,
    /// Network-wide throughput series.
    Throughput,
    /// Network-wide effective throughput series.
    EffectiveThroughput,
    /// Collisions divided by node count.
    CollisionPerNode,
    /// Data bytes over total bytes received.
    MacEfficiency,
    /// Received bytes per second per potential receiver.
    NormalizedDataThroughput,
    /// Share of potential receivers that received each message.
    ReceptionSuccessRatio,
    /// Mission propagation delay and receiver coverage.
    PropagationTime,
}

impl MetricKind {
    /// All kinds in default run order.
    pub const ALL: [MetricKind; 8] = [
        MetricKind::TimeOnAir,
        MetricKind::Throughput,
        MetricKind::EffectiveThroughput,
        MetricKind::CollisionPerNode,
        MetricKind::MacEfficiency,
        MetricKind::NormalizedDataThroughput,
        MetricKind::ReceptionSuccessRatio,
        MetricKind::PropagationTime,
    ];

    /// Output directory (and CLI) name.
    pub fn dir_name(self) -> &'static str {
        match self {
            MetricKind::TimeOnAir => "time-on-air",
            MetricKind::Throughput => "throughput",
            MetricKind::EffectiveThroughput => "effective-throughput",
            MetricKind::CollisionPerNode => "collision-per-node",
            MetricKind::MacEfficiency => "mac-efficiency",
            MetricKind::NormalizedDataThroughput => "normalized-data-throughput",
            MetricKind::ReceptionSuccessRatio => "reception-success-ratio",
            MetricKind::PropagationTime => "propagation-time",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for MetricKind {
    type Err = AggError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.dir_name() == value)
            .ok_or_else(|| {
                let known: Vec<&str> = MetricKind::ALL.iter().map(|k| k.dir_name()).collect();
                AggError::Config(
                    ErrorInfo::new("metric_kind", format!("unknown metric kind `{value}`"))
                        .with_hint(format!("expected one of: {}", known.join(", "))),
                )
            })
    }
}

pub(crate) fn io_error(code: &str, path: &Path, err: impl ToString) -> AggError {
    AggError::Io(ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()))
}

pub(crate) fn zero_denominator(code: &str, message: impl Into<String>) -> AggError {
    AggError::ZeroDenominator(ErrorInfo::new(code, message))
}

pub(crate) fn malformed(code: &str, message: impl Into<String>) -> AggError {
    AggError::MalformedDocument(ErrorInfo::new(code, message))
}

pub(crate) fn empty_samples(code: &str, message: impl Into<String>) -> AggError {
    AggError::EmptySampleSet(ErrorInfo::new(code, message))
}
