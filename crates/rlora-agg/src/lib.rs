#![deny(missing_docs)]
#![doc = "Metric aggregation pipeline for LoRa MAC simulation campaigns."]

/// Protocol x dimension directory traversal.
pub mod catalog;
/// Parameter grid coverage of the data tree.
pub mod coverage;
/// Per-partition grouping and report flushing.
pub mod driver;
/// In-place reduction of raw vector exports.
pub mod flatten;
/// Per-metric file decoders and reductions.
pub mod metrics;
/// Report documents and their writer.
pub mod report;
/// Canonical JSON serde helpers.
pub mod serde;
/// Layered pipeline configuration.
pub mod settings;
/// Statistical aggregation primitives.
pub mod stat;

pub use catalog::{files_under, Catalog, CatalogEvent, NamePattern, Partition};
pub use coverage::{coverage, CoverageGrid, CoverageReport, ParameterPair, PartitionCoverage};
pub use driver::{
    aggregate, aggregate_all, aggregate_kind, AggregateOutcome, GroupKey, SampleGroup, SampleStore,
};
pub use flatten::{flatten, ExportKind, FlattenOutcome};
pub use metrics::{Metric, MetricKind, ParsedFile};
pub use report::{sanitize_dimension, ReportDocument, ReportEntry, ReportWriter};
pub use settings::{load_settings, Settings};
pub use stat::{compute_stats, compute_stats_with, jain_fairness, Interval, RunStats, StatSummary};
