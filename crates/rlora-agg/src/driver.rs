use std::collections::BTreeMap;
use std::path::PathBuf;

use rlora_core::errors::AggError;
use rlora_core::metadata::{DIMENSIONS, MAC_PROTOCOL};
use rlora_core::ExperimentMetadata;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, CatalogEvent, NamePattern, Partition};
use crate::metrics::{
    CollisionPerNode, MacEfficiency, Metric, MetricKind, NormalizedDataThroughput, ParsedFile,
    PropagationTime, ReceptionSuccessRatio, Throughput, TimeOnAir,
};
use crate::report::{ReportEntry, ReportWriter};
use crate::settings::Settings;

/// Grouping identity: protocol plus sorted, type-tagged metadata items.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    /// Protocol the group belongs to.
    pub protocol: String,
    /// Canonical `(field, tagged value)` pairs.
    pub items: Vec<(String, String)>,
}

impl GroupKey {
    /// Builds the key for a sample found in `partition`.
    pub fn new(partition: &Partition, metadata: &ExperimentMetadata) -> Self {
        let protocol = metadata
            .get(MAC_PROTOCOL)
            .map(ToString::to_string)
            .unwrap_or_else(|| partition.protocol.clone());
        Self {
            protocol,
            items: metadata.canonical_items(),
        }
    }
}

/// Samples sharing one group key.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGroup<S> {
    /// Metadata of the group (identical for every member).
    pub metadata: ExperimentMetadata,
    /// Accumulated samples.
    pub samples: Vec<S>,
}

/// Groups accumulated while scanning a single partition.
#[derive(Debug)]
pub struct SampleStore<S> {
    groups: BTreeMap<GroupKey, SampleGroup<S>>,
}

impl<S> Default for SampleStore<S> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<S> SampleStore<S> {
    /// Appends a parsed sample to its group, creating the group on first use.
    pub fn push(&mut self, partition: &Partition, parsed: ParsedFile<S>) {
        let key = GroupKey::new(partition, &parsed.metadata);
        self.groups
            .entry(key)
            .or_insert_with(|| SampleGroup {
                metadata: parsed.metadata,
                samples: Vec::new(),
            })
            .samples
            .push(parsed.sample);
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true when nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Empties the store, yielding groups in key order.
    pub fn drain(&mut self) -> Vec<(GroupKey, SampleGroup<S>)> {
        std::mem::take(&mut self.groups).into_iter().collect()
    }
}

/// Counters and written files of one metric run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateOutcome {
    /// Metric that was aggregated.
    pub kind: String,
    /// Files decoded successfully.
    pub parsed: usize,
    /// Files skipped because they failed to decode.
    pub skipped: usize,
    /// Groups dropped because their summary failed.
    pub dropped_groups: usize,
    /// Partitions that produced at least one entry.
    pub partitions: usize,
    /// Reports written, in write order.
    pub reports: Vec<PathBuf>,
}

impl AggregateOutcome {
    fn new(kind: MetricKind) -> Self {
        Self {
            kind: kind.dir_name().to_string(),
            parsed: 0,
            skipped: 0,
            dropped_groups: 0,
            partitions: 0,
            reports: Vec::new(),
        }
    }
}

/// Runs one metric over every partition of the catalog.
///
/// Decoding failures skip the file. Each partition is summarized and written
/// when its end marker arrives, after which its groups are discarded.
pub fn aggregate<M: Metric>(
    metric: &M,
    catalog: &Catalog,
    writer: &ReportWriter,
) -> Result<AggregateOutcome, AggError> {
    let kind = metric.kind();
    let pattern = NamePattern::new(metric.patterns())?;
    let mut outcome = AggregateOutcome::new(kind);
    let mut store: SampleStore<M::Sample> = SampleStore::default();
    info!(metric = %kind, root = %catalog.data_root().display(), "aggregating");

    for event in catalog.iter(&pattern) {
        match event {
            CatalogEvent::File { partition, path } => match metric.parse(&path) {
                Ok(parsed) => {
                    debug!(path = %path.display(), "parsed");
                    store.push(&partition, parsed);
                    outcome.parsed += 1;
                }
                Err(err) => {
                    if err.is_data_error() {
                        warn!(path = %path.display(), code = %err.info().code, error = %err, "skipping file");
                    } else {
                        error!(path = %path.display(), code = %err.info().code, error = %err, "skipping unreadable file");
                    }
                    outcome.skipped += 1;
                }
            },
            CatalogEvent::PartitionEnd { partition } => {
                let groups = store.drain();
                flush(metric, writer, &partition, groups, &mut outcome)?;
            }
        }
    }

    info!(
        metric = %kind,
        parsed = outcome.parsed,
        skipped = outcome.skipped,
        reports = outcome.reports.len(),
        "aggregation finished"
    );
    Ok(outcome)
}

fn flush<M: Metric>(
    metric: &M,
    writer: &ReportWriter,
    partition: &Partition,
    groups: Vec<(GroupKey, SampleGroup<M::Sample>)>,
    outcome: &mut AggregateOutcome,
) -> Result<(), AggError> {
    let mut entries = Vec::with_capacity(groups.len());
    for (key, group) in groups {
        if group.samples.is_empty() {
            continue;
        }
        match metric.summarize(&group.samples) {
            Ok(data) => entries.push(ReportEntry {
                metadata: group.metadata.without(&[MAC_PROTOCOL, DIMENSIONS]),
                data,
            }),
            Err(err) => {
                warn!(partition = %partition, protocol = %key.protocol, error = %err, "dropping group");
                outcome.dropped_groups += 1;
            }
        }
    }
    if entries.is_empty() {
        debug!(partition = %partition, "no entries, nothing written");
        return Ok(());
    }
    info!(partition = %partition, groups = entries.len(), "flushing partition");
    let written = metric.emit(writer, partition, &entries)?;
    outcome.partitions += 1;
    outcome.reports.extend(written);
    Ok(())
}

/// Runs one metric kind with the catalog and writer described by `settings`.
pub fn aggregate_kind(kind: MetricKind, settings: &Settings) -> Result<AggregateOutcome, AggError> {
    let catalog = settings.catalog();
    let writer = settings.writer();
    match kind {
        MetricKind::TimeOnAir => aggregate(&TimeOnAir, &catalog, &writer),
        MetricKind::Throughput => aggregate(&Throughput::total(), &catalog, &writer),
        MetricKind::EffectiveThroughput => aggregate(&Throughput::effective(), &catalog, &writer),
        MetricKind::CollisionPerNode => aggregate(&CollisionPerNode, &catalog, &writer),
        MetricKind::MacEfficiency => aggregate(&MacEfficiency, &catalog, &writer),
        MetricKind::NormalizedDataThroughput => aggregate(
            &NormalizedDataThroughput {
                sim_duration_seconds: settings.sim_duration_seconds,
            },
            &catalog,
            &writer,
        ),
        MetricKind::ReceptionSuccessRatio => aggregate(&ReceptionSuccessRatio, &catalog, &writer),
        MetricKind::PropagationTime => aggregate(&PropagationTime, &catalog, &writer),
    }
}

/// Validates `settings` and runs the given kinds in order.
pub fn aggregate_all(
    kinds: &[MetricKind],
    settings: &Settings,
) -> Result<Vec<AggregateOutcome>, AggError> {
    settings.validate()?;
    kinds
        .iter()
        .map(|kind| aggregate_kind(*kind, settings))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlora_core::MetaValue;

    fn parsed(protocol: &str, nodes: i64, sample: f64) -> ParsedFile<f64> {
        let mut metadata = ExperimentMetadata::new();
        metadata.insert(MAC_PROTOCOL, protocol);
        metadata.insert("numberNodes", nodes);
        ParsedFile { metadata, sample }
    }

    #[test]
    fn store_groups_by_protocol_and_metadata() {
        let partition = Partition::new("Aloha", "300m");
        let mut store = SampleStore::default();
        store.push(&partition, parsed("Aloha", 10, 1.0));
        store.push(&partition, parsed("Aloha", 10, 2.0));
        store.push(&partition, parsed("Aloha", 12, 3.0));
        assert_eq!(store.len(), 2);

        let groups = store.drain();
        assert!(store.is_empty());
        assert_eq!(groups[0].1.samples, vec![1.0, 2.0]);
        assert_eq!(groups[1].1.metadata.get("numberNodes"), Some(&MetaValue::Int(12)));
    }

    #[test]
    fn text_and_int_values_stay_apart() {
        let partition = Partition::new("Csma", "300m");
        let mut store = SampleStore::default();
        store.push(&partition, parsed("Csma", 4, 1.0));
        let mut text = parsed("Csma", 0, 2.0);
        text.metadata.insert("numberNodes", "4");
        store.push(&partition, text);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn missing_protocol_falls_back_to_partition() {
        let key = GroupKey::new(&Partition::new("MiRS", "1000m"), &ExperimentMetadata::new());
        assert_eq!(key.protocol, "MiRS");
    }
}
